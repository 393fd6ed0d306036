//! Configuration file locations
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/corpus-runner/`
//! - macOS: `~/Library/Application Support/corpus-runner/`
//! - Windows: `%APPDATA%\corpus-runner\`

use std::path::PathBuf;

const APP_NAME: &str = "corpus-runner";

/// Name of the config file looked up in the working directory first
pub const LOCAL_CONFIG_NAME: &str = "corpus-runner.toml";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the user configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Config file to use when none is given explicitly
///
/// A `corpus-runner.toml` in the working directory wins over the user config.
pub fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from(LOCAL_CONFIG_NAME);
    if local.is_file() {
        return Some(local);
    }
    config_path().filter(|p| p.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_ends_with_file_name() {
        if let Some(path) = config_path() {
            assert!(path.ends_with("config.toml"));
        }
    }
}
