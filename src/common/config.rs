//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::harness::classify::{self, MarkerRule, Strategy, EXTERNAL_TIMEOUT_STATUS};

use super::paths::default_config_path;
use super::{Error, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Program under test
    #[serde(default)]
    pub program: ProgramConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Outcome classification
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Where the corpus comes from
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

/// Program under test
#[derive(Debug, Deserialize)]
pub struct ProgramConfig {
    /// Executable path, or a bare name looked up in PATH
    pub path: Option<PathBuf>,

    /// Flag telling the program to run without a display
    #[serde(default = "default_flag")]
    pub flag: String,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            path: None,
            flag: default_flag(),
        }
    }
}

fn default_flag() -> String {
    "--headless".to_string()
}

/// Timeout settings
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Wall-clock budget per invocation, in seconds
    #[serde(default = "default_run_secs")]
    pub run_secs: u64,

    /// Time between SIGTERM and SIGKILL when terminating, in milliseconds
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            run_secs: default_run_secs(),
            grace_ms: default_grace_ms(),
        }
    }
}

fn default_run_secs() -> u64 {
    60
}
fn default_grace_ms() -> u64 {
    500
}

impl Timeouts {
    pub fn run(&self) -> Duration {
        Duration::from_secs(self.run_secs)
    }

    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.grace_ms)
    }
}

/// Outcome classification settings
#[derive(Debug, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default)]
    pub strategy: Strategy,

    /// Exit statuses that mean "killed by an external timeout"
    #[serde(default = "default_timeout_codes")]
    pub timeout_codes: Vec<i32>,

    /// Marker rules, highest priority first
    #[serde(default = "classify::default_markers")]
    pub markers: Vec<MarkerRule>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            timeout_codes: default_timeout_codes(),
            markers: classify::default_markers(),
        }
    }
}

fn default_timeout_codes() -> Vec<i32> {
    vec![EXTERNAL_TIMEOUT_STATUS]
}

/// Corpus discovery settings
#[derive(Debug, Deserialize)]
pub struct DiscoveryConfig {
    /// Directory searched recursively for inputs
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// File extension of inputs, without the dot
    #[serde(default = "default_extension")]
    pub extension: String,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            extension: default_extension(),
        }
    }
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_extension() -> String {
    "gb".to_string()
}

impl Config {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, `./corpus-runner.toml` and then
    /// the user config file are tried; if neither exists defaults are used.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path(),
        };

        match path {
            Some(path) => {
                tracing::debug!("Loading config from {}", path.display());
                let content = std::fs::read_to_string(&path).map_err(|e| Error::FileRead {
                    path: path.display().to_string(),
                    error: e.to_string(),
                })?;
                Self::from_toml(&content)
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.timeouts.run_secs == 0 {
            return Err(Error::Config(
                "timeouts.run_secs must be at least 1".to_string(),
            ));
        }
        if let Some(rule) = self.classifier.markers.iter().find(|r| r.pattern.is_empty()) {
            return Err(Error::Config(format!(
                "Marker for '{}' has an empty pattern",
                rule.outcome
            )));
        }
        Ok(())
    }
}

/// Resolve the program under test to a spawnable path
///
/// Anything with a path separator is taken as given; a bare name is looked up
/// in PATH so a typo fails before the batch starts.
pub fn resolve_program(program: &Path) -> Result<PathBuf> {
    if program.components().count() > 1 {
        return Ok(program.to_path_buf());
    }

    which::which(program).map_err(|_| {
        let searched: Vec<String> = std::env::var_os("PATH")
            .map(|paths| {
                std::env::split_paths(&paths)
                    .map(|p| p.display().to_string())
                    .collect()
            })
            .unwrap_or_default();
        Error::program_not_found(&program.display().to_string(), &searched)
    })
}
