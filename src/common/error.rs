//! Error types for the corpus runner
//!
//! Only batch-fatal conditions are errors. Per-test results (a failing or
//! hanging input, a missing file) are outcomes and never reach this type.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Exit status for batch-fatal errors (misconfiguration, spawn failure)
pub const FATAL_EXIT_CODE: i32 = 2;

/// Main error type for the corpus runner
#[derive(Error, Debug)]
pub enum Error {
    // === Program Under Test ===
    #[error("Program '{name}' not found. Searched: {searched}")]
    ProgramNotFound { name: String, searched: String },

    #[error("Failed to spawn '{program}': {source}. Check that it exists and is executable")]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("No program under test given. Pass it as an argument or set [program] path in the config file")]
    NoProgram,

    // === Interruption ===
    #[error("Interrupted by signal {0}")]
    Interrupted(i32),

    // === Corpus Discovery ===
    #[error("Failed to read corpus directory '{path}': {error}")]
    Discovery { path: String, error: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a program not found error with search paths
    pub fn program_not_found<S: AsRef<str>>(name: &str, paths: &[S]) -> Self {
        Self::ProgramNotFound {
            name: name.to_string(),
            searched: paths.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
        }
    }

    /// Create a spawn failure error for the given program
    pub fn spawn_failed(program: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::SpawnFailed {
            program: program.into(),
            source,
        }
    }

    /// Create a discovery error for an unreadable corpus path
    pub fn discovery(path: &std::path::Path, error: impl ToString) -> Self {
        Self::Discovery {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Process exit status this error terminates the batch with
    ///
    /// Interruption follows the shell convention of 128 + signal number.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Interrupted(signal) => 128 + signal,
            _ => FATAL_EXIT_CODE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupted_exit_code_follows_shell_convention() {
        assert_eq!(Error::Interrupted(2).exit_code(), 130);
        assert_eq!(Error::Interrupted(15).exit_code(), 143);
    }

    #[test]
    fn test_fatal_errors_exit_with_fatal_code() {
        let err = Error::spawn_failed(
            "/nonexistent/emu",
            io::Error::new(io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.exit_code(), FATAL_EXIT_CODE);
        assert!(err.to_string().contains("/nonexistent/emu"));

        let err = Error::program_not_found("emu", &["/usr/bin", "/bin"]);
        assert_eq!(err.to_string(), "Program 'emu' not found. Searched: /usr/bin, /bin");
    }
}
