//! CLI command definitions
//!
//! Defines the clap commands for the corpus runner. Flags left unset fall back
//! to the config file, then to built-in defaults.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::harness::Strategy;

#[derive(Subcommand)]
pub enum Commands {
    /// Run the program under test once per corpus input and report a verdict
    ///
    /// Exits 0 if every input passed, 1 otherwise, 128+N on signal N.
    Run(RunArgs),

    /// List the inputs `run` would use, in run order
    List {
        /// Directory searched recursively for inputs
        #[arg(long, short)]
        dir: Option<PathBuf>,

        /// Input file extension, without the dot
        #[arg(long, short)]
        ext: Option<String>,

        /// Config file (default: ./corpus-runner.toml, then the user config)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

/// Options of the `run` command
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Program under test (path, or a name looked up in PATH)
    pub program: Option<PathBuf>,

    /// Directory searched recursively for inputs
    #[arg(long, short)]
    pub dir: Option<PathBuf>,

    /// Input file extension, without the dot
    #[arg(long, short)]
    pub ext: Option<String>,

    /// Flag passed to the program after the input path
    #[arg(long, allow_hyphen_values = true)]
    pub flag: Option<String>,

    /// Per-input time budget in seconds
    #[arg(long, short, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// How outcomes are decided
    #[arg(long, short)]
    pub classifier: Option<Strategy>,

    /// Config file (default: ./corpus-runner.toml, then the user config)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print captured output under every case that did not pass
    #[arg(long)]
    pub show_output: bool,

    /// Stop at the first case that did not pass
    #[arg(long)]
    pub fail_fast: bool,

    /// Print a JSON report instead of per-test lines
    #[arg(long)]
    pub json: bool,
}
