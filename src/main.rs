//! Corpus Runner - batch test harness
//!
//! Runs an emulator (or any program taking `<input> <flag>`) against every
//! test input in a directory and exits 0 only if all of them passed.

use clap::{ArgAction, Parser};
use corpus_runner::common::logging;
use corpus_runner::harness::interrupt;
use corpus_runner::{cli, commands, Error};
use commands::Commands;

#[derive(Parser)]
#[command(name = "corpus-runner", about = "Batch test harness for test-input corpora")]
#[command(version, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli(cli.verbose);

    let code = match cli::dispatch(cli.command).await {
        Ok(code) => code,
        Err(Error::Interrupted(signal)) => {
            interrupt::restore_default();
            eprintln!("Interrupted by signal {signal}");
            Error::Interrupted(signal).exit_code()
        }
        Err(e) => {
            eprintln!("Error: {e}");
            e.exit_code()
        }
    };

    std::process::exit(code);
}
