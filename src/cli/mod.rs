//! CLI command handling
//!
//! Resolves flags against the config file, drives the batch and prints
//! results.

mod report;

use std::path::PathBuf;
use std::time::Duration;

use crate::commands::{Commands, RunArgs};
use crate::common::config::{resolve_program, Config};
use crate::common::{Error, Result};
use crate::harness::{
    classify, discover, run_batch, BatchOptions, Interrupt, ProcessRunner, RunnerConfig, Verdict,
};

use report::Reporter;

/// Dispatch a CLI command, returning the process exit status
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run(args) => {
            // Installed first so a signal during config loading or discovery
            // still ends the batch with 128 + signal.
            let interrupt = Interrupt::install()?;
            run(args, &interrupt).await
        }

        Commands::List { dir, ext, config } => {
            let config = Config::load(config.as_deref())?;
            let (dir, ext) = corpus_location(&config, dir, ext);

            let cases = discover(&dir, &ext)?;
            if cases.is_empty() {
                eprintln!("No .{} files under {}", ext, dir.display());
            }
            for case in &cases {
                println!("{}\t{}", case.name, case.path.display());
            }
            Ok(0)
        }
    }
}

/// Execute the `run` command, observing `interrupt` from the first step on
async fn run(args: RunArgs, interrupt: &Interrupt) -> Result<i32> {
    let RunArgs {
        program,
        dir,
        ext,
        flag,
        timeout,
        classifier,
        config,
        show_output,
        fail_fast,
        json,
    } = args;

    let config = Config::load(config.as_deref())?;

    let program = program
        .or_else(|| config.program.path.clone())
        .ok_or(Error::NoProgram)?;
    let program = resolve_program(&program)?;

    let runner_config = RunnerConfig {
        program,
        flag: flag.unwrap_or_else(|| config.program.flag.clone()),
        timeout: timeout
            .map(Duration::from_secs)
            .unwrap_or_else(|| config.timeouts.run()),
        grace_period: config.timeouts.grace(),
    };
    let classifier = classify::build(
        classifier.unwrap_or(config.classifier.strategy),
        config.classifier.timeout_codes.clone(),
        config.classifier.markers.clone(),
    );

    let (dir, ext) = corpus_location(&config, dir, ext);
    let cases = discover(&dir, &ext)?;

    tracing::info!(
        "Testing {} against {} inputs from {} (timeout {:?})",
        runner_config.program.display(),
        cases.len(),
        dir.display(),
        runner_config.timeout
    );

    let mut runner = ProcessRunner::new(runner_config);
    let mut reporter = Reporter::new(json, show_output, cases.len());
    let options = BatchOptions {
        capture_output: show_output,
        fail_fast,
    };

    reporter.start();
    let tally = run_batch(
        &cases,
        &mut runner,
        classifier.as_ref(),
        interrupt,
        options,
        |report| reporter.case_finished(report),
    )
    .await?;

    // A signal that lands after the last case still wins over the verdict.
    if let Some(signal) = interrupt.pending() {
        return Err(Error::Interrupted(signal));
    }

    reporter.finish(&tally)?;
    Ok(Verdict::of(&tally).exit_code())
}

fn corpus_location(config: &Config, dir: Option<PathBuf>, ext: Option<String>) -> (PathBuf, String) {
    (
        dir.unwrap_or_else(|| config.discovery.dir.clone()),
        ext.unwrap_or_else(|| config.discovery.extension.clone()),
    )
}
