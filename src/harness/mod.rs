//! Batch test harness engine
//!
//! Runs the program under test once per corpus input, classifies each run,
//! and tallies the outcomes into a verdict.

pub mod case;
pub mod classify;
pub mod driver;
pub mod interrupt;
pub mod runner;
pub mod tally;

pub use case::{discover, TestCase};
pub use classify::{Classifier, MarkerRule, OutcomeKind, Strategy};
pub use driver::{run_batch, BatchOptions, CaseReport, Verdict};
pub use interrupt::Interrupt;
pub use runner::{InvocationResult, Invoke, ProcessRunner, RunnerConfig, Termination};
pub use tally::{Summary, Tally};
