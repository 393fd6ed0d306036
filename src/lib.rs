//! Corpus Runner - batch test harness
//!
//! Runs a program under test once per input file, enforces a time budget on
//! each run, classifies every run into a fixed set of outcomes and turns the
//! tally into a pass/fail exit status.

pub mod cli;
pub mod commands;
pub mod common;
pub mod harness;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use harness::{OutcomeKind, Tally, TestCase};
