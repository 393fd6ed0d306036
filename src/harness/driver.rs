//! Batch driver
//!
//! Walks the corpus in order, one invocation at a time, and folds each outcome
//! into a [`Tally`] it owns and hands back.

use std::time::{Duration, Instant};

use crate::common::{Error, Result};

use super::case::TestCase;
use super::classify::{Classifier, OutcomeKind};
use super::interrupt::Interrupt;
use super::runner::{InvocationResult, Invoke};
use super::tally::Tally;

/// Options that change how a batch proceeds, not how a case is judged
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Capture output even if the classifier does not need it
    pub capture_output: bool,
    /// Stop after the first case that did not pass
    pub fail_fast: bool,
}

/// Everything known about one finished case
#[derive(Debug)]
pub struct CaseReport<'a> {
    /// Position in the corpus, starting at 1
    pub index: usize,
    pub case: &'a TestCase,
    pub outcome: OutcomeKind,
    /// `None` when the program was never invoked (missing input)
    pub result: Option<InvocationResult>,
    pub elapsed: Duration,
}

/// Clean/unclean judgment of a finished batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Clean,
    Unclean,
}

impl Verdict {
    pub fn of(tally: &Tally) -> Self {
        if tally.is_clean() {
            Verdict::Clean
        } else {
            Verdict::Unclean
        }
    }

    pub fn exit_code(self) -> i32 {
        match self {
            Verdict::Clean => 0,
            Verdict::Unclean => 1,
        }
    }
}

/// Run every case in order and return the tally
///
/// `on_case` is called once per classified case, in corpus order, before the
/// next case starts. Per-test problems are outcomes; only a spawn failure or an
/// interrupt ends the batch early with an error.
pub async fn run_batch<R, F>(
    cases: &[TestCase],
    runner: &mut R,
    classifier: &dyn Classifier,
    interrupt: &Interrupt,
    options: BatchOptions,
    mut on_case: F,
) -> Result<Tally>
where
    R: Invoke + ?Sized,
    F: FnMut(&CaseReport<'_>),
{
    let capture = options.capture_output || classifier.needs_output();
    let mut tally = Tally::new();

    tracing::info!("Running {} test cases", cases.len());

    for (i, case) in cases.iter().enumerate() {
        if let Some(signal) = interrupt.pending() {
            return Err(Error::Interrupted(signal));
        }

        let started = Instant::now();
        let (outcome, result) = if case.input_exists() {
            let result = runner.invoke(case, capture, interrupt).await?;
            (classifier.classify(&result), Some(result))
        } else {
            tracing::debug!("Input {} does not exist", case.path.display());
            (OutcomeKind::MissingInput, None)
        };

        tally.record(outcome);
        on_case(&CaseReport {
            index: i + 1,
            case,
            outcome,
            result,
            elapsed: started.elapsed(),
        });

        if options.fail_fast && !outcome.is_passed() {
            tracing::info!(
                "Stopping after {} ({}), {} cases not run",
                case.name,
                outcome,
                cases.len() - i - 1
            );
            break;
        }
    }

    tracing::info!("Batch finished: {:?}", tally.summary());
    Ok(tally)
}
