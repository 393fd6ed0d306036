//! Per-kind outcome counts for a batch

use serde::Serialize;

use super::classify::OutcomeKind;

/// Running count of outcomes across a batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    counts: [usize; OutcomeKind::ALL.len()],
    total: usize,
}

/// Read-only snapshot of a [`Tally`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub unknown: usize,
    pub missing_input: usize,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one classified case
    pub fn record(&mut self, kind: OutcomeKind) {
        self.counts[kind.index()] += 1;
        self.total += 1;
    }

    pub fn count(&self, kind: OutcomeKind) -> usize {
        self.counts[kind.index()]
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn summary(&self) -> Summary {
        Summary {
            total: self.total,
            passed: self.count(OutcomeKind::Passed),
            failed: self.count(OutcomeKind::Failed),
            timed_out: self.count(OutcomeKind::TimedOut),
            unknown: self.count(OutcomeKind::Unknown),
            missing_input: self.count(OutcomeKind::MissingInput),
        }
    }

    /// True iff no case ended in anything but Passed
    pub fn is_clean(&self) -> bool {
        OutcomeKind::ALL
            .iter()
            .filter(|kind| !kind.is_passed())
            .all(|kind| self.count(*kind) == 0)
    }
}

impl Summary {
    /// Sum of the per-kind counts; equals `total` for any complete batch
    pub fn classified(&self) -> usize {
        self.passed + self.failed + self.timed_out + self.unknown + self.missing_input
    }
}
