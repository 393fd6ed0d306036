//! Outcome classification
//!
//! Turns the raw signals of one invocation into an [`OutcomeKind`]. Two rule
//! tables are supported, because programs under test report results in one of
//! two ways: through their exit status, or by printing a marker phrase.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::runner::{InvocationResult, Termination};

/// Exit status `timeout(1)` reports when it had to kill its command
pub const EXTERNAL_TIMEOUT_STATUS: i32 = 124;

/// Classification of a single test's result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Passed,
    Failed,
    TimedOut,
    Unknown,
    MissingInput,
}

impl OutcomeKind {
    /// Every kind, in report order
    pub const ALL: [OutcomeKind; 5] = [
        OutcomeKind::Passed,
        OutcomeKind::Failed,
        OutcomeKind::TimedOut,
        OutcomeKind::Unknown,
        OutcomeKind::MissingInput,
    ];

    pub(crate) fn index(self) -> usize {
        self as usize
    }

    pub fn is_passed(self) -> bool {
        self == OutcomeKind::Passed
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeKind::Passed => write!(f, "passed"),
            OutcomeKind::Failed => write!(f, "failed"),
            OutcomeKind::TimedOut => write!(f, "timed out"),
            OutcomeKind::Unknown => write!(f, "unknown"),
            OutcomeKind::MissingInput => write!(f, "missing input"),
        }
    }
}

/// Which rule table decides outcomes for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Exit status only: 0 passes, 1 fails
    #[default]
    ExitCode,
    /// Marker phrases in the captured output
    Text,
    /// Exit status first, markers when the status is not recognized
    Fallback,
}

/// A marker phrase and the outcome it signals
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MarkerRule {
    /// Case-sensitive substring searched for in the output
    pub pattern: String,
    /// Outcome when the pattern is present
    pub outcome: OutcomeKind,
}

impl MarkerRule {
    pub fn new(pattern: impl Into<String>, outcome: OutcomeKind) -> Self {
        Self {
            pattern: pattern.into(),
            outcome,
        }
    }
}

/// Default marker table, highest priority first
///
/// Covers the emulator's own console phrases as well as the phrases common
/// test ROMs print over serial.
pub fn default_markers() -> Vec<MarkerRule> {
    vec![
        MarkerRule::new("Teste deu timeout", OutcomeKind::TimedOut),
        MarkerRule::new("Timed out", OutcomeKind::TimedOut),
        MarkerRule::new("Teste passou", OutcomeKind::Passed),
        MarkerRule::new("Passed", OutcomeKind::Passed),
        MarkerRule::new("Teste falhou", OutcomeKind::Failed),
        MarkerRule::new("Failed", OutcomeKind::Failed),
    ]
}

/// Maps an invocation's raw result to an outcome
///
/// Implementations are pure and must not fail: anything unrecognized is
/// [`OutcomeKind::Unknown`].
pub trait Classifier: Send + Sync {
    fn classify(&self, result: &InvocationResult) -> OutcomeKind;

    /// Whether the runner has to capture output for this classifier
    fn needs_output(&self) -> bool {
        false
    }
}

/// Exit-status rule table
#[derive(Debug, Clone)]
pub struct ExitCodeTable {
    timeout_codes: Vec<i32>,
}

impl ExitCodeTable {
    pub fn new(timeout_codes: Vec<i32>) -> Self {
        Self { timeout_codes }
    }
}

impl Default for ExitCodeTable {
    fn default() -> Self {
        Self::new(vec![EXTERNAL_TIMEOUT_STATUS])
    }
}

impl Classifier for ExitCodeTable {
    fn classify(&self, result: &InvocationResult) -> OutcomeKind {
        let code = match result.termination {
            Termination::TimedOut => return OutcomeKind::TimedOut,
            other => other.status_code(),
        };
        match code {
            Some(0) => OutcomeKind::Passed,
            Some(1) => OutcomeKind::Failed,
            Some(c) if self.timeout_codes.contains(&c) => OutcomeKind::TimedOut,
            _ => OutcomeKind::Unknown,
        }
    }
}

/// Ordered marker rule table
///
/// The first rule whose pattern occurs anywhere in the output wins. Position in
/// the text is irrelevant, so a timeout marker beats a stray "Failed" that
/// printed earlier.
#[derive(Debug, Clone)]
pub struct MarkerTable {
    rules: Vec<MarkerRule>,
}

impl MarkerTable {
    pub fn new(rules: Vec<MarkerRule>) -> Self {
        Self { rules }
    }

    fn scan(&self, output: &str) -> Option<OutcomeKind> {
        self.rules
            .iter()
            .find(|rule| !rule.pattern.is_empty() && output.contains(&rule.pattern))
            .map(|rule| rule.outcome)
    }
}

impl Default for MarkerTable {
    fn default() -> Self {
        Self::new(default_markers())
    }
}

impl Classifier for MarkerTable {
    fn classify(&self, result: &InvocationResult) -> OutcomeKind {
        if result.termination == Termination::TimedOut {
            return OutcomeKind::TimedOut;
        }
        result
            .output
            .as_deref()
            .and_then(|output| self.scan(output))
            .unwrap_or(OutcomeKind::Unknown)
    }

    fn needs_output(&self) -> bool {
        true
    }
}

/// Exit-code table, falling back to markers for unrecognized statuses
#[derive(Debug, Clone, Default)]
pub struct FallbackTable {
    exit_codes: ExitCodeTable,
    markers: MarkerTable,
}

impl FallbackTable {
    pub fn new(exit_codes: ExitCodeTable, markers: MarkerTable) -> Self {
        Self {
            exit_codes,
            markers,
        }
    }
}

impl Classifier for FallbackTable {
    fn classify(&self, result: &InvocationResult) -> OutcomeKind {
        match self.exit_codes.classify(result) {
            OutcomeKind::Unknown => self.markers.classify(result),
            outcome => outcome,
        }
    }

    fn needs_output(&self) -> bool {
        true
    }
}

/// Build the classifier for a strategy
pub fn build(
    strategy: Strategy,
    timeout_codes: Vec<i32>,
    markers: Vec<MarkerRule>,
) -> Box<dyn Classifier> {
    match strategy {
        Strategy::ExitCode => Box::new(ExitCodeTable::new(timeout_codes)),
        Strategy::Text => Box::new(MarkerTable::new(markers)),
        Strategy::Fallback => Box::new(FallbackTable::new(
            ExitCodeTable::new(timeout_codes),
            MarkerTable::new(markers),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(code: i32, output: Option<&str>) -> InvocationResult {
        InvocationResult {
            termination: Termination::Exited(code),
            output: output.map(str::to_string),
        }
    }

    fn timed_out(output: Option<&str>) -> InvocationResult {
        InvocationResult {
            termination: Termination::TimedOut,
            output: output.map(str::to_string),
        }
    }

    #[test]
    fn test_exit_code_table() {
        let table = ExitCodeTable::default();
        assert_eq!(table.classify(&exited(0, None)), OutcomeKind::Passed);
        assert_eq!(table.classify(&exited(1, None)), OutcomeKind::Failed);
        assert_eq!(table.classify(&exited(124, None)), OutcomeKind::TimedOut);
        assert_eq!(table.classify(&exited(2, None)), OutcomeKind::Unknown);
        assert_eq!(table.classify(&exited(-1, None)), OutcomeKind::Unknown);
        assert_eq!(table.classify(&timed_out(None)), OutcomeKind::TimedOut);
    }

    #[test]
    fn test_exit_zero_passes_whatever_the_output_says() {
        let table = ExitCodeTable::default();
        let result = exited(0, Some("Failed #3\nTeste deu timeout"));
        assert_eq!(table.classify(&result), OutcomeKind::Passed);
    }

    #[test]
    fn test_killed_by_signal_is_unknown() {
        let table = ExitCodeTable::default();
        let result = InvocationResult {
            termination: Termination::Signaled(9),
            output: None,
        };
        assert_eq!(table.classify(&result), OutcomeKind::Unknown);
    }

    #[test]
    fn test_custom_timeout_codes() {
        let table = ExitCodeTable::new(vec![2, 124]);
        assert_eq!(table.classify(&exited(2, None)), OutcomeKind::TimedOut);
        assert_eq!(table.classify(&exited(3, None)), OutcomeKind::Unknown);
    }

    #[test]
    fn test_marker_table_priority_beats_position() {
        let table = MarkerTable::default();
        let result = exited(1, Some("cpu_instr\nFailed #2\n...\nTimed out waiting for serial"));
        assert_eq!(table.classify(&result), OutcomeKind::TimedOut);
    }

    #[test]
    fn test_marker_table_pass_beats_fail() {
        let table = MarkerTable::default();
        let result = exited(0, Some("Failed 0 tests\nPassed"));
        assert_eq!(table.classify(&result), OutcomeKind::Passed);
    }

    #[test]
    fn test_marker_table_is_case_sensitive() {
        let table = MarkerTable::default();
        assert_eq!(
            table.classify(&exited(0, Some("PASSED"))),
            OutcomeKind::Unknown
        );
        assert_eq!(
            table.classify(&exited(0, Some("✅ Teste passou"))),
            OutcomeKind::Passed
        );
    }

    #[test]
    fn test_marker_table_without_output_is_unknown() {
        let table = MarkerTable::default();
        assert_eq!(table.classify(&exited(0, None)), OutcomeKind::Unknown);
        assert_eq!(table.classify(&exited(0, Some(""))), OutcomeKind::Unknown);
    }

    #[test]
    fn test_runner_timeout_overrides_markers() {
        let table = MarkerTable::default();
        assert_eq!(
            table.classify(&timed_out(Some("Passed"))),
            OutcomeKind::TimedOut
        );
    }

    #[test]
    fn test_empty_pattern_never_matches() {
        let table = MarkerTable::new(vec![
            MarkerRule::new("", OutcomeKind::Passed),
            MarkerRule::new("boom", OutcomeKind::Failed),
        ]);
        assert_eq!(table.classify(&exited(0, Some("boom"))), OutcomeKind::Failed);
    }

    #[test]
    fn test_fallback_consults_markers_only_for_unknown_status() {
        let table = FallbackTable::default();
        assert_eq!(
            table.classify(&exited(1, Some("Passed"))),
            OutcomeKind::Failed
        );
        assert_eq!(
            table.classify(&exited(2, Some("⏱️ Teste deu timeout"))),
            OutcomeKind::TimedOut
        );
        assert_eq!(table.classify(&exited(2, None)), OutcomeKind::Unknown);
    }

    #[test]
    fn test_build_selects_strategy() {
        let exit = build(Strategy::ExitCode, vec![124], default_markers());
        assert!(!exit.needs_output());
        assert_eq!(exit.classify(&exited(0, None)), OutcomeKind::Passed);

        let text = build(Strategy::Text, vec![124], default_markers());
        assert!(text.needs_output());
        assert_eq!(text.classify(&exited(0, None)), OutcomeKind::Unknown);

        assert!(build(Strategy::Fallback, vec![], default_markers()).needs_output());
    }

    #[test]
    fn test_markers_deserialize_from_toml() {
        #[derive(Deserialize)]
        struct Doc {
            markers: Vec<MarkerRule>,
        }
        let doc: Doc = toml::from_str(
            r#"
[[markers]]
pattern = "All tests OK"
outcome = "passed"

[[markers]]
pattern = "hang"
outcome = "timed_out"
"#,
        )
        .unwrap();
        assert_eq!(doc.markers[0], MarkerRule::new("All tests OK", OutcomeKind::Passed));
        assert_eq!(doc.markers[1].outcome, OutcomeKind::TimedOut);
    }
}
