//! Console and JSON reporting

use colored::Colorize;
use serde::Serialize;

use crate::common::Result;
use crate::harness::{CaseReport, OutcomeKind, Summary, Tally, Termination, Verdict};

/// One case as it appears in the JSON report
#[derive(Debug, Serialize)]
struct CaseRecord {
    name: String,
    path: String,
    outcome: OutcomeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    exit_code: Option<i32>,
    elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    cases: &'a [CaseRecord],
    summary: Summary,
    clean: bool,
}

/// Prints results as cases finish and the tally at the end
pub struct Reporter {
    json: bool,
    show_output: bool,
    total: usize,
    records: Vec<CaseRecord>,
}

impl Reporter {
    pub fn new(json: bool, show_output: bool, total: usize) -> Self {
        Self {
            json,
            show_output,
            total,
            records: Vec::new(),
        }
    }

    pub fn start(&self) {
        if !self.json {
            println!("{} {} inputs\n", "Running".blue().bold(), self.total);
        }
    }

    pub fn case_finished(&mut self, report: &CaseReport<'_>) {
        let exit_code = report
            .result
            .as_ref()
            .and_then(|r| r.termination.status_code());

        if self.json {
            self.records.push(CaseRecord {
                name: report.case.name.clone(),
                path: report.case.path.display().to_string(),
                outcome: report.outcome,
                exit_code,
                elapsed_ms: report.elapsed.as_millis() as u64,
            });
            return;
        }

        let detail = match report.result.as_ref().map(|r| r.termination) {
            Some(Termination::Exited(code)) => format!("exit {}", code),
            Some(Termination::Signaled(signal)) => format!("signal {}", signal),
            Some(Termination::TimedOut) => "killed".to_string(),
            None => report.case.path.display().to_string(),
        };

        println!(
            "  {} [{}/{}] {} {} {}",
            glyph(report.outcome),
            report.index,
            self.total,
            report.case.name.white().bold(),
            paint(report.outcome),
            format!("({}, {:.2}s)", detail, report.elapsed.as_secs_f64()).dimmed()
        );

        if self.show_output && !report.outcome.is_passed() {
            if let Some(output) = report.result.as_ref().and_then(|r| r.output.as_deref()) {
                for line in output.lines() {
                    println!("      {}", line.dimmed());
                }
            }
        }
    }

    pub fn finish(&self, tally: &Tally) -> Result<()> {
        let summary = tally.summary();
        let verdict = Verdict::of(tally);

        if self.json {
            let report = JsonReport {
                cases: &self.records,
                summary,
                clean: verdict == Verdict::Clean,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!(
            "\nTotal: {}  {} {}  {} {}  {} {}  {} {}  {} {}",
            summary.total,
            "Passed:".green(),
            summary.passed,
            "Failed:".red(),
            summary.failed,
            "Timed out:".yellow(),
            summary.timed_out,
            "Unknown:".magenta(),
            summary.unknown,
            "Missing:".red(),
            summary.missing_input,
        );

        match verdict {
            Verdict::Clean => println!("{} {}", "✓".green().bold(), "All tests passed".green().bold()),
            Verdict::Unclean => println!("{} {}", "✗".red().bold(), "Some tests did not pass".red().bold()),
        }
        Ok(())
    }
}

fn glyph(outcome: OutcomeKind) -> colored::ColoredString {
    match outcome {
        OutcomeKind::Passed => "✓".green(),
        OutcomeKind::Failed => "✗".red(),
        OutcomeKind::TimedOut => "⏱".yellow(),
        OutcomeKind::Unknown => "?".magenta(),
        OutcomeKind::MissingInput => "!".red(),
    }
}

fn paint(outcome: OutcomeKind) -> colored::ColoredString {
    let text = outcome.to_string();
    match outcome {
        OutcomeKind::Passed => text.green(),
        OutcomeKind::Failed | OutcomeKind::MissingInput => text.red(),
        OutcomeKind::TimedOut => text.yellow(),
        OutcomeKind::Unknown => text.magenta(),
    }
}
