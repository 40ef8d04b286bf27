//! Presentation layer
//!
//! The pipeline emits events through [`Reporter`]; it never prints.
//! [`ConsoleReporter`] renders them to stderr with colors,
//! [`SilentReporter`] drops them.

use crate::scan::ScanReport;
use crate::schema::{RunStatus, RunSummary, ValidationOutcome};
use console::{Style, Term};

/// Receives pipeline progress. Every method defaults to a no-op.
pub trait Reporter: Send + Sync {
    fn scan_finished(&self, _scan: &ScanReport) {}

    fn filtered(&self, _found: usize, _unique: usize, _candidates: usize) {}

    fn validation_started(&self, _total: usize) {}

    /// Called once per finished check, in completion order
    fn link_checked(&self, _done: usize, _total: usize, _outcome: &ValidationOutcome) {}

    /// A validation task died without producing an outcome
    fn task_aborted(&self, _url: &str, _reason: &str) {}

    /// Failed outcomes, already sorted
    fn failures(&self, _failed: &[&ValidationOutcome]) {}

    fn finished(&self, _summary: &RunSummary) {}
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {}

/// Colored human-readable output on stderr
pub struct ConsoleReporter {
    term: Term,
    green: Style,
    red: Style,
    blue: Style,
    yellow: Style,
}

impl ConsoleReporter {
    pub fn new(color: bool) -> Self {
        let term = Term::stderr();
        let color = color && term.features().colors_supported();
        let style = |s: Style| s.force_styling(color);

        Self {
            term,
            green: style(Style::new().green()),
            red: style(Style::new().red()),
            blue: style(Style::new().blue()),
            yellow: style(Style::new().yellow()),
        }
    }

    fn line(&self, text: impl AsRef<str>) {
        // stderr going away mid-run is not worth aborting over
        let _ = self.term.write_line(text.as_ref());
    }

    /// One failed link: first location, plus how many more places use it
    fn failure_line(&self, outcome: &ValidationOutcome) -> String {
        let occ = &outcome.link.occurrence;
        let mut line = format!(
            "{} {}{} {}",
            occ.url,
            self.yellow.apply_to("File:"),
            occ.source.display(),
            self.blue.apply_to(format!("L:{}", occ.line))
        );
        let others = outcome.link.sightings.saturating_sub(1);
        if others > 0 {
            line.push_str(&format!(" (+{others} more)"));
        }
        line
    }
}

impl Reporter for ConsoleReporter {
    fn scan_finished(&self, scan: &ScanReport) {
        for (path, links) in scan.by_file() {
            self.line(format!(
                "{}:{}\n{}",
                self.yellow.apply_to("File"),
                path.display(),
                "-".repeat(50)
            ));
            for (i, occ) in links.iter().enumerate() {
                self.line(format!(
                    "{} | {} | {}",
                    self.blue.apply_to(i + 1),
                    self.green.apply_to(format!("L:{}", occ.line)),
                    occ.url
                ));
            }
            self.line("");
        }
    }

    fn filtered(&self, found: usize, unique: usize, candidates: usize) {
        self.line(format!(
            "Total links found: {}\nUnique links: {}\nAfter filtering stored and ignored links: {}\n",
            self.yellow.apply_to(found),
            self.green.apply_to(unique),
            self.blue.apply_to(candidates)
        ));
    }

    fn validation_started(&self, total: usize) {
        self.line(format!(
            "Attempting to resolve {} links...\n{}",
            total,
            "-".repeat(50)
        ));
    }

    fn link_checked(&self, done: usize, total: usize, outcome: &ValidationOutcome) {
        let verdict = match &outcome.result {
            Ok(code) => self.green.apply_to(format!("Responded {code}")),
            Err(e) => self.red.apply_to(e.to_string()),
        };
        self.line(format!(
            "[{}/{}] {}\n\t- {}",
            done,
            total,
            outcome.url(),
            verdict
        ));
    }

    fn task_aborted(&self, url: &str, reason: &str) {
        self.line(format!(
            "{} - {}",
            url,
            self.red.apply_to(format!("Unexpected error: {reason}"))
        ));
    }

    fn failures(&self, failed: &[&ValidationOutcome]) {
        if failed.is_empty() {
            return;
        }
        self.line(format!(
            "\nFailed Links: {}\n{}",
            self.red.apply_to(failed.len()),
            "-".repeat(50)
        ));
        for outcome in failed {
            self.line(self.failure_line(outcome));
        }
    }

    fn finished(&self, summary: &RunSummary) {
        match summary.status {
            RunStatus::Skipped => self.line("Skipped link validation!"),
            RunStatus::NothingToCheck => self.line("No new links to check."),
            RunStatus::Checked => {
                if let Some(report) = &summary.report {
                    self.line(format!("\nWriting report to {}", report.display()));
                } else if summary.failed == 0 {
                    self.line(self.green.apply_to("No failed links!").to_string());
                }
                self.line(format!(
                    "Done: {}/{} OK, {} failed",
                    summary.accepted,
                    summary.candidates,
                    self.red.apply_to(summary.failed)
                ));
            }
        }
        if summary.aborted > 0 {
            self.line(format!(
                "{} links aborted and will be re-checked next run",
                summary.aborted
            ));
        }
    }
}
