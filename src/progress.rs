//! Progress indicator for reconciliation runs

use declarative::{Outcome, PlanReport, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TEMPLATE: &str = "{spinner:.green} [{pos}/{len}] {msg}";

/// Spinner showing the resource currently being reconciled
///
/// Outcomes are not printed here; the full report follows the run.
pub struct RunProgress {
    bar: ProgressBar,
}

impl RunProgress {
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        bar.set_style(
            ProgressStyle::with_template(TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { bar }
    }
}

impl ProgressCallback for RunProgress {
    fn on_run_start(&mut self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn on_resource_start(&mut self, _key: &str, description: &str) {
        self.bar.set_message(description.to_string());
    }

    fn on_resource_complete(&mut self, outcome: &Outcome) {
        log::trace!("{outcome}");
        self.bar.inc(1);
    }

    fn on_run_complete(&mut self, _report: &PlanReport) {
        self.bar.finish_and_clear();
    }
}
