//! Execution: diff, acquire sudo when needed, reconcile

use declarative::{ExecutionPlan, Platform, PlanReport, Reconciler, ResourceDiff, compute_diffs};

use super::differ::{display_diff, display_sudo_boundary};
use crate::progress::RunProgress;
use crate::sudo::SudoContext;
use crate::ui;

/// Options for one reconciliation run
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// No diff display or spinner
    pub quiet: bool,
}

/// Run the plan and return its report
///
/// Sudo is acquired at most once, and only when a pending change needs
/// it. When it cannot be acquired the run still proceeds; privileged
/// actions then fail individually.
pub fn execute(plan: &ExecutionPlan, platform: &Platform, opts: &ExecuteOptions) -> PlanReport {
    // 1. Compute and show pending changes
    let diffs = compute_diffs(plan, platform);
    if !opts.quiet {
        display_diff(&diffs);
    }

    // 2. Privileges, once
    let privileged: Vec<&ResourceDiff> =
        diffs.changes.iter().filter(|d| d.requires_sudo).collect();
    let sudo = if privileged.is_empty() {
        None
    } else {
        if !opts.quiet {
            display_sudo_boundary(&privileged);
        }
        match SudoContext::acquire("Apply privileged system configuration") {
            Ok(sudo) => {
                if !opts.quiet {
                    ui::success("Sudo privileges acquired");
                }
                Some(sudo)
            }
            Err(e) => {
                ui::warn(&format!("{e:#}; privileged resources will fail"));
                None
            }
        }
    };

    // 3. Reconcile in declaration order
    let mut reconciler = Reconciler::new(platform);
    if let Some(sudo) = &sudo {
        reconciler = reconciler.with_sudo(sudo);
    }
    let mut progress = RunProgress::new(opts.quiet);
    reconciler.run_with_progress(plan, &mut progress)
}
