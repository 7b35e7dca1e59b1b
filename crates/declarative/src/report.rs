//! Plan report - per-resource outcomes of a reconciliation run
//!
//! A [`PlanReport`] is built incrementally by the reconciler through a
//! [`ReportBuilder`] and is read-only once the run completes.

use serde::Serialize;
use std::fmt;

/// Note recorded for descriptors filtered out by applicability
pub const NOT_APPLICABLE: &str = "not applicable";

/// Which step of the check-then-act protocol failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Reading the current state failed
    Probe,
    /// The corrective action failed
    Apply,
    /// The action reported success but the re-probe disagrees (or failed)
    Verify,
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Probe => write!(f, "probe"),
            Self::Apply => write!(f, "apply"),
            Self::Verify => write!(f, "verify"),
        }
    }
}

/// Terminal status of one descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// Current state already matched the desired state
    AlreadySatisfied,
    /// The action ran and the re-probe confirmed the desired state
    Applied,
    /// Not evaluated
    Skipped { reason: String },
    /// Not satisfied at the end of the run
    Failed { stage: FailureStage, error: String },
}

/// Result of reconciling one descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub kind: String,
    pub key: String,
    /// Human-readable note (description or state transition)
    pub note: String,
    #[serde(flatten)]
    pub status: OutcomeStatus,
}

impl Outcome {
    pub fn already_satisfied(kind: &str, key: &str, note: impl Into<String>) -> Self {
        Self::with_status(kind, key, note, OutcomeStatus::AlreadySatisfied)
    }

    pub fn applied(kind: &str, key: &str, note: impl Into<String>) -> Self {
        Self::with_status(kind, key, note, OutcomeStatus::Applied)
    }

    pub fn skipped(kind: &str, key: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        Self::with_status(
            kind,
            key,
            reason.clone(),
            OutcomeStatus::Skipped { reason },
        )
    }

    pub fn failed(
        kind: &str,
        key: &str,
        note: impl Into<String>,
        stage: FailureStage,
        error: impl Into<String>,
    ) -> Self {
        Self::with_status(
            kind,
            key,
            note,
            OutcomeStatus::Failed {
                stage,
                error: error.into(),
            },
        )
    }

    fn with_status(kind: &str, key: &str, note: impl Into<String>, status: OutcomeStatus) -> Self {
        Self {
            kind: kind.to_string(),
            key: key.to_string(),
            note: note.into(),
            status,
        }
    }

    /// Single-character status marker used in plain renderings
    pub fn symbol(&self) -> &'static str {
        match self.status {
            OutcomeStatus::AlreadySatisfied => "○",
            OutcomeStatus::Applied => "✓",
            OutcomeStatus::Skipped { .. } => "⊘",
            OutcomeStatus::Failed { .. } => "✗",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.symbol(), self.kind, self.key)?;
        match &self.status {
            OutcomeStatus::AlreadySatisfied => write!(f, " - already satisfied"),
            OutcomeStatus::Applied => write!(f, " - applied ({})", self.note),
            OutcomeStatus::Skipped { reason } => write!(f, " - skipped: {reason}"),
            OutcomeStatus::Failed { stage, error } => {
                write!(f, " - failed during {stage}: {error}")
            }
        }
    }
}

/// Counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub already_satisfied: usize,
    pub applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl Summary {
    /// Total number of resources recorded
    pub fn total(&self) -> usize {
        self.already_satisfied + self.applied + self.skipped + self.failed
    }

    /// Add a status to the summary
    pub fn add(&mut self, status: &OutcomeStatus) {
        match status {
            OutcomeStatus::AlreadySatisfied => self.already_satisfied += 1,
            OutcomeStatus::Applied => self.applied += 1,
            OutcomeStatus::Skipped { .. } => self.skipped += 1,
            OutcomeStatus::Failed { .. } => self.failed += 1,
        }
    }
}

/// Ordered outcomes of one run plus their summary
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanReport {
    outcomes: Vec<Outcome>,
    summary: Summary,
}

impl PlanReport {
    /// Outcomes in descriptor declaration order
    pub fn outcomes(&self) -> &[Outcome] {
        &self.outcomes
    }

    pub fn summary(&self) -> Summary {
        self.summary
    }

    /// True iff no outcome is `failed`
    pub fn succeeded(&self) -> bool {
        self.summary.failed == 0
    }
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            writeln!(f, "{outcome}")?;
        }
        let s = &self.summary;
        write!(
            f,
            "{} resources: {} applied, {} already satisfied, {} skipped, {} failed",
            s.total(),
            s.applied,
            s.already_satisfied,
            s.skipped,
            s.failed
        )
    }
}

/// Incrementally assembles a [`PlanReport`]
#[derive(Debug, Default)]
pub struct ReportBuilder {
    report: PlanReport,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: Outcome) {
        self.report.summary.add(&outcome.status);
        self.report.outcomes.push(outcome);
    }

    pub fn finish(self) -> PlanReport {
        self.report
    }
}
