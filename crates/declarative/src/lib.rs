//! # Declarative
//!
//! A desired-state reconciliation engine.
//!
//! This crate provides the core abstractions for declaring desired state,
//! probing current state, and converging a host to match, one resource at
//! a time.
//!
//! ## Core Concepts
//!
//! - **Resource**: Something with state that can be probed and corrected
//!   (packages, lines in files, permissions, symlinks)
//! - **Descriptor**: A resource plus the platforms it applies to
//! - **Platform**: The detected OS identity, passed explicitly everywhere
//! - **ExecutionPlan**: Ordered descriptors with unique keys per kind
//! - **Reconciler**: Applies the check-then-act protocol to each descriptor
//! - **PlanReport**: Ordered outcomes plus counts, and a single success flag
//!
//! ## Example
//!
//! ```ignore
//! use declarative::{Descriptor, ExecutionPlan, Reconciler, platform};
//!
//! let platform = platform::detect()?;
//! let plan = ExecutionPlan::from_descriptors([Descriptor::from(my_resource)])?;
//! let report = Reconciler::new(&platform).run(&plan);
//! std::process::exit(if report.succeeded() { 0 } else { 1 });
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`SudoProvider`]: Provides elevated privilege execution
//! - [`ProgressCallback`]: Receives progress updates
//!
//! This allows the crate to be used without hard dependencies on
//! specific UI frameworks, sudo implementations, etc.

pub mod context;
pub mod diff;
pub mod error;
pub mod planner;
pub mod platform;
pub mod reconciler;
pub mod report;
pub mod resource;
pub mod types;

// Re-export main types at crate root
pub use context::{ApplyContext, NoProgress, ProgressCallback, SudoProvider};
pub use diff::{DiffSet, DiffSummary, ProbeFailure, ResourceDiff, compute_diffs, group_by_kind};
pub use error::{ApplyError, Error, ProbeError, Result, UnsupportedPlatformError};
pub use planner::ExecutionPlan;
pub use platform::{Applicability, OsFamily, PackageManager, Platform};
pub use reconciler::{Reconciler, VERIFY_MISMATCH};
pub use report::{FailureStage, Outcome, OutcomeStatus, PlanReport, ReportBuilder, Summary};
pub use resource::{BoxedResource, Descriptor, Resource, ResourceExt};
pub use types::{CommandOutput, ResourceState, SudoRequirement};
