//! Apply context and provider traits
//!
//! These traits allow the declarative crate to be used without
//! depending on specific implementations of sudo, progress, etc.

use crate::error::ApplyError;
use crate::platform::Platform;
use crate::report::{Outcome, PlanReport};
use crate::types::CommandOutput;

/// Provider for elevated privilege operations
///
/// Implement this trait to provide sudo/admin capabilities.
/// The implementation handles privilege acquisition and release.
pub trait SudoProvider: Send + Sync {
    /// Run a command with elevated privileges
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput, ApplyError>;

    /// Run a command with elevated privileges, feeding `input` on stdin
    fn run_with_input(
        &self,
        cmd: &str,
        args: &[&str],
        input: &[u8],
    ) -> Result<CommandOutput, ApplyError>;

    /// Run a command and turn a non-zero exit into an error
    fn run_checked(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput, ApplyError> {
        let output = self.run(cmd, args)?;
        if !output.success {
            return Err(ApplyError::Command {
                program: format!("sudo {cmd}"),
                code: output.code,
                stderr: output.stderr_str(),
            });
        }
        Ok(output)
    }
}

/// Progress callback for reconciliation runs
///
/// Implement this trait to receive progress updates during a run.
pub trait ProgressCallback {
    /// Called once before the first descriptor is evaluated
    fn on_run_start(&mut self, total: usize);

    /// Called when starting to reconcile a single resource
    fn on_resource_start(&mut self, key: &str, description: &str);

    /// Called when a resource reaches its terminal outcome
    fn on_resource_complete(&mut self, outcome: &Outcome);

    /// Called after the last descriptor
    fn on_run_complete(&mut self, report: &PlanReport);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_run_start(&mut self, _total: usize) {}
    fn on_resource_start(&mut self, _key: &str, _description: &str) {}
    fn on_resource_complete(&mut self, _outcome: &Outcome) {}
    fn on_run_complete(&mut self, _report: &PlanReport) {}
}

/// Context passed to resource apply operations
pub struct ApplyContext<'a> {
    /// The detected host platform
    pub platform: &'a Platform,
    /// Optional sudo provider for privileged operations
    pub sudo: Option<&'a dyn SudoProvider>,
}

impl<'a> ApplyContext<'a> {
    /// Create a new apply context
    pub fn new(platform: &'a Platform) -> Self {
        Self {
            platform,
            sudo: None,
        }
    }

    /// Create a context with a sudo provider
    pub fn with_sudo(platform: &'a Platform, sudo: &'a dyn SudoProvider) -> Self {
        Self {
            platform,
            sudo: Some(sudo),
        }
    }

    /// Get the sudo provider, or error if not available
    pub fn require_sudo(&self) -> Result<&'a dyn SudoProvider, ApplyError> {
        self.sudo.ok_or(ApplyError::SudoUnavailable)
    }
}
