//! Core types for declarative resource management

use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::Output;

/// Requirement level for sudo/elevated privileges
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SudoRequirement {
    /// No elevated privileges needed
    #[default]
    None,
    /// Elevated privileges required with a reason
    Required { reason: String },
}

/// Current or desired state of a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceState {
    /// Resource exists/is configured
    Present { details: Option<String> },
    /// Resource does not exist/is not configured
    Absent,
    /// Resource exists but differs from desired
    Modified { from: String, to: String },
}

impl ResourceState {
    /// Shorthand for `Present` without details
    pub fn present() -> Self {
        Self::Present { details: None }
    }

    /// `Present` carrying a detail string (mode bits, link target, ...)
    pub fn present_with(details: impl Into<String>) -> Self {
        Self::Present {
            details: Some(details.into()),
        }
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present { details: None } => write!(f, "present"),
            Self::Present { details: Some(d) } => write!(f, "present ({d})"),
            Self::Absent => write!(f, "absent"),
            Self::Modified { from, to } => write!(f, "{from} (want {to})"),
        }
    }
}

/// Output from an external command
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

impl CommandOutput {
    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_display() {
        assert_eq!(ResourceState::present().to_string(), "present");
        assert_eq!(
            ResourceState::present_with("0600").to_string(),
            "present (0600)"
        );
        assert_eq!(
            ResourceState::Modified {
                from: "0644".into(),
                to: "0600".into()
            }
            .to_string(),
            "0644 (want 0600)"
        );
    }

    #[test]
    fn test_sudo_requirement_default() {
        assert_eq!(SudoRequirement::default(), SudoRequirement::None);
    }
}
