//! Error types for the reconciliation engine
//!
//! Probe and apply failures are per-resource and end up inside a
//! [`crate::Outcome`]. Only [`UnsupportedPlatformError`] and plan
//! validation errors are fatal to a run.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The host does not match any known OS/distribution signature
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported platform: {os} ({})", .distro.as_deref().unwrap_or("unknown distribution"))]
pub struct UnsupportedPlatformError {
    /// OS name as reported by the compiler target (`linux`, `macos`, ...)
    pub os: String,
    /// Distribution id from os-release, when one was found
    pub distro: Option<String>,
}

/// Reading the current state of a resource failed
///
/// "Resource absent" is a valid state, not a `ProbeError`.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Filesystem read failed for a reason other than "not found"
    #[error("failed to inspect {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A query command could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// A query command ran but its answer could not be interpreted
    #[error("{program}: {message}")]
    Command { program: String, message: String },
}

impl ProbeError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Performing the corrective action failed
#[derive(Error, Debug)]
pub enum ApplyError {
    /// Filesystem mutation failed
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An external tool could not be started
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// An external tool exited unsuccessfully
    #[error("{program} exited with {}: {}", describe_exit(.code), .stderr.trim())]
    Command {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// Fetching a remote artifact failed
    #[error("failed to fetch {url}: {message}")]
    Network { url: String, message: String },

    /// Something the action depends on is not in place
    #[error("{0}")]
    Precondition(String),

    /// The action needs elevated privileges but none were provided
    #[error("sudo required but not available")]
    SudoUnavailable,
}

impl ApplyError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

/// Errors that abort a run before any resource is evaluated
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    UnsupportedPlatform(#[from] UnsupportedPlatformError),

    /// Two descriptors of the same kind share a key
    #[error("duplicate {kind} resource '{key}'")]
    DuplicateKey { kind: String, key: String },
}

/// Result type for plan construction
pub type Result<T> = std::result::Result<T, Error>;
