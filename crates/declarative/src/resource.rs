//! Resource trait for declarative state management
//!
//! A Resource represents something that can be in a certain state,
//! and can be changed to reach a desired state. A [`Descriptor`] pairs a
//! resource with the platforms it applies to.

use crate::context::ApplyContext;
use crate::error::{ApplyError, ProbeError};
use crate::platform::{Applicability, Platform};
use crate::types::{ResourceState, SudoRequirement};
use std::fmt;

/// Core trait for declarative resources
///
/// Every resource kind implements this trait, which provides:
/// - Identity (key, kind, description)
/// - State detection (probe vs desired)
/// - State convergence (apply)
/// - Privilege requirements
///
/// # Example
///
/// ```ignore
/// use declarative::{ApplyContext, ApplyError, Platform, ProbeError, Resource, ResourceState};
///
/// #[derive(Debug)]
/// struct Marker {
///     path: std::path::PathBuf,
/// }
///
/// impl Resource for Marker {
///     fn key(&self) -> String {
///         self.path.display().to_string()
///     }
///
///     fn kind(&self) -> &'static str {
///         "marker"
///     }
///
///     fn description(&self) -> String {
///         format!("Marker file at {}", self.path.display())
///     }
///
///     fn desired_state(&self) -> ResourceState {
///         ResourceState::present()
///     }
///
///     fn probe(&self, _platform: &Platform) -> Result<ResourceState, ProbeError> {
///         Ok(if self.path.exists() {
///             ResourceState::present()
///         } else {
///             ResourceState::Absent
///         })
///     }
///
///     fn apply(&self, _ctx: &mut ApplyContext) -> Result<(), ApplyError> {
///         std::fs::write(&self.path, b"").map_err(|e| ApplyError::io(&self.path, e))
///     }
/// }
/// ```
pub trait Resource: Send + Sync + fmt::Debug {
    /// Stable identifier, unique within its kind
    ///
    /// Examples:
    /// - "ripgrep" for a package
    /// - "zshrc-editor" for a line in a file
    /// - "~/.config/starship.toml" for a symlink
    fn key(&self) -> String;

    /// Resource kind tag (`package`, `line-in-file`, `symlink`, ...)
    ///
    /// Used for grouping, filtering and key uniqueness.
    fn kind(&self) -> &'static str;

    /// Human-readable description of what this resource does
    fn description(&self) -> String;

    /// Whether this resource requires elevated privileges
    fn sudo_requirement(&self) -> SudoRequirement {
        SudoRequirement::None
    }

    /// The state the host should end up in
    fn desired_state(&self) -> ResourceState;

    /// Read the current state. Must not mutate the host.
    fn probe(&self, platform: &Platform) -> Result<ResourceState, ProbeError>;

    /// Move the host to the desired state
    ///
    /// Only called after a probe reported a mismatch; implementations do
    /// not re-check.
    fn apply(&self, ctx: &mut ApplyContext) -> Result<(), ApplyError>;
}

/// A boxed resource for type-erased storage
pub type BoxedResource = Box<dyn Resource>;

/// Extension trait for working with boxed resources
pub trait ResourceExt {
    /// Check if the resource requires sudo based on its requirement
    fn requires_sudo(&self) -> bool;
}

impl<R: Resource + ?Sized> ResourceExt for R {
    fn requires_sudo(&self) -> bool {
        matches!(self.sudo_requirement(), SudoRequirement::Required { .. })
    }
}

/// One declarative unit: a resource plus where it applies
#[derive(Debug)]
pub struct Descriptor {
    resource: BoxedResource,
    applicability: Applicability,
}

impl Descriptor {
    /// Descriptor that applies on every platform
    pub fn new(resource: BoxedResource) -> Self {
        Self {
            resource,
            applicability: Applicability::always(),
        }
    }

    /// Restrict the descriptor to matching platforms
    pub fn when(mut self, applicability: Applicability) -> Self {
        self.applicability = applicability;
        self
    }

    pub fn resource(&self) -> &dyn Resource {
        self.resource.as_ref()
    }

    pub fn applies_to(&self, platform: &Platform) -> bool {
        self.applicability.matches(platform)
    }

    pub fn key(&self) -> String {
        self.resource.key()
    }

    pub fn kind(&self) -> &'static str {
        self.resource.kind()
    }
}

impl<R: Resource + 'static> From<R> for Descriptor {
    fn from(resource: R) -> Self {
        Self::new(Box::new(resource))
    }
}
