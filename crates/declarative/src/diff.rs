//! Diff computation for resources
//!
//! A probe-only preview of what a reconciliation run would change. No
//! action is invoked.

use crate::error::ProbeError;
use crate::planner::ExecutionPlan;
use crate::platform::Platform;
use crate::resource::{Descriptor, ResourceExt};
use crate::types::ResourceState;
use serde::Serialize;
use std::collections::BTreeMap;

/// A diff between current and desired state of a resource
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDiff {
    /// Unique identifier of the resource within its kind
    pub key: String,
    /// Kind of the resource
    pub kind: String,
    /// Human-readable description
    pub description: String,
    /// Current state
    pub current: ResourceState,
    /// Desired state
    pub desired: ResourceState,
    /// Whether this resource requires sudo
    pub requires_sudo: bool,
}

impl ResourceDiff {
    /// Create a diff from a descriptor, returning None if no changes are
    /// needed or the descriptor does not apply to `platform`
    pub fn from_descriptor(
        descriptor: &Descriptor,
        platform: &Platform,
    ) -> Result<Option<Self>, ProbeError> {
        if !descriptor.applies_to(platform) {
            return Ok(None);
        }

        let resource = descriptor.resource();
        let current = resource.probe(platform)?;
        let desired = resource.desired_state();

        if current == desired {
            return Ok(None);
        }

        Ok(Some(Self {
            key: resource.key(),
            kind: resource.kind().to_string(),
            description: resource.description(),
            current,
            desired,
            requires_sudo: resource.requires_sudo(),
        }))
    }

    /// Check if this diff represents an addition
    pub fn is_addition(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Absent, ResourceState::Present { .. })
        )
    }

    /// Check if this diff represents a removal
    pub fn is_removal(&self) -> bool {
        matches!(
            (&self.current, &self.desired),
            (ResourceState::Present { .. }, ResourceState::Absent)
        )
    }
}

/// A descriptor whose probe failed while diffing
#[derive(Debug, Clone, Serialize)]
pub struct ProbeFailure {
    pub kind: String,
    pub key: String,
    pub error: String,
}

/// Pending changes plus probes that could not be evaluated
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiffSet {
    pub changes: Vec<ResourceDiff>,
    pub failures: Vec<ProbeFailure>,
}

/// Compute diffs for every applicable descriptor, in plan order
pub fn compute_diffs(plan: &ExecutionPlan, platform: &Platform) -> DiffSet {
    let mut set = DiffSet::default();
    for descriptor in plan.iter() {
        match ResourceDiff::from_descriptor(descriptor, platform) {
            Ok(Some(diff)) => set.changes.push(diff),
            Ok(None) => {}
            Err(e) => set.failures.push(ProbeFailure {
                kind: descriptor.kind().to_string(),
                key: descriptor.key(),
                error: e.to_string(),
            }),
        }
    }
    set
}

/// Diff summary statistics
#[derive(Debug, Clone, Default)]
pub struct DiffSummary {
    /// Number of resources to add
    pub additions: usize,
    /// Number of resources to remove
    pub removals: usize,
    /// Number of resources to modify
    pub modifications: usize,
    /// Number of resources requiring sudo
    pub sudo_required: usize,
}

impl DiffSummary {
    /// Create a summary from a list of diffs
    pub fn from_diffs(diffs: &[ResourceDiff]) -> Self {
        let mut summary = Self::default();
        for diff in diffs {
            if diff.is_addition() {
                summary.additions += 1;
            } else if diff.is_removal() {
                summary.removals += 1;
            } else {
                summary.modifications += 1;
            }
            if diff.requires_sudo {
                summary.sudo_required += 1;
            }
        }
        summary
    }

    /// Total number of changes
    pub fn total(&self) -> usize {
        self.additions + self.removals + self.modifications
    }
}

/// Group diffs by resource kind, kinds sorted by name
pub fn group_by_kind(diffs: &[ResourceDiff]) -> BTreeMap<&str, Vec<&ResourceDiff>> {
    let mut groups: BTreeMap<&str, Vec<&ResourceDiff>> = BTreeMap::new();
    for diff in diffs {
        groups.entry(diff.kind.as_str()).or_default().push(diff);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ApplyContext;
    use crate::error::ApplyError;
    use crate::platform::{Applicability, OsFamily, PackageManager};
    use crate::resource::Resource;
    use std::io;

    #[derive(Debug)]
    struct Fixed {
        key: &'static str,
        current: Option<ResourceState>,
    }

    impl Resource for Fixed {
        fn key(&self) -> String {
            self.key.to_string()
        }

        fn kind(&self) -> &'static str {
            "fixed"
        }

        fn description(&self) -> String {
            format!("fixed {}", self.key)
        }

        fn desired_state(&self) -> ResourceState {
            ResourceState::present()
        }

        fn probe(&self, _platform: &Platform) -> Result<ResourceState, ProbeError> {
            self.current
                .clone()
                .ok_or_else(|| ProbeError::io("/denied", io::ErrorKind::PermissionDenied.into()))
        }

        fn apply(&self, _ctx: &mut ApplyContext) -> Result<(), ApplyError> {
            panic!("diff must never apply");
        }
    }

    #[test]
    fn test_compute_diffs() {
        let platform = Platform::new(OsFamily::Linux, "ubuntu", PackageManager::Apt);
        let plan = ExecutionPlan::from_descriptors([
            Descriptor::from(Fixed {
                key: "ok",
                current: Some(ResourceState::present()),
            }),
            Descriptor::from(Fixed {
                key: "missing",
                current: Some(ResourceState::Absent),
            }),
            Descriptor::from(Fixed {
                key: "mac-only",
                current: Some(ResourceState::Absent),
            })
            .when(Applicability::family(OsFamily::Macos)),
            Descriptor::from(Fixed {
                key: "broken",
                current: None,
            }),
        ])
        .unwrap();

        let set = compute_diffs(&plan, &platform);
        assert_eq!(set.changes.len(), 1);
        assert_eq!(set.changes[0].key, "missing");
        assert!(set.changes[0].is_addition());
        assert_eq!(set.failures.len(), 1);
        assert_eq!(set.failures[0].key, "broken");

        let summary = DiffSummary::from_diffs(&set.changes);
        assert_eq!(summary.additions, 1);
        assert_eq!(summary.total(), 1);
        assert_eq!(group_by_kind(&set.changes)["fixed"].len(), 1);
    }
}
