//! Execution planner - an ordered, validated list of descriptors

use crate::error::{Error, Result};
use crate::resource::{Descriptor, Resource};
use std::collections::HashSet;

/// Ordered descriptors for one run
///
/// Declaration order is preserved and is the only ordering guarantee.
/// Keys are unique per kind.
#[derive(Debug, Default)]
pub struct ExecutionPlan {
    descriptors: Vec<Descriptor>,
    seen: HashSet<(&'static str, String)>,
}

impl ExecutionPlan {
    /// Create a new empty plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a plan, rejecting duplicate `(kind, key)` pairs
    pub fn from_descriptors(descriptors: impl IntoIterator<Item = Descriptor>) -> Result<Self> {
        let mut plan = Self::new();
        for descriptor in descriptors {
            plan.push(descriptor)?;
        }
        Ok(plan)
    }

    /// Append a descriptor
    pub fn push(&mut self, descriptor: Descriptor) -> Result<()> {
        let identity = (descriptor.kind(), descriptor.key());
        if !self.seen.insert(identity.clone()) {
            return Err(Error::DuplicateKey {
                kind: identity.0.to_string(),
                key: identity.1,
            });
        }
        self.descriptors.push(descriptor);
        Ok(())
    }

    /// Filter plan to only include descriptors matching a predicate
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&dyn Resource) -> bool,
    {
        let descriptors: Vec<Descriptor> = self
            .descriptors
            .into_iter()
            .filter(|d| predicate(d.resource()))
            .collect();
        let seen = descriptors.iter().map(|d| (d.kind(), d.key())).collect();
        Self { descriptors, seen }
    }

    /// Filter plan to only include resources matching a target pattern
    ///
    /// Target format: "kind" or "kind.key"
    pub fn filter_by_target(self, target: Option<&str>) -> Self {
        match target {
            None => self,
            Some(t) => {
                let (kind, name) = parse_target(t);
                self.filter(|r| matches_filter(r, &kind, name.as_deref()))
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Descriptor> {
        self.descriptors.iter()
    }

    /// Total number of descriptors in the plan
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Check if plan is empty
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// Parse a target string like "kind.key" into (kind, key)
///
/// Only the first dot separates, so keys may contain dots (`~/.zshrc`).
fn parse_target(target: &str) -> (String, Option<String>) {
    match target.split_once('.') {
        Some((kind, name)) => (kind.to_string(), Some(name.to_string())),
        None => (target.to_string(), None),
    }
}

/// Check if a resource matches the filter criteria
fn matches_filter(resource: &dyn Resource, kind: &str, name: Option<&str>) -> bool {
    // Allow common aliases
    let matches_kind = match kind {
        "packages" | "pkg" => resource.kind() == "package",
        "files" | "dotfiles" => matches!(
            resource.kind(),
            "line-in-file" | "permission" | "symlink" | "download"
        ),
        "symlinks" => resource.kind() == "symlink",
        "repos" | "git" => resource.kind() == "git-clone",
        _ => resource.kind() == kind || resource.kind().starts_with(kind),
    };
    if !matches_kind {
        return false;
    }

    if let Some(n) = name
        && !resource.key().contains(n)
    {
        return false;
    }

    true
}
