//! Profile loading and plan construction

use anyhow::{Context, Result, bail};
use declarative::{ExecutionPlan, Platform};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;
use crate::resource;
use crate::schema::{Profile, ResourceSpec};

/// Profile used when none is named
pub const DEFAULT_PROFILE: &str = "default";

/// A profile with its `extends` chain flattened
#[derive(Debug)]
pub struct LoadedProfile {
    /// The file that was asked for
    pub path: PathBuf,
    /// Resources of every base profile first, then this one's
    pub resources: Vec<ResourceSpec>,
}

/// Resolve the profile file: an explicit path wins over a profile name
pub fn profile_path(name: &str, explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(paths::expand(&path.to_string_lossy()));
    }
    Ok(paths::config_dir()?.join(format!("{name}.toml")))
}

/// Load a profile and everything it extends
pub fn load(path: &Path) -> Result<LoadedProfile> {
    let mut loader = Loader::default();
    loader.load(path)?;
    Ok(LoadedProfile {
        path: path.to_path_buf(),
        resources: loader.resources,
    })
}

/// Build the execution plan for a loaded profile
///
/// Fails on the first invalid entry or duplicate key, before anything
/// is probed.
pub fn build_plan(profile: &LoadedProfile, platform: &Platform) -> Result<ExecutionPlan> {
    let mut plan = ExecutionPlan::new();
    for (index, spec) in profile.resources.iter().enumerate() {
        let descriptor = resource::build(spec, platform)
            .with_context(|| format!("Invalid resource #{} in profile", index + 1))?;
        plan.push(descriptor)
            .with_context(|| format!("Invalid profile: {}", profile.path.display()))?;
    }
    log::debug!("Plan has {} resources", plan.len());
    Ok(plan)
}

#[derive(Default)]
struct Loader {
    /// Files currently being loaded, for cycle detection
    stack: Vec<PathBuf>,
    /// Files already merged (diamond extends load once)
    done: HashSet<PathBuf>,
    resources: Vec<ResourceSpec>,
}

impl Loader {
    fn load(&mut self, path: &Path) -> Result<()> {
        let key = fs::canonicalize(path)
            .with_context(|| format!("Profile not found: {}", path.display()))?;

        if self.stack.contains(&key) {
            let chain: Vec<String> = self
                .stack
                .iter()
                .chain(std::iter::once(&key))
                .map(|p| profile_name(p))
                .collect();
            bail!("Profile extends cycle: {}", chain.join(" -> "));
        }
        if self.done.contains(&key) {
            log::debug!("Profile {} already loaded", key.display());
            return Ok(());
        }

        let content = fs::read_to_string(&key)
            .with_context(|| format!("Could not read profile: {}", key.display()))?;
        let profile: Profile = toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in profile: {}", key.display()))?;
        log::debug!(
            "Loaded profile {} ({} resources, extends {:?})",
            key.display(),
            profile.resources.len(),
            profile.extends
        );

        let dir = key
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        self.stack.push(key.clone());
        for base in &profile.extends {
            self.load(&base_path(&dir, base))?;
        }
        self.stack.pop();

        self.done.insert(key);
        self.resources
            .extend(profile.resources.into_iter().map(|mut spec| {
                spec.base_dir.clone_from(&dir);
                spec
            }));
        Ok(())
    }
}

/// `extends` entries are profile names next to the extending file, or paths
fn base_path(dir: &Path, base: &str) -> PathBuf {
    if base.ends_with(".toml") || base.contains('/') {
        let expanded = paths::expand(base);
        if expanded.is_absolute() {
            expanded
        } else {
            dir.join(expanded)
        }
    } else {
        dir.join(format!("{base}.toml"))
    }
}

fn profile_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| path.display().to_string(), |s| s.to_string_lossy().to_string())
}
