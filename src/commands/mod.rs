pub mod diff;
pub mod install;
pub mod platform;

use anyhow::{Context, Result};
use declarative::{ExecutionPlan, Platform};

use crate::cli::ProfileArgs;
use crate::config;

/// Detect the host platform; failure is fatal
pub fn detect_platform() -> Result<Platform> {
    declarative::platform::detect().context("Cannot bootstrap this host")
}

/// Load the selected profile and build its (filtered) plan
pub fn load_plan(args: &ProfileArgs, platform: &Platform) -> Result<ExecutionPlan> {
    let path = config::profile_path(&args.profile, args.config.as_deref())?;
    let profile = config::load(&path)?;
    let plan = config::build_plan(&profile, platform)?;
    Ok(plan.filter_by_target(args.target.as_deref()))
}
