//! `rigup install` - full reconciliation

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use declarative::{Outcome, Platform, PlanReport, ReportBuilder, Summary};
use serde::Serialize;

use crate::Context;
use crate::checks;
use crate::cli::InstallArgs;
use crate::config;
use crate::engine::{self, ExecuteOptions};
use crate::selfupdate;
use crate::ui;

/// Machine-readable report
#[derive(Serialize)]
struct JsonReport<'a> {
    timestamp: DateTime<Utc>,
    platform: &'a Platform,
    succeeded: bool,
    summary: Summary,
    outcomes: &'a [Outcome],
}

impl<'a> JsonReport<'a> {
    fn new(platform: &'a Platform, report: &'a PlanReport, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            platform,
            succeeded: report.succeeded(),
            summary: report.summary(),
            outcomes: report.outcomes(),
        }
    }
}

/// Run the install; `Ok(true)` when every resource ended satisfied
pub fn run(ctx: &Context, args: InstallArgs) -> Result<bool> {
    if args.dry_run {
        super::diff::run(ctx, &args.profile)?;
        return Ok(true);
    }

    let platform = super::detect_platform()?;
    log::info!("Platform: {platform}");

    if !args.no_self_update {
        let path = config::profile_path(&args.profile.profile, args.profile.config.as_deref())?;
        selfupdate::run(&path);
    }

    let plan = super::load_plan(&args.profile, &platform)?;
    if plan.is_empty() {
        if args.json {
            println!("{}", render_json(&platform, &ReportBuilder::new().finish())?);
        } else {
            ui::info("Profile has no matching resources");
        }
        return Ok(true);
    }

    checks::run();

    let quiet = ctx.quiet || args.json;
    if !quiet {
        ui::header(&format!("rigup install ({platform})"));
    }
    let opts = ExecuteOptions { quiet };
    let report = engine::execute(&plan, &platform, &opts);

    if args.json {
        println!("{}", render_json(&platform, &report)?);
    } else {
        ui::print_report(&report);
    }

    Ok(report.succeeded())
}

fn render_json(platform: &Platform, report: &PlanReport) -> Result<String> {
    serde_json::to_string_pretty(&JsonReport::new(platform, report, Utc::now()))
        .context("Failed to serialize report")
}
