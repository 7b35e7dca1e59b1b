//! `rigup diff` - probe-only preview

use anyhow::Result;
use declarative::compute_diffs;

use crate::Context;
use crate::cli::ProfileArgs;
use crate::engine::differ;
use crate::ui;

pub fn run(ctx: &Context, args: &ProfileArgs) -> Result<()> {
    let platform = super::detect_platform()?;
    let plan = super::load_plan(args, &platform)?;

    if !ctx.quiet {
        ui::header(&format!("rigup diff ({platform})"));
    }
    let diffs = compute_diffs(&plan, &platform);
    differ::display_diff(&diffs);
    Ok(())
}
