//! Self-update of the profile checkout
//!
//! When the profile lives in a clean git checkout with new upstream
//! commits, fast-forward it and restart with the same arguments so the
//! run uses the updated profile. Every failure here is a warning.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Command;

use crate::runner;
use crate::ui;

/// Set on the re-executed process so it does not update again
pub const ENV_UPDATED: &str = "RIGUP_SELF_UPDATED";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    GitUnavailable,
    NotACheckout,
    /// Local modifications; left alone
    Dirty,
    NoUpstream,
    UpToDate,
    Updated { commits: u32 },
}

fn git(dir: &Path, args: &[&str]) -> Result<String> {
    let dir = dir.to_string_lossy();
    let mut full = vec!["-C", &*dir];
    full.extend_from_slice(args);
    runner::run_capture("git", &full)
}

/// Fast-forward the checkout containing `dir`, if it is safe to do so
pub fn update(dir: &Path) -> Result<UpdateOutcome> {
    if !runner::command_exists("git") {
        return Ok(UpdateOutcome::GitUnavailable);
    }
    if git(dir, &["rev-parse", "--is-inside-work-tree"]).is_err() {
        return Ok(UpdateOutcome::NotACheckout);
    }
    if !git(dir, &["status", "--porcelain"])?.is_empty() {
        return Ok(UpdateOutcome::Dirty);
    }
    if git(dir, &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"]).is_err() {
        return Ok(UpdateOutcome::NoUpstream);
    }

    git(dir, &["fetch", "--quiet"]).context("git fetch failed")?;
    let behind = git(dir, &["rev-list", "--count", "HEAD..@{u}"])?;
    let commits: u32 = behind
        .parse()
        .with_context(|| format!("Unexpected rev-list output: {behind}"))?;
    if commits == 0 {
        return Ok(UpdateOutcome::UpToDate);
    }

    git(dir, &["merge", "--ff-only", "--quiet", "@{u}"])
        .context("Fast-forward merge failed")?;
    Ok(UpdateOutcome::Updated { commits })
}

/// Update the profile checkout and restart when it changed
///
/// Returns normally unless the process was replaced.
pub fn run(profile: &Path) {
    if std::env::var_os(ENV_UPDATED).is_some() {
        log::debug!("Already updated in this invocation");
        return;
    }
    let Some(dir) = profile.parent().filter(|d| d.is_dir()) else {
        log::debug!("No profile directory, skipping self-update");
        return;
    };

    match update(dir) {
        Ok(UpdateOutcome::Updated { commits }) => {
            ui::info(&format!(
                "Pulled {commits} new commit(s) into {}, restarting",
                dir.display()
            ));
            let err = reexec(std::env::args_os().skip(1).collect());
            ui::warn(&format!("Could not restart after update: {err:#}"));
        }
        Ok(UpdateOutcome::Dirty) => {
            ui::warn(&format!(
                "{} has local modifications; skipping self-update",
                dir.display()
            ));
        }
        Ok(outcome) => log::debug!("Self-update: {outcome:?}"),
        Err(e) => ui::warn(&format!("Self-update failed: {e:#}")),
    }
}

/// Replace this process with a fresh run; only returns on failure
fn reexec(args: Vec<OsString>) -> anyhow::Error {
    let exe = match std::env::current_exe() {
        Ok(exe) => exe,
        Err(e) => return anyhow::Error::new(e).context("Could not locate the rigup binary"),
    };
    let err = Command::new(&exe).args(args).env(ENV_UPDATED, "1").exec();
    anyhow::Error::new(err).context(format!("Failed to execute {}", exe.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sh_git(dir: &Path, args: &[&str]) {
        let status = Command::new("git")
            .arg("-C")
            .arg(dir)
            .args(["-c", "user.name=rigup", "-c", "user.email=rigup@example.com"])
            .args(args)
            .output()
            .unwrap();
        assert!(status.status.success(), "git {args:?} failed: {status:?}");
    }

    /// upstream repo with one commit and a clone tracking it
    fn setup() -> Option<(TempDir, PathBuf, PathBuf)> {
        if !runner::command_exists("git") {
            return None;
        }
        let tmp = TempDir::new().unwrap();
        let upstream = tmp.path().join("upstream");
        let checkout = tmp.path().join("checkout");
        fs::create_dir(&upstream).unwrap();
        sh_git(&upstream, &["init", "--quiet"]);
        fs::write(upstream.join("default.toml"), "").unwrap();
        sh_git(&upstream, &["add", "."]);
        sh_git(&upstream, &["commit", "--quiet", "-m", "init"]);
        sh_git(
            tmp.path(),
            &["clone", "--quiet", &upstream.to_string_lossy(), "checkout"],
        );
        Some((tmp, upstream, checkout))
    }

    #[test]
    fn test_plain_directory_is_not_a_checkout() {
        let tmp = TempDir::new().unwrap();
        let outcome = update(tmp.path()).unwrap();
        assert!(matches!(
            outcome,
            UpdateOutcome::NotACheckout | UpdateOutcome::GitUnavailable
        ));
    }

    #[test]
    fn test_fast_forwards_new_commits() {
        let Some((_tmp, upstream, checkout)) = setup() else {
            return;
        };
        assert_eq!(update(&checkout).unwrap(), UpdateOutcome::UpToDate);

        fs::write(upstream.join("extra.toml"), "").unwrap();
        sh_git(&upstream, &["add", "."]);
        sh_git(&upstream, &["commit", "--quiet", "-m", "more"]);

        assert_eq!(
            update(&checkout).unwrap(),
            UpdateOutcome::Updated { commits: 1 }
        );
        assert!(checkout.join("extra.toml").exists());
    }

    #[test]
    fn test_local_modifications_block_update() {
        let Some((_tmp, _upstream, checkout)) = setup() else {
            return;
        };
        fs::write(checkout.join("default.toml"), "# local\n").unwrap();
        assert_eq!(update(&checkout).unwrap(), UpdateOutcome::Dirty);
    }
}
