use anyhow::{Context, Result};
use declarative::{ApplyError, CommandOutput, ProbeError};
use std::process::{Command, Stdio};

/// Run a command and capture trimmed stdout
pub fn run_capture(cmd: &str, args: &[&str]) -> Result<String> {
    let output = Command::new(cmd)
        .args(args)
        .output()
        .with_context(|| format!("Failed to execute: {} {}", cmd, args.join(" ")))?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!("Command failed: {}", stderr.trim())
    }
}

/// Check if a command exists on `$PATH`
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Run a read-only query; a non-zero exit is a valid answer, not an error
pub fn probe(cmd: &str, args: &[&str]) -> Result<CommandOutput, ProbeError> {
    log::trace!("probe: {} {}", cmd, args.join(" "));
    Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map(CommandOutput::from)
        .map_err(|source| ProbeError::Spawn {
            program: cmd.to_string(),
            source,
        })
}

/// Run a mutating command unprivileged; a non-zero exit is an error
pub fn apply(cmd: &str, args: &[&str]) -> Result<CommandOutput, ApplyError> {
    log::debug!("run: {} {}", cmd, args.join(" "));
    let output: CommandOutput = Command::new(cmd)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|source| ApplyError::Spawn {
            program: cmd.to_string(),
            source,
        })?
        .into();

    if !output.success {
        return Err(ApplyError::Command {
            program: cmd.to_string(),
            code: output.code,
            stderr: output.stderr_str(),
        });
    }
    Ok(output)
}

/// Name of the invoking user
pub fn current_user() -> Option<String> {
    std::env::var("USER")
        .ok()
        .filter(|u| !u.is_empty())
        .or_else(|| run_capture("id", &["-un"]).ok())
}
