//! Scoped sudo context
//!
//! Sudo is never requested for the entire process. Instead:
//! 1. Resources declare whether their action needs sudo
//! 2. Pending changes are computed first (no sudo needed)
//! 3. Sudo is acquired once if any pending change needs it
//! 4. Credentials are dropped when the context goes away

use anyhow::{Context, Result, bail};
use declarative::{ApplyError, CommandOutput, SudoProvider};
use std::io::Write;
use std::process::{Command, Output, Stdio};

use crate::ui;

/// Scoped sudo context - automatically invalidates on drop
pub struct SudoContext {
    validated: bool,
}

impl SudoContext {
    /// Acquire sudo privileges with a reason shown to user
    pub fn acquire(reason: &str) -> Result<Self> {
        eprintln!();
        ui::warn(&format!("Sudo required: {reason}"));
        eprintln!();

        // Validate sudo (will prompt for password)
        let status = Command::new("sudo")
            .args(["-v"])
            .status()
            .context("Failed to execute sudo")?;

        if !status.success() {
            bail!("Failed to acquire sudo privileges");
        }

        Ok(Self { validated: true })
    }

    fn command(&self, cmd: &str, args: &[&str]) -> Result<Command, ApplyError> {
        if !self.validated {
            return Err(ApplyError::SudoUnavailable);
        }
        log::debug!("sudo: {} {}", cmd, args.join(" "));
        let mut command = Command::new("sudo");
        // -n: never prompt mid-run, fail instead
        command.arg("-n").arg(cmd).args(args);
        Ok(command)
    }

    fn spawn_error(cmd: &str, source: std::io::Error) -> ApplyError {
        ApplyError::Spawn {
            program: format!("sudo {cmd}"),
            source,
        }
    }
}

impl SudoProvider for SudoContext {
    fn run(&self, cmd: &str, args: &[&str]) -> Result<CommandOutput, ApplyError> {
        let output: Output = self
            .command(cmd, args)?
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Self::spawn_error(cmd, e))?;
        Ok(output.into())
    }

    fn run_with_input(
        &self,
        cmd: &str,
        args: &[&str],
        input: &[u8],
    ) -> Result<CommandOutput, ApplyError> {
        let mut child = self
            .command(cmd, args)?
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Self::spawn_error(cmd, e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input)
                .map_err(|e| Self::spawn_error(cmd, e))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Self::spawn_error(cmd, e))?;
        Ok(output.into())
    }
}

impl Drop for SudoContext {
    fn drop(&mut self) {
        if self.validated {
            // Invalidate sudo timestamp to release privileges
            let _ = Command::new("sudo").args(["-k"]).status();
        }
    }
}
