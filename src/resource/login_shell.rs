//! Login shell resource

use declarative::{
    ApplyContext, ApplyError, OsFamily, Platform, ProbeError, Resource, ResourceState,
    SudoRequirement,
};
use std::path::Path;

use crate::runner;

#[derive(Debug, Clone)]
pub struct LoginShell {
    pub user: String,
    pub shell: String,
}

impl LoginShell {
    pub fn new(user: &str, shell: &str) -> Self {
        Self {
            user: user.to_string(),
            shell: shell.to_string(),
        }
    }

    fn current_shell(&self, platform: &Platform) -> Result<Option<String>, ProbeError> {
        match platform.family {
            OsFamily::Linux => {
                let output = runner::probe("getent", &["passwd", &self.user])?;
                if !output.success {
                    return Ok(None);
                }
                Ok(parse_passwd_shell(&output.stdout_str()))
            }
            OsFamily::Macos => {
                let record = format!("/Users/{}", self.user);
                let output = runner::probe("dscl", &[".", "-read", &record, "UserShell"])?;
                if !output.success {
                    return Ok(None);
                }
                Ok(parse_dscl_shell(&output.stdout_str()))
            }
        }
    }
}

/// Seventh field of a passwd entry
fn parse_passwd_shell(entry: &str) -> Option<String> {
    entry
        .lines()
        .next()?
        .split(':')
        .nth(6)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Value of `UserShell: /bin/zsh`
fn parse_dscl_shell(output: &str) -> Option<String> {
    output
        .lines()
        .find_map(|l| l.strip_prefix("UserShell:"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Resource for LoginShell {
    fn key(&self) -> String {
        self.user.clone()
    }

    fn kind(&self) -> &'static str {
        "login-shell"
    }

    fn description(&self) -> String {
        format!("Login shell {} for {}", self.shell, self.user)
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        SudoRequirement::Required {
            reason: format!("Changing the login shell of {}", self.user),
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present_with(self.shell.clone())
    }

    fn probe(&self, platform: &Platform) -> Result<ResourceState, ProbeError> {
        match self.current_shell(platform)? {
            Some(shell) if shell == self.shell => Ok(self.desired_state()),
            Some(shell) => Ok(ResourceState::Modified {
                from: shell,
                to: self.shell.clone(),
            }),
            None => Err(ProbeError::Command {
                program: "getent".to_string(),
                message: format!("no account entry for user {}", self.user),
            }),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<(), ApplyError> {
        if !Path::new(&self.shell).is_file() {
            return Err(ApplyError::Precondition(format!(
                "shell {} is not installed",
                self.shell
            )));
        }
        ctx.require_sudo()?
            .run_checked("chsh", &["-s", &self.shell, &self.user])?;
        Ok(())
    }
}
