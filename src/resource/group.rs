//! Supplementary group membership resource

use declarative::{
    ApplyContext, ApplyError, OsFamily, Platform, ProbeError, Resource, ResourceState,
    SudoRequirement,
};

use crate::runner;

#[derive(Debug, Clone)]
pub struct GroupMembership {
    pub user: String,
    pub group: String,
}

impl GroupMembership {
    pub fn new(user: &str, group: &str) -> Self {
        Self {
            user: user.to_string(),
            group: group.to_string(),
        }
    }

    /// Command adding the user to the group on this OS family
    pub fn add_command(&self, family: OsFamily) -> (&'static str, Vec<&str>) {
        match family {
            OsFamily::Linux => (
                "usermod",
                vec!["-aG", self.group.as_str(), self.user.as_str()],
            ),
            OsFamily::Macos => (
                "dseditgroup",
                vec![
                    "-o",
                    "edit",
                    "-a",
                    self.user.as_str(),
                    "-t",
                    "user",
                    self.group.as_str(),
                ],
            ),
        }
    }
}

fn has_group(groups: &str, group: &str) -> bool {
    groups.split_whitespace().any(|g| g == group)
}

impl Resource for GroupMembership {
    fn key(&self) -> String {
        format!("{}:{}", self.user, self.group)
    }

    fn kind(&self) -> &'static str {
        "group-membership"
    }

    fn description(&self) -> String {
        format!("Add {} to group {}", self.user, self.group)
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        SudoRequirement::Required {
            reason: format!("Adding {} to group {}", self.user, self.group),
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn probe(&self, _platform: &Platform) -> Result<ResourceState, ProbeError> {
        let output = runner::probe("id", &["-nG", &self.user])?;
        if !output.success {
            return Err(ProbeError::Command {
                program: "id".to_string(),
                message: output.stderr_str().trim().to_string(),
            });
        }
        if has_group(&output.stdout_str(), &self.group) {
            Ok(ResourceState::present())
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<(), ApplyError> {
        let (program, args) = self.add_command(ctx.platform.family);
        ctx.require_sudo()?.run_checked(program, &args)?;
        Ok(())
    }
}
