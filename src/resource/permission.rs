//! Permission resource: mode bits of an existing path

use declarative::{
    ApplyContext, ApplyError, Platform, ProbeError, Resource, ResourceState, SudoRequirement,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use super::{path_arg, privileged, stat};

#[derive(Debug, Clone)]
pub struct Permission {
    pub path: PathBuf,
    pub mode: u32,
    pub sudo: bool,
}

impl Permission {
    pub fn new(path: impl AsRef<Path>, mode: u32) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            mode: mode & 0o7777,
            sudo: false,
        }
    }

    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    fn octal(&self) -> String {
        format!("{:04o}", self.mode)
    }
}

impl Resource for Permission {
    fn key(&self) -> String {
        self.path.display().to_string()
    }

    fn kind(&self) -> &'static str {
        "permission"
    }

    fn description(&self) -> String {
        format!("Mode {} on {}", self.octal(), self.path.display())
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        if self.sudo {
            privileged("Changing the mode of", &self.path)
        } else {
            SudoRequirement::None
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present_with(self.octal())
    }

    fn probe(&self, _platform: &Platform) -> Result<ResourceState, ProbeError> {
        let Some(meta) = stat(&self.path)? else {
            return Ok(ResourceState::Absent);
        };
        let current = meta.permissions().mode() & 0o7777;
        if current == self.mode {
            Ok(self.desired_state())
        } else {
            Ok(ResourceState::Modified {
                from: format!("{current:04o}"),
                to: self.octal(),
            })
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<(), ApplyError> {
        if !self.path.exists() {
            return Err(ApplyError::Precondition(format!(
                "{} does not exist",
                self.path.display()
            )));
        }

        if self.sudo {
            ctx.require_sudo()?
                .run_checked("chmod", &[&self.octal(), &path_arg(&self.path)])?;
            return Ok(());
        }

        fs::set_permissions(&self.path, fs::Permissions::from_mode(self.mode))
            .map_err(|e| ApplyError::io(&self.path, e))
    }
}
