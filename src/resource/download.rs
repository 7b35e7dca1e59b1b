//! Download resource: a file fetched over HTTP(S)

use declarative::{
    ApplyContext, ApplyError, Platform, ProbeError, Resource, ResourceState, SudoRequirement,
};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use super::{path_arg, privileged, stat};
use crate::fetch;

#[derive(Debug, Clone)]
pub struct Download {
    pub url: String,
    pub dest: PathBuf,
    pub mode: Option<u32>,
    pub sudo: bool,
}

impl Download {
    pub fn new(url: &str, dest: impl AsRef<Path>) -> Self {
        Self {
            url: url.to_string(),
            dest: dest.as_ref().to_path_buf(),
            mode: None,
            sudo: false,
        }
    }

    pub fn mode(mut self, mode: Option<u32>) -> Self {
        self.mode = mode.map(|m| m & 0o7777);
        self
    }

    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Fix only the mode of an already downloaded file
    fn chmod(&self, ctx: &ApplyContext, mode: u32) -> Result<(), ApplyError> {
        if self.sudo {
            ctx.require_sudo()?
                .run_checked("chmod", &[&format!("{mode:o}"), &path_arg(&self.dest)])?;
            return Ok(());
        }
        fs::set_permissions(&self.dest, fs::Permissions::from_mode(mode))
            .map_err(|e| ApplyError::io(&self.dest, e))
    }
}

impl Resource for Download {
    fn key(&self) -> String {
        self.dest.display().to_string()
    }

    fn kind(&self) -> &'static str {
        "download"
    }

    fn description(&self) -> String {
        format!("Download {} to {}", self.url, self.dest.display())
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        if self.sudo {
            privileged("Writing", &self.dest)
        } else {
            SudoRequirement::None
        }
    }

    fn desired_state(&self) -> ResourceState {
        match self.mode {
            Some(mode) => ResourceState::present_with(format!("{mode:04o}")),
            None => ResourceState::present(),
        }
    }

    fn probe(&self, _platform: &Platform) -> Result<ResourceState, ProbeError> {
        let Some(meta) = stat(&self.dest)? else {
            return Ok(ResourceState::Absent);
        };
        let Some(mode) = self.mode else {
            return Ok(ResourceState::present());
        };
        let current = meta.permissions().mode() & 0o7777;
        if current == mode {
            Ok(self.desired_state())
        } else {
            Ok(ResourceState::Modified {
                from: format!("{current:04o}"),
                to: format!("{mode:04o}"),
            })
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<(), ApplyError> {
        if self.dest.exists() {
            if let Some(mode) = self.mode {
                return self.chmod(ctx, mode);
            }
            return Ok(());
        }

        let bytes = fetch::download(&self.url)?;
        log::debug!("Fetched {} bytes from {}", bytes.len(), self.url);
        fetch::place_file(ctx, &self.dest, &bytes, self.mode, self.sudo)
    }
}
