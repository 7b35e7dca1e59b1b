//! Archive resource: a `.tar.gz` extracted into a directory

use declarative::{
    ApplyContext, ApplyError, Platform, ProbeError, Resource, ResourceState, SudoRequirement,
};
use flate2::read::GzDecoder;
use std::fs;
use std::path::{Path, PathBuf};

use super::{path_arg, privileged, stat};
use crate::fetch;

#[derive(Debug, Clone)]
pub struct Archive {
    pub url: String,
    pub dest: PathBuf,
    /// Relative path that exists once the archive is extracted
    pub creates: PathBuf,
    pub sudo: bool,
}

impl Archive {
    pub fn new(url: &str, dest: impl AsRef<Path>, creates: impl AsRef<Path>) -> Self {
        Self {
            url: url.to_string(),
            dest: dest.as_ref().to_path_buf(),
            creates: creates.as_ref().to_path_buf(),
            sudo: false,
        }
    }

    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    fn marker(&self) -> PathBuf {
        self.dest.join(&self.creates)
    }

    /// Unpack archive bytes into `dest`
    ///
    /// Privileged extraction unpacks into a private staging directory and
    /// copies the tree over with `sudo cp -a`.
    fn extract(&self, ctx: &ApplyContext, bytes: &[u8]) -> Result<(), ApplyError> {
        if !self.sudo {
            fs::create_dir_all(&self.dest).map_err(|e| ApplyError::io(&self.dest, e))?;
            return unpack(bytes, &self.dest);
        }

        let sudo = ctx.require_sudo()?;
        let tmp = std::env::temp_dir();
        let staging = tempfile::Builder::new()
            .prefix(".rigup-")
            .tempdir_in(&tmp)
            .map_err(|e| ApplyError::io(&tmp, e))?;
        unpack(bytes, staging.path())?;

        let dest = path_arg(&self.dest);
        sudo.run_checked("mkdir", &["-p", &dest])?;
        let from = format!("{}/.", staging.path().display());
        sudo.run_checked("cp", &["-a", &from, &dest])?;
        Ok(())
    }
}

fn unpack(bytes: &[u8], into: &Path) -> Result<(), ApplyError> {
    let mut archive = tar::Archive::new(GzDecoder::new(bytes));
    archive.set_preserve_permissions(true);
    archive.unpack(into).map_err(|e| ApplyError::io(into, e))
}

impl Resource for Archive {
    fn key(&self) -> String {
        self.marker().display().to_string()
    }

    fn kind(&self) -> &'static str {
        "archive"
    }

    fn description(&self) -> String {
        format!("Extract {} into {}", self.url, self.dest.display())
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        if self.sudo {
            privileged("Extracting into", &self.dest)
        } else {
            SudoRequirement::None
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn probe(&self, _platform: &Platform) -> Result<ResourceState, ProbeError> {
        Ok(match stat(&self.marker())? {
            Some(_) => ResourceState::present(),
            None => ResourceState::Absent,
        })
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<(), ApplyError> {
        let bytes = fetch::download(&self.url)?;
        self.extract(ctx, &bytes)
    }
}
