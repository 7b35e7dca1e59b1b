//! Symlink resource

use declarative::{
    ApplyContext, ApplyError, Platform, ProbeError, Resource, ResourceState, SudoRequirement,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::{ensure_parent, path_arg, privileged};

/// Suffix for a file moved aside by `force`
const BACKUP_SUFFIX: &str = ".rigup-backup";

/// A symlink to create
#[derive(Debug, Clone)]
pub struct Symlink {
    /// Source path (what the symlink points to); a relative source is
    /// relative to the link's directory, as the kernel resolves it
    pub source: PathBuf,
    /// Target path (where the symlink is created)
    pub target: PathBuf,
    /// Replace an existing regular file or directory (after a backup)
    pub force: bool,
    pub sudo: bool,
}

#[derive(Debug, PartialEq, Eq)]
enum LinkState {
    Missing,
    Correct,
    WrongTarget(PathBuf),
    NotALink,
}

impl Symlink {
    pub fn new(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            target: target.as_ref().to_path_buf(),
            force: false,
            sudo: false,
        }
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    fn check_current(&self) -> Result<LinkState, ProbeError> {
        let meta = match fs::symlink_metadata(&self.target) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LinkState::Missing),
            Err(e) => return Err(ProbeError::io(&self.target, e)),
        };

        if !meta.file_type().is_symlink() {
            return Ok(LinkState::NotALink);
        }

        let link_target =
            fs::read_link(&self.target).map_err(|e| ProbeError::io(&self.target, e))?;

        // Canonicalize for comparison; dangling links compare textually
        let expected = self.resolve(&self.source);
        let actual = self.resolve(&link_target);

        if expected == actual {
            Ok(LinkState::Correct)
        } else {
            Ok(LinkState::WrongTarget(actual))
        }
    }

    /// A link's text as the kernel follows it: relative to the link's directory
    fn resolve(&self, link_text: &Path) -> PathBuf {
        let absolute = match self.target.parent() {
            Some(dir) if link_text.is_relative() => dir.join(link_text),
            _ => link_text.to_path_buf(),
        };
        absolute.canonicalize().unwrap_or(absolute)
    }

    /// First free backup name: `<target>.rigup-backup`, then `.1`, `.2`, ...
    fn backup_path(&self) -> PathBuf {
        let mut base = self.target.clone().into_os_string();
        base.push(BACKUP_SUFFIX);
        let mut candidate = PathBuf::from(&base);
        let mut n = 1;
        while fs::symlink_metadata(&candidate).is_ok() {
            let mut numbered = base.clone();
            numbered.push(format!(".{n}"));
            candidate = PathBuf::from(numbered);
            n += 1;
        }
        candidate
    }

    fn create_symlink(&self, ctx: &ApplyContext, state: &LinkState) -> Result<(), ApplyError> {
        ensure_parent(ctx, &self.target, self.sudo)?;

        if self.sudo {
            let sudo = ctx.require_sudo()?;
            if *state == LinkState::NotALink {
                sudo.run_checked(
                    "mv",
                    &[&path_arg(&self.target), &path_arg(&self.backup_path())],
                )?;
            }
            sudo.run_checked(
                "ln",
                &["-sfn", &path_arg(&self.source), &path_arg(&self.target)],
            )?;
            return Ok(());
        }

        match state {
            LinkState::NotALink => {
                let backup = self.backup_path();
                fs::rename(&self.target, &backup).map_err(|e| ApplyError::io(&backup, e))?;
                log::info!(
                    "Moved {} to {}",
                    self.target.display(),
                    backup.display()
                );
            }
            LinkState::WrongTarget(_) => {
                fs::remove_file(&self.target).map_err(|e| ApplyError::io(&self.target, e))?;
            }
            LinkState::Missing | LinkState::Correct => {}
        }

        std::os::unix::fs::symlink(&self.source, &self.target)
            .map_err(|e| ApplyError::io(&self.target, e))
    }
}

impl Resource for Symlink {
    fn key(&self) -> String {
        self.target.display().to_string()
    }

    fn kind(&self) -> &'static str {
        "symlink"
    }

    fn description(&self) -> String {
        format!(
            "Symlink {} -> {}",
            self.target.display(),
            self.source.display()
        )
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        if self.sudo {
            privileged("Linking", &self.target)
        } else {
            SudoRequirement::None
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present_with(format!("-> {}", self.source.display()))
    }

    fn probe(&self, _platform: &Platform) -> Result<ResourceState, ProbeError> {
        Ok(match self.check_current()? {
            LinkState::Missing => ResourceState::Absent,
            LinkState::Correct => self.desired_state(),
            LinkState::WrongTarget(actual) => ResourceState::Modified {
                from: format!("-> {}", actual.display()),
                to: format!("-> {}", self.source.display()),
            },
            LinkState::NotALink => ResourceState::Modified {
                from: "regular file".to_string(),
                to: format!("symlink -> {}", self.source.display()),
            },
        })
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<(), ApplyError> {
        if !self.resolve(&self.source).exists() {
            return Err(ApplyError::Precondition(format!(
                "source does not exist: {}",
                self.source.display()
            )));
        }

        let state = self.check_current().map_err(|e| {
            ApplyError::Precondition(format!("cannot inspect {}: {e}", self.target.display()))
        })?;

        if state == LinkState::NotALink && !self.force {
            return Err(ApplyError::Precondition(format!(
                "{} exists and is not a symlink (set force = true to replace it)",
                self.target.display()
            )));
        }

        self.create_symlink(ctx, &state)
    }
}
