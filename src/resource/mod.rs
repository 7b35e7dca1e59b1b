//! Resource kinds and their construction from profile entries
//!
//! Every kind implements [`declarative::Resource`]:
//! - `probe` reads the host, never mutates it
//! - `apply` converges, going through `sudo` only when the entry asks
//!   for it (or the kind always needs it)

mod archive;
mod download;
mod git_clone;
mod group;
mod line_in_file;
mod login_shell;
mod package;
mod permission;
mod symlink;

pub use archive::Archive;
pub use download::Download;
pub use git_clone::GitClone;
pub use group::GroupMembership;
pub use line_in_file::LineInFile;
pub use login_shell::LoginShell;
pub use package::Package;
pub use permission::Permission;
pub use symlink::Symlink;

use anyhow::{Context, Result, bail};
use declarative::{
    ApplyContext, ApplyError, BoxedResource, Descriptor, Platform, ProbeError, Resource,
    ResourceState, SudoRequirement,
};
use std::fs;
use std::io;
use std::path::Path;

use crate::runner;
use crate::schema::{KindSpec, ResourceSpec};

/// Build the descriptor for one profile entry
pub fn build(spec: &ResourceSpec, platform: &Platform) -> Result<Descriptor> {
    let resource: BoxedResource = match &spec.kind {
        KindSpec::Package(pkg) => {
            let mut package = Package::new(&pkg.name, platform.package_manager).cask(pkg.cask);
            if let Some(name) = pkg.names.get(&platform.package_manager) {
                package = package.with_install_name(name);
            }
            Box::new(package)
        }
        KindSpec::LineInFile(lif) => {
            if lif.line.contains('\n') {
                bail!("line-in-file '{}' must be a single line", lif.line);
            }
            Box::new(LineInFile::new(spec.path(&lif.path), &lif.line).sudo(lif.sudo))
        }
        KindSpec::Permission(perm) => {
            Box::new(Permission::new(spec.path(&perm.path), perm.mode.0).sudo(perm.sudo))
        }
        KindSpec::Symlink(link) => Box::new(
            Symlink::new(spec.path(&link.source), spec.path(&link.target))
                .force(link.force)
                .sudo(link.sudo),
        ),
        KindSpec::GitClone(clone) => {
            let mut repo = GitClone::new(&clone.url, spec.path(&clone.dest));
            if let Some(branch) = &clone.branch {
                repo = repo.branch(branch);
            }
            Box::new(repo.depth((clone.depth > 0).then_some(clone.depth)))
        }
        KindSpec::Download(dl) => Box::new(
            Download::new(&dl.url, spec.path(&dl.dest))
                .mode(dl.mode.map(|m| m.0))
                .sudo(dl.sudo),
        ),
        KindSpec::Archive(archive) => {
            if Path::new(&archive.creates).is_absolute() {
                bail!(
                    "archive 'creates' must be relative to dest: {}",
                    archive.creates
                );
            }
            Box::new(
                Archive::new(&archive.url, spec.path(&archive.dest), &archive.creates)
                    .sudo(archive.sudo),
            )
        }
        KindSpec::LoginShell(shell) => {
            let user = resolve_user(shell.user.as_deref())?;
            Box::new(LoginShell::new(&user, &shell.shell))
        }
        KindSpec::GroupMembership(group) => {
            let user = resolve_user(group.user.as_deref())?;
            Box::new(GroupMembership::new(&user, &group.group))
        }
    };

    let resource: BoxedResource = match &spec.key {
        Some(key) => Box::new(Keyed {
            key: key.clone(),
            inner: resource,
        }),
        None => resource,
    };

    Ok(Descriptor::new(resource).when(spec.when.clone()))
}

fn resolve_user(user: Option<&str>) -> Result<String> {
    match user {
        Some(user) => Ok(user.to_string()),
        None => runner::current_user().context("Could not determine the current user"),
    }
}

/// A resource whose key was set explicitly in the profile
#[derive(Debug)]
struct Keyed {
    key: String,
    inner: BoxedResource,
}

impl Resource for Keyed {
    fn key(&self) -> String {
        self.key.clone()
    }

    fn kind(&self) -> &'static str {
        self.inner.kind()
    }

    fn description(&self) -> String {
        self.inner.description()
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        self.inner.sudo_requirement()
    }

    fn desired_state(&self) -> ResourceState {
        self.inner.desired_state()
    }

    fn probe(&self, platform: &Platform) -> Result<ResourceState, ProbeError> {
        self.inner.probe(platform)
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<(), ApplyError> {
        self.inner.apply(ctx)
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Metadata (following links), `None` when the path does not exist
fn stat(path: &Path) -> Result<Option<fs::Metadata>, ProbeError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(Some(meta)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ProbeError::io(path, e)),
    }
}

/// Reason shown before sudo is acquired for a file kind
fn privileged(action: &str, path: &Path) -> SudoRequirement {
    SudoRequirement::Required {
        reason: format!("{action} {}", path.display()),
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Create the parent directory of `path`, through sudo when requested
fn ensure_parent(ctx: &ApplyContext, path: &Path, use_sudo: bool) -> Result<(), ApplyError> {
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    if use_sudo {
        ctx.require_sudo()?
            .run_checked("mkdir", &["-p", &path_arg(parent)])?;
    } else {
        fs::create_dir_all(parent).map_err(|e| ApplyError::io(parent, e))?;
    }
    Ok(())
}
