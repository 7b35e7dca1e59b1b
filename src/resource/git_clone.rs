//! Git clone resource

use declarative::{ApplyContext, ApplyError, Platform, ProbeError, Resource, ResourceState};
use std::fs;
use std::path::{Path, PathBuf};

use super::{ensure_parent, path_arg, stat};
use crate::runner;

#[derive(Debug, Clone)]
pub struct GitClone {
    pub url: String,
    pub dest: PathBuf,
    pub branch: Option<String>,
    /// Shallow clone depth, `None` for full history
    pub depth: Option<u32>,
}

impl GitClone {
    pub fn new(url: &str, dest: impl AsRef<Path>) -> Self {
        Self {
            url: url.to_string(),
            dest: dest.as_ref().to_path_buf(),
            branch: None,
            depth: Some(1),
        }
    }

    pub fn branch(mut self, branch: &str) -> Self {
        self.branch = Some(branch.to_string());
        self
    }

    pub fn depth(mut self, depth: Option<u32>) -> Self {
        self.depth = depth;
        self
    }

    pub fn clone_args(&self) -> Vec<String> {
        let mut args = vec!["clone".to_string()];
        if let Some(branch) = &self.branch {
            args.push("--branch".to_string());
            args.push(branch.clone());
        }
        if let Some(depth) = self.depth {
            args.push("--depth".to_string());
            args.push(depth.to_string());
        }
        args.push(self.url.clone());
        args.push(path_arg(&self.dest));
        args
    }

    fn is_empty_dir(&self) -> Result<bool, ProbeError> {
        let mut entries = fs::read_dir(&self.dest).map_err(|e| ProbeError::io(&self.dest, e))?;
        Ok(entries.next().is_none())
    }

    fn origin(&self) -> Result<Option<String>, ProbeError> {
        let dest = path_arg(&self.dest);
        let output = runner::probe("git", &["-C", &dest, "remote", "get-url", "origin"])?;
        Ok(output
            .success
            .then(|| output.stdout_str().trim().to_string()))
    }
}

impl Resource for GitClone {
    fn key(&self) -> String {
        self.dest.display().to_string()
    }

    fn kind(&self) -> &'static str {
        "git-clone"
    }

    fn description(&self) -> String {
        format!("Clone {} into {}", self.url, self.dest.display())
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present_with(self.url.clone())
    }

    fn probe(&self, _platform: &Platform) -> Result<ResourceState, ProbeError> {
        let Some(meta) = stat(&self.dest)? else {
            return Ok(ResourceState::Absent);
        };
        if !meta.is_dir() {
            return Ok(ResourceState::Modified {
                from: "not a directory".to_string(),
                to: self.url.clone(),
            });
        }
        if !self.dest.join(".git").exists() {
            if self.is_empty_dir()? {
                return Ok(ResourceState::Absent);
            }
            return Ok(ResourceState::Modified {
                from: "directory without a repository".to_string(),
                to: self.url.clone(),
            });
        }

        match self.origin()? {
            Some(origin) if origin == self.url => Ok(self.desired_state()),
            Some(origin) => Ok(ResourceState::Modified {
                from: origin,
                to: self.url.clone(),
            }),
            None => Ok(ResourceState::Modified {
                from: "repository without origin".to_string(),
                to: self.url.clone(),
            }),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<(), ApplyError> {
        if self.dest.exists() && !self.dest.join(".git").exists() {
            let empty = fs::read_dir(&self.dest)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if !empty {
                return Err(ApplyError::Precondition(format!(
                    "{} exists and is not an empty directory",
                    self.dest.display()
                )));
            }
        } else if self.dest.exists() {
            return Err(ApplyError::Precondition(format!(
                "{} already holds a different repository",
                self.dest.display()
            )));
        }

        ensure_parent(ctx, &self.dest, false)?;
        let args = self.clone_args();
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        runner::apply("git", &args)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{OsFamily, PackageManager};

    fn platform() -> Platform {
        Platform::new(OsFamily::Linux, "ubuntu", PackageManager::Apt)
    }

    #[test]
    fn test_clone_args() {
        let clone = GitClone::new("https://github.com/tmux-plugins/tpm", "/home/u/.tmux/tpm")
            .branch("master");
        assert_eq!(
            clone.clone_args(),
            [
                "clone",
                "--branch",
                "master",
                "--depth",
                "1",
                "https://github.com/tmux-plugins/tpm",
                "/home/u/.tmux/tpm"
            ]
        );

        let full = GitClone::new("u", "/d").depth(None);
        assert_eq!(full.clone_args(), ["clone", "u", "/d"]);
    }

    #[test]
    fn test_probe_missing_and_empty_dir_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        let platform = platform();

        let missing = GitClone::new("u", dir.path().join("repo"));
        assert_eq!(missing.probe(&platform).unwrap(), ResourceState::Absent);

        let empty = GitClone::new("u", dir.path());
        assert_eq!(empty.probe(&platform).unwrap(), ResourceState::Absent);
    }

    #[test]
    fn test_non_repo_directory_is_mismatch_and_not_clobbered() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), "keep").unwrap();
        let platform = platform();
        let clone = GitClone::new("https://example.com/r.git", dir.path());

        assert!(matches!(
            clone.probe(&platform).unwrap(),
            ResourceState::Modified { .. }
        ));
        let err = clone
            .apply(&mut ApplyContext::new(&platform))
            .unwrap_err();
        assert!(matches!(err, ApplyError::Precondition(_)));
        assert!(dir.path().join("notes.txt").exists());
    }
}
