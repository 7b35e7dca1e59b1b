//! Line-in-file resource: a literal line present in a text file

use declarative::{
    ApplyContext, ApplyError, Platform, ProbeError, Resource, ResourceState, SudoRequirement,
};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use super::{ensure_parent, path_arg, privileged};

#[derive(Debug, Clone)]
pub struct LineInFile {
    pub path: PathBuf,
    pub line: String,
    pub sudo: bool,
}

impl LineInFile {
    pub fn new(path: impl AsRef<Path>, line: &str) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            line: line.to_string(),
            sudo: false,
        }
    }

    pub fn sudo(mut self, sudo: bool) -> Self {
        self.sudo = sudo;
        self
    }

    /// Text to append: the line, preceded by a newline when the file
    /// does not end with one
    fn appendix(&self) -> Result<String, ApplyError> {
        let needs_break = match fs::read(&self.path) {
            Ok(bytes) => bytes.last().is_some_and(|b| *b != b'\n'),
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(ApplyError::io(&self.path, e)),
        };
        let prefix = if needs_break { "\n" } else { "" };
        Ok(format!("{prefix}{}\n", self.line))
    }
}

/// Whole-line membership on raw bytes, ignoring a trailing `\r`
fn contains_line(contents: &[u8], line: &str) -> bool {
    contents
        .split(|b| *b == b'\n')
        .any(|l| l.strip_suffix(b"\r").unwrap_or(l) == line.as_bytes())
}

impl Resource for LineInFile {
    fn key(&self) -> String {
        format!("{}: {}", self.path.display(), self.line)
    }

    fn kind(&self) -> &'static str {
        "line-in-file"
    }

    fn description(&self) -> String {
        format!("Line '{}' in {}", self.line, self.path.display())
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        if self.sudo {
            privileged("Appending to", &self.path)
        } else {
            SudoRequirement::None
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn probe(&self, _platform: &Platform) -> Result<ResourceState, ProbeError> {
        match fs::read(&self.path) {
            Ok(contents) if contains_line(&contents, &self.line) => Ok(ResourceState::present()),
            Ok(_) => Ok(ResourceState::Absent),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(ResourceState::Absent),
            Err(e) => Err(ProbeError::io(&self.path, e)),
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<(), ApplyError> {
        let text = self.appendix()?;
        ensure_parent(ctx, &self.path, self.sudo)?;

        if self.sudo {
            let sudo = ctx.require_sudo()?;
            let target = path_arg(&self.path);
            let output = sudo.run_with_input("tee", &["-a", &target], text.as_bytes())?;
            if !output.success {
                return Err(ApplyError::Command {
                    program: "sudo tee".to_string(),
                    code: output.code,
                    stderr: output.stderr_str(),
                });
            }
            return Ok(());
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| ApplyError::io(&self.path, e))?;
        file.write_all(text.as_bytes())
            .map_err(|e| ApplyError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::LocalSudo;
    use declarative::{
        Descriptor, ExecutionPlan, OsFamily, OutcomeStatus, PackageManager, Reconciler,
    };

    fn platform() -> Platform {
        Platform::new(OsFamily::Linux, "ubuntu", PackageManager::Apt)
    }

    #[test]
    fn test_contains_line_is_whole_line() {
        assert!(contains_line(b"a\nexport EDITOR=nvim\nb\n", "export EDITOR=nvim"));
        assert!(contains_line(b"export EDITOR=nvim\r\n", "export EDITOR=nvim"));
        assert!(!contains_line(b"# export EDITOR=nvim\n", "export EDITOR=nvim"));
        assert!(!contains_line(b"", "x"));
    }

    #[test]
    fn test_non_utf8_file_is_probed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.conf");
        fs::write(&path, b"caf\xe9=1\nexport EDITOR=nvim\n").unwrap();

        let platform = platform();
        let present = LineInFile::new(&path, "export EDITOR=nvim");
        assert_eq!(present.probe(&platform).unwrap(), ResourceState::present());

        let missing = LineInFile::new(&path, "export PAGER=less");
        assert_eq!(missing.probe(&platform).unwrap(), ResourceState::Absent);
        missing.apply(&mut ApplyContext::new(&platform)).unwrap();
        assert_eq!(missing.probe(&platform).unwrap(), ResourceState::present());
    }

    #[test]
    fn test_missing_file_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let lif = LineInFile::new(dir.path().join("none"), "x");
        assert_eq!(lif.probe(&platform()).unwrap(), ResourceState::Absent);
    }

    #[test]
    fn test_unreadable_path_is_probe_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be read as a file
        let lif = LineInFile::new(dir.path(), "x");
        assert!(lif.probe(&platform()).is_err());
    }

    #[test]
    fn test_append_then_already_satisfied() {
        let dir = tempfile::tempdir().unwrap();
        let rc = dir.path().join(".zshrc");
        fs::write(&rc, "alias ll='ls -l'").unwrap();

        let platform = platform();
        let line = LineInFile::new(&rc, "export EDITOR=nvim");
        let plan = ExecutionPlan::from_descriptors([Descriptor::from(line)]).unwrap();
        let reconciler = Reconciler::new(&platform);

        let first = reconciler.run(&plan);
        assert_eq!(first.outcomes()[0].status, OutcomeStatus::Applied);

        let second = reconciler.run(&plan);
        assert_eq!(second.outcomes()[0].status, OutcomeStatus::AlreadySatisfied);

        let contents = fs::read_to_string(&rc).unwrap();
        assert_eq!(contents, "alias ll='ls -l'\nexport EDITOR=nvim\n");
        assert_eq!(contents.matches("export EDITOR=nvim").count(), 1);
    }

    #[test]
    fn test_apply_creates_file_and_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf.d").join("env");
        let platform = platform();
        let mut ctx = ApplyContext::new(&platform);

        LineInFile::new(&path, "A=1").apply(&mut ctx).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "A=1\n");
    }

    #[test]
    fn test_privileged_append_uses_tee() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sysctl.conf");
        fs::write(&path, "a=1\n").unwrap();
        let platform = platform();
        let mut ctx = ApplyContext::with_sudo(&platform, &LocalSudo);

        let lif = LineInFile::new(&path, "vm.swappiness=10").sudo(true);
        assert!(matches!(
            lif.sudo_requirement(),
            SudoRequirement::Required { .. }
        ));
        lif.apply(&mut ctx).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "a=1\nvm.swappiness=10\n"
        );
    }
}
