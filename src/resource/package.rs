//! OS package resource (apt, dnf, pacman, zypper, brew)

use declarative::{
    ApplyContext, ApplyError, PackageManager, Platform, ProbeError, Resource, ResourceState,
    SudoRequirement,
};

use crate::runner;

/// One external command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: &'static str,
    pub args: Vec<String>,
}

impl Invocation {
    fn new(program: &'static str, args: &[&str]) -> Self {
        Self {
            program,
            args: args.iter().map(ToString::to_string).collect(),
        }
    }

    pub fn arg_refs(&self) -> Vec<&str> {
        self.args.iter().map(String::as_str).collect()
    }
}

/// A package installed through the platform's package manager
#[derive(Debug, Clone)]
pub struct Package {
    /// Name used in profiles and as the key
    pub name: String,
    /// Name the package manager knows it by
    pub install_name: String,
    pub manager: PackageManager,
    /// Homebrew cask instead of formula
    pub cask: bool,
}

impl Package {
    pub fn new(name: &str, manager: PackageManager) -> Self {
        Self {
            name: name.to_string(),
            install_name: name.to_string(),
            manager,
            cask: false,
        }
    }

    /// Use a manager-specific package name
    pub fn with_install_name(mut self, install_name: &str) -> Self {
        self.install_name = install_name.to_string();
        self
    }

    pub fn cask(mut self, cask: bool) -> Self {
        self.cask = cask;
        self
    }

    /// Read-only query whose success means "installed"
    ///
    /// apt is special: dpkg keeps records of removed packages, so the
    /// status text has to be checked as well.
    pub fn query_command(&self) -> Invocation {
        let name = self.install_name.as_str();
        match self.manager {
            PackageManager::Apt => Invocation::new("dpkg-query", &["-W", "-f=${Status}", name]),
            PackageManager::Dnf | PackageManager::Zypper => Invocation::new("rpm", &["-q", name]),
            PackageManager::Pacman => Invocation::new("pacman", &["-Q", name]),
            PackageManager::Brew if self.cask => {
                Invocation::new("brew", &["list", "--cask", name])
            }
            PackageManager::Brew => Invocation::new("brew", &["list", "--formula", name]),
        }
    }

    /// Non-interactive install command
    pub fn install_command(&self) -> Invocation {
        let name = self.install_name.as_str();
        match self.manager {
            PackageManager::Apt => Invocation::new(
                "env",
                &[
                    "DEBIAN_FRONTEND=noninteractive",
                    "apt-get",
                    "install",
                    "-y",
                    "-q",
                    name,
                ],
            ),
            PackageManager::Dnf => Invocation::new("dnf", &["install", "-y", name]),
            PackageManager::Pacman => {
                Invocation::new("pacman", &["-S", "--noconfirm", "--needed", name])
            }
            PackageManager::Zypper => {
                Invocation::new("zypper", &["--non-interactive", "install", name])
            }
            PackageManager::Brew if self.cask => {
                Invocation::new("brew", &["install", "--cask", name])
            }
            PackageManager::Brew => Invocation::new("brew", &["install", "--formula", name]),
        }
    }
}

/// Interpret the query output for a manager
fn is_installed(manager: PackageManager, success: bool, stdout: &str) -> bool {
    match manager {
        PackageManager::Apt => success && stdout.contains("install ok installed"),
        _ => success,
    }
}

impl Resource for Package {
    fn key(&self) -> String {
        self.name.clone()
    }

    fn kind(&self) -> &'static str {
        "package"
    }

    fn description(&self) -> String {
        let flavor = if self.cask { " (cask)" } else { "" };
        format!("Install {}{} via {}", self.install_name, flavor, self.manager)
    }

    fn sudo_requirement(&self) -> SudoRequirement {
        if self.manager.needs_sudo() {
            SudoRequirement::Required {
                reason: format!("Installing {} with {}", self.install_name, self.manager),
            }
        } else {
            SudoRequirement::None
        }
    }

    fn desired_state(&self) -> ResourceState {
        ResourceState::present()
    }

    fn probe(&self, _platform: &Platform) -> Result<ResourceState, ProbeError> {
        let query = self.query_command();
        let output = runner::probe(query.program, &query.arg_refs())?;
        if is_installed(self.manager, output.success, &output.stdout_str()) {
            Ok(ResourceState::present())
        } else {
            Ok(ResourceState::Absent)
        }
    }

    fn apply(&self, ctx: &mut ApplyContext) -> Result<(), ApplyError> {
        let install = self.install_command();
        let args = install.arg_refs();
        if self.manager.needs_sudo() {
            ctx.require_sudo()?.run_checked(install.program, &args)?;
        } else {
            runner::apply(install.program, &args)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::RecordingSudo;
    use declarative::OsFamily;

    #[test]
    fn test_query_commands() {
        let apt = Package::new("git", PackageManager::Apt).query_command();
        assert_eq!(apt.program, "dpkg-query");
        assert_eq!(apt.args, ["-W", "-f=${Status}", "git"]);

        let pacman = Package::new("git", PackageManager::Pacman).query_command();
        assert_eq!(pacman.program, "pacman");
        assert_eq!(pacman.args, ["-Q", "git"]);

        let cask = Package::new("firefox", PackageManager::Brew)
            .cask(true)
            .query_command();
        assert_eq!(cask.args, ["list", "--cask", "firefox"]);
    }

    #[test]
    fn test_install_uses_manager_specific_name() {
        let pkg = Package::new("fd", PackageManager::Apt).with_install_name("fd-find");
        assert_eq!(pkg.key(), "fd");
        let install = pkg.install_command();
        assert_eq!(install.program, "env");
        assert_eq!(install.args.last().map(String::as_str), Some("fd-find"));
    }

    #[test]
    fn test_apt_removed_package_is_absent() {
        assert!(is_installed(
            PackageManager::Apt,
            true,
            "install ok installed"
        ));
        assert!(!is_installed(
            PackageManager::Apt,
            true,
            "deinstall ok config-files"
        ));
        assert!(!is_installed(PackageManager::Dnf, false, ""));
    }

    #[test]
    fn test_sudo_requirement_follows_manager() {
        assert!(matches!(
            Package::new("git", PackageManager::Dnf).sudo_requirement(),
            SudoRequirement::Required { .. }
        ));
        assert_eq!(
            Package::new("git", PackageManager::Brew).sudo_requirement(),
            SudoRequirement::None
        );
    }

    #[test]
    fn test_apply_goes_through_sudo() {
        let platform = Platform::new(OsFamily::Linux, "fedora", PackageManager::Dnf);
        let sudo = RecordingSudo::default();
        let mut ctx = ApplyContext::with_sudo(&platform, &sudo);

        Package::new("ripgrep", PackageManager::Dnf)
            .apply(&mut ctx)
            .unwrap();

        assert_eq!(sudo.commands(), ["dnf install -y ripgrep"]);
    }

    #[test]
    fn test_apply_without_sudo_fails() {
        let platform = Platform::new(OsFamily::Linux, "ubuntu", PackageManager::Apt);
        let mut ctx = ApplyContext::new(&platform);
        let err = Package::new("git", PackageManager::Apt)
            .apply(&mut ctx)
            .unwrap_err();
        assert!(matches!(err, ApplyError::SudoUnavailable));
    }
}
