//! Host platform detection and applicability predicates.
//!
//! The platform is detected once per process and passed explicitly to the
//! reconciler and every resource. Tests construct synthetic platforms with
//! [`Platform::new`] or [`Platform::from_os_release`].
//!
//! # Supported Platforms
//!
//! | Family | Distribution signature (`ID` / `ID_LIKE`)       | Package manager |
//! |--------|--------------------------------------------------|-----------------|
//! | Linux  | debian, ubuntu, linuxmint, pop, raspbian, ...    | apt             |
//! | Linux  | fedora, rhel, centos, rocky, almalinux, amzn     | dnf             |
//! | Linux  | arch, manjaro, endeavouros                       | pacman          |
//! | Linux  | opensuse, opensuse-leap, opensuse-tumbleweed, sles | zypper        |
//! | macOS  | -                                                | brew            |

use crate::error::UnsupportedPlatformError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Files consulted for the Linux distribution signature, in order
const OS_RELEASE_PATHS: [&str; 2] = ["/etc/os-release", "/usr/lib/os-release"];

/// Operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Linux,
    #[serde(alias = "darwin")]
    Macos,
}

impl fmt::Display for OsFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Macos => write!(f, "macos"),
        }
    }
}

/// Package manager flavor used for the package resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManager {
    Apt,
    Dnf,
    Pacman,
    Zypper,
    Brew,
}

impl PackageManager {
    /// Map a distribution id to its package manager
    pub fn for_distro(id: &str) -> Option<Self> {
        match id {
            "debian" | "ubuntu" | "linuxmint" | "pop" | "elementary" | "raspbian" | "kali"
            | "neon" | "zorin" => Some(Self::Apt),
            "fedora" | "rhel" | "centos" | "rocky" | "almalinux" | "amzn" => Some(Self::Dnf),
            "arch" | "manjaro" | "endeavouros" | "garuda" => Some(Self::Pacman),
            "opensuse" | "opensuse-leap" | "opensuse-tumbleweed" | "sles" | "suse" => {
                Some(Self::Zypper)
            }
            _ => None,
        }
    }

    /// Whether installs through this manager need root
    pub fn needs_sudo(self) -> bool {
        !matches!(self, Self::Brew)
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Apt => "apt",
            Self::Dnf => "dnf",
            Self::Pacman => "pacman",
            Self::Zypper => "zypper",
            Self::Brew => "brew",
        };
        f.write_str(name)
    }
}

/// Detected OS identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub family: OsFamily,
    /// Distribution id (`ubuntu`, `fedora`, ...); `macos` on macOS
    pub distro: String,
    /// Parent distributions from `ID_LIKE`
    pub distro_like: Vec<String>,
    pub version: Option<String>,
    pub package_manager: PackageManager,
    pub arch: String,
}

impl Platform {
    pub fn new(family: OsFamily, distro: &str, package_manager: PackageManager) -> Self {
        Self {
            family,
            distro: distro.to_string(),
            distro_like: Vec::new(),
            version: None,
            package_manager,
            arch: std::env::consts::ARCH.to_string(),
        }
    }

    pub fn with_arch(mut self, arch: &str) -> Self {
        self.arch = arch.to_string();
        self
    }

    /// macOS host, always served by Homebrew
    pub fn macos(arch: &str) -> Self {
        Self::new(OsFamily::Macos, "macos", PackageManager::Brew).with_arch(arch)
    }

    /// Build a Linux platform from the contents of an os-release file
    pub fn from_os_release(contents: &str, arch: &str) -> Result<Self, UnsupportedPlatformError> {
        let fields = parse_os_release(contents);

        let Some(id) = fields.get("ID").map(|id| id.to_lowercase()) else {
            return Err(UnsupportedPlatformError {
                os: "linux".to_string(),
                distro: None,
            });
        };

        let like: Vec<String> = fields
            .get("ID_LIKE")
            .map(|l| l.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default();

        let package_manager = std::iter::once(id.as_str())
            .chain(like.iter().map(String::as_str))
            .find_map(PackageManager::for_distro)
            .ok_or_else(|| UnsupportedPlatformError {
                os: "linux".to_string(),
                distro: Some(id.clone()),
            })?;

        Ok(Self {
            family: OsFamily::Linux,
            distro: id,
            distro_like: like,
            version: fields.get("VERSION_ID").cloned(),
            package_manager,
            arch: arch.to_string(),
        })
    }

    /// Whether the distribution is `id` or derives from it
    pub fn is_distro(&self, id: &str) -> bool {
        self.distro == id || self.distro_like.iter().any(|l| l == id)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.distro)?;
        if let Some(version) = &self.version {
            write!(f, " {version}")?;
        }
        write!(
            f,
            " ({}, {}, {})",
            self.family, self.package_manager, self.arch
        )
    }
}

/// Detect the current platform
///
/// # Errors
///
/// Returns [`UnsupportedPlatformError`] if the OS is neither Linux nor
/// macOS, or the Linux distribution is not recognized.
pub fn detect() -> Result<Platform, UnsupportedPlatformError> {
    let os = std::env::consts::OS;
    let arch = std::env::consts::ARCH;

    match os {
        "macos" => Ok(Platform::macos(arch)),
        "linux" => {
            let contents = OS_RELEASE_PATHS
                .iter()
                .map(Path::new)
                .find_map(|p| std::fs::read_to_string(p).ok())
                .ok_or_else(|| UnsupportedPlatformError {
                    os: os.to_string(),
                    distro: None,
                })?;
            let platform = Platform::from_os_release(&contents, arch)?;
            log::debug!("Detected platform: {platform}");
            Ok(platform)
        }
        _ => Err(UnsupportedPlatformError {
            os: os.to_string(),
            distro: None,
        }),
    }
}

/// Parse `KEY=value` lines, stripping optional quotes
fn parse_os_release(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .or_else(|| v.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
                .unwrap_or(v);
            (k.trim().to_string(), v.to_string())
        })
        .collect()
}

/// Predicate selecting the platforms a resource is relevant on
///
/// Every non-empty list must contain a match; empty lists match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Applicability {
    pub family: Vec<OsFamily>,
    /// Matches the distribution id or any `ID_LIKE` entry
    pub distro: Vec<String>,
    pub package_manager: Vec<PackageManager>,
    pub arch: Vec<String>,
}

impl Applicability {
    /// Applies on every platform
    pub fn always() -> Self {
        Self::default()
    }

    pub fn family(family: OsFamily) -> Self {
        Self {
            family: vec![family],
            ..Self::default()
        }
    }

    pub fn package_manager(manager: PackageManager) -> Self {
        Self {
            package_manager: vec![manager],
            ..Self::default()
        }
    }

    pub fn matches(&self, platform: &Platform) -> bool {
        (self.family.is_empty() || self.family.contains(&platform.family))
            && (self.distro.is_empty() || self.distro.iter().any(|d| platform.is_distro(d)))
            && (self.package_manager.is_empty()
                || self.package_manager.contains(&platform.package_manager))
            && (self.arch.is_empty() || self.arch.iter().any(|a| *a == platform.arch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UBUNTU: &str = r#"
PRETTY_NAME="Ubuntu 22.04.4 LTS"
NAME="Ubuntu"
VERSION_ID="22.04"
ID=ubuntu
ID_LIKE=debian
"#;

    #[test]
    fn test_detect_platform() {
        // Either a known platform or a clean error, never a panic
        match detect() {
            Ok(platform) => assert!(!platform.distro.is_empty()),
            Err(err) => assert!(!err.os.is_empty()),
        }
    }

    #[test]
    fn test_from_os_release_ubuntu() {
        let platform = Platform::from_os_release(UBUNTU, "x86_64").unwrap();
        assert_eq!(platform.family, OsFamily::Linux);
        assert_eq!(platform.distro, "ubuntu");
        assert_eq!(platform.version.as_deref(), Some("22.04"));
        assert_eq!(platform.package_manager, PackageManager::Apt);
        assert!(platform.is_distro("debian"));
        assert_eq!(platform.to_string(), "ubuntu 22.04 (linux, apt, x86_64)");
    }

    #[test]
    fn test_from_os_release_falls_back_to_id_like() {
        let contents = "ID=\"nobara\"\nID_LIKE=\"rhel centos fedora\"\n";
        let platform = Platform::from_os_release(contents, "x86_64").unwrap();
        assert_eq!(platform.distro, "nobara");
        assert_eq!(platform.package_manager, PackageManager::Dnf);
    }

    #[test]
    fn test_from_os_release_unknown_distro() {
        let err = Platform::from_os_release("ID=gentoo\n", "x86_64").unwrap_err();
        assert_eq!(err.distro.as_deref(), Some("gentoo"));
    }

    #[test]
    fn test_from_os_release_missing_id() {
        let err = Platform::from_os_release("# nothing here\n", "x86_64").unwrap_err();
        assert_eq!(err.distro, None);
    }

    #[test]
    fn test_parse_os_release_quotes() {
        let fields = parse_os_release("A='single'\nB=\"double\"\nC=bare\n# D=comment\n");
        assert_eq!(fields["A"], "single");
        assert_eq!(fields["B"], "double");
        assert_eq!(fields["C"], "bare");
        assert!(!fields.contains_key("D"));
    }

    #[test]
    fn test_macos_platform() {
        let platform = Platform::macos("aarch64");
        assert_eq!(platform.package_manager, PackageManager::Brew);
        assert!(!platform.package_manager.needs_sudo());
    }

    #[test]
    fn test_applicability_empty_matches_everything() {
        let ubuntu = Platform::from_os_release(UBUNTU, "x86_64").unwrap();
        assert!(Applicability::always().matches(&ubuntu));
        assert!(Applicability::always().matches(&Platform::macos("aarch64")));
    }

    #[test]
    fn test_applicability_filters() {
        let ubuntu = Platform::from_os_release(UBUNTU, "x86_64").unwrap();
        let mac = Platform::macos("aarch64");

        let linux_only = Applicability::family(OsFamily::Linux);
        assert!(linux_only.matches(&ubuntu));
        assert!(!linux_only.matches(&mac));

        let debian_like = Applicability {
            distro: vec!["debian".into()],
            ..Applicability::default()
        };
        assert!(debian_like.matches(&ubuntu));

        let apt_on_arm = Applicability {
            package_manager: vec![PackageManager::Apt],
            arch: vec!["aarch64".into()],
            ..Applicability::default()
        };
        assert!(!apt_on_arm.matches(&ubuntu));
        assert!(apt_on_arm.matches(&ubuntu.clone().with_arch("aarch64")));
    }
}
