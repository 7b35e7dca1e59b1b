//! Profile file schema
//!
//! ```toml
//! extends = ["base"]
//!
//! [[resource]]
//! kind = "package"
//! name = "fd"
//! names = { apt = "fd-find" }
//!
//! [[resource]]
//! kind = "permission"
//! path = "~/.ssh/config"
//! mode = "0600"
//!
//! [[resource]]
//! kind = "group-membership"
//! group = "docker"
//! when = { family = ["linux"] }
//! ```

use declarative::{Applicability, PackageManager};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use crate::paths;

// ============================================================================
// Profile
// ============================================================================

/// One profile file
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    /// Profiles whose resources come before this one's
    #[serde(default)]
    pub extends: Vec<String>,

    /// Resources in declaration order
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceSpec>,
}

/// A `[[resource]]` entry
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSpec {
    /// Overrides the kind's default key
    #[serde(default)]
    pub key: Option<String>,

    /// Platforms the resource applies to (empty = all)
    #[serde(default)]
    pub when: Applicability,

    #[serde(flatten)]
    pub kind: KindSpec,

    /// Directory of the profile file; relative paths resolve against it
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl ResourceSpec {
    /// Expand `~`/`$VAR`, then anchor a relative result at the profile directory
    pub fn path(&self, raw: &str) -> PathBuf {
        self.base_dir.join(paths::expand(raw))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum KindSpec {
    Package(PackageSpec),
    LineInFile(LineInFileSpec),
    Permission(PermissionSpec),
    Symlink(SymlinkSpec),
    GitClone(GitCloneSpec),
    Download(DownloadSpec),
    Archive(ArchiveSpec),
    LoginShell(LoginShellSpec),
    GroupMembership(GroupSpec),
}

// ============================================================================
// Kind parameters
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct PackageSpec {
    pub name: String,
    /// Homebrew cask (ignored by other managers)
    #[serde(default)]
    pub cask: bool,
    /// Per-manager package names, e.g. `{ apt = "fd-find" }`
    #[serde(default)]
    pub names: HashMap<PackageManager, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineInFileSpec {
    pub path: String,
    pub line: String,
    #[serde(default)]
    pub sudo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionSpec {
    pub path: String,
    pub mode: Mode,
    #[serde(default)]
    pub sudo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymlinkSpec {
    /// What the link points to
    pub source: String,
    /// Where the link is created
    pub target: String,
    /// Move an existing non-link out of the way
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub sudo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitCloneSpec {
    pub url: String,
    pub dest: String,
    #[serde(default)]
    pub branch: Option<String>,
    /// Shallow clone depth; 0 clones the full history
    #[serde(default = "default_depth")]
    pub depth: u32,
}

const fn default_depth() -> u32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadSpec {
    pub url: String,
    pub dest: String,
    #[serde(default)]
    pub mode: Option<Mode>,
    #[serde(default)]
    pub sudo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveSpec {
    /// URL of a `.tar.gz`
    pub url: String,
    /// Directory to extract into
    pub dest: String,
    /// Path relative to `dest` that exists once extracted
    pub creates: String,
    #[serde(default)]
    pub sudo: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginShellSpec {
    pub shell: String,
    /// Defaults to the invoking user
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupSpec {
    pub group: String,
    /// Defaults to the invoking user
    #[serde(default)]
    pub user: Option<String>,
}

// ============================================================================
// File modes
// ============================================================================

/// Permission bits, written as an octal string (`"0600"`) or a TOML
/// integer (`0o600`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode(pub u32);

impl Mode {
    pub fn parse(text: &str) -> Result<Self, String> {
        let digits = text.trim().trim_start_matches("0o");
        let bits = u32::from_str_radix(digits, 8)
            .map_err(|_| format!("invalid octal mode '{text}'"))?;
        Self::from_bits(bits)
    }

    fn from_bits(bits: u32) -> Result<Self, String> {
        if bits > 0o7777 {
            return Err(format!("mode {bits:o} is out of range"));
        }
        Ok(Self(bits))
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Bits(u32),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => Self::parse(&text),
            Raw::Bits(bits) => Self::from_bits(bits),
        }
        .map_err(serde::de::Error::custom)
    }
}
