//! Host checks run before reconciling
//!
//! Checks only warn; they never stop a run.

use std::path::Path;

use crate::ui;

/// Marker left by Debian/Ubuntu when an update needs a reboot
pub const REBOOT_REQUIRED: &str = "/var/run/reboot-required";

/// A condition worth telling the user about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostWarning {
    RebootRequired,
}

impl HostWarning {
    pub fn message(&self) -> &'static str {
        match self {
            Self::RebootRequired => {
                "A reboot is pending; some packages may not work until the host restarts"
            }
        }
    }
}

/// Inspect the host, with the reboot marker path given explicitly
pub fn inspect(reboot_marker: &Path) -> Vec<HostWarning> {
    let mut warnings = Vec::new();
    if reboot_marker.exists() {
        warnings.push(HostWarning::RebootRequired);
    }
    warnings
}

/// Print a warning for every check that fires
pub fn run() {
    for warning in inspect(Path::new(REBOOT_REQUIRED)) {
        log::debug!("host check: {warning:?}");
        ui::warn(warning.message());
    }
}
