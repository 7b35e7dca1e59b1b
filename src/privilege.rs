//! Refusing to run as root

use anyhow::{Result, bail};

/// Effective user id of this process
pub fn effective_uid() -> u32 {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() }
}

/// Fail when running as root
///
/// Actions elevate individually through sudo, so files created as root
/// in the user's home are never wanted.
pub fn ensure_not_root(euid: u32) -> Result<()> {
    if euid == 0 {
        bail!("rigup must not be run as root; privileged steps use sudo on their own");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_is_refused() {
        assert!(ensure_not_root(0).is_err());
        assert!(ensure_not_root(1000).is_ok());
    }
}
