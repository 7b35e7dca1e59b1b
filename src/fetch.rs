//! HTTP downloads and atomic file placement for the download/archive kinds

use declarative::{ApplyContext, ApplyError};
use std::fs;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Upper bound for a single download (IDE tarballs are large)
const MAX_DOWNLOAD_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Download a URL into memory
pub fn download(url: &str) -> Result<Vec<u8>, ApplyError> {
    let network = |message: String| ApplyError::Network {
        url: url.to_string(),
        message,
    };

    log::info!("Downloading {url}");
    let agent = ureq::Agent::new_with_defaults();
    let mut response = agent
        .get(url)
        .header("User-Agent", concat!("rigup/", env!("CARGO_PKG_VERSION")))
        .call()
        .map_err(|e| match e {
            ureq::Error::StatusCode(code) => network(format!("HTTP {code}")),
            other => network(other.to_string()),
        })?;

    response
        .body_mut()
        .with_config()
        .limit(MAX_DOWNLOAD_SIZE)
        .read_to_vec()
        .map_err(|e| network(e.to_string()))
}

/// Write `bytes` to `dest` without ever exposing a partial file
///
/// Unprivileged writes go through a temp file in the destination
/// directory and a rename. Privileged writes stage a temp file and hand
/// it to `install`.
pub fn place_file(
    ctx: &ApplyContext,
    dest: &Path,
    bytes: &[u8],
    mode: Option<u32>,
    privileged: bool,
) -> Result<(), ApplyError> {
    if privileged {
        let sudo = ctx.require_sudo()?;
        let staged = stage(&std::env::temp_dir(), bytes)?;
        let mode = format!("{:o}", mode.unwrap_or(0o644));
        let staged_path = staged.path().to_string_lossy().to_string();
        if let Some(parent) = dest.parent() {
            sudo.run_checked("mkdir", &["-p", &parent.to_string_lossy()])?;
        }
        sudo.run_checked("install", &["-m", &mode, &staged_path, &dest.to_string_lossy()])?;
        return Ok(());
    }

    let parent = dest
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| ApplyError::io(parent, e))?;

    let staged = stage(parent, bytes)?;
    if let Some(mode) = mode {
        fs::set_permissions(staged.path(), fs::Permissions::from_mode(mode))
            .map_err(|e| ApplyError::io(staged.path(), e))?;
    }
    staged
        .persist(dest)
        .map_err(|e| ApplyError::io(dest, e.error))?;
    Ok(())
}

fn stage(dir: &Path, bytes: &[u8]) -> Result<tempfile::NamedTempFile, ApplyError> {
    let mut staged = tempfile::Builder::new()
        .prefix(".rigup-")
        .tempfile_in(dir)
        .map_err(|e| ApplyError::io(dir, e))?;
    if let Err(e) = staged.write_all(bytes).and_then(|()| staged.flush()) {
        return Err(ApplyError::io(staged.path(), e));
    }
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::{OsFamily, PackageManager, Platform};

    #[test]
    fn test_place_file_creates_parents_and_mode() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("bin").join("tool");
        let platform = Platform::new(OsFamily::Linux, "ubuntu", PackageManager::Apt);
        let ctx = ApplyContext::new(&platform);

        place_file(&ctx, &dest, b"#!/bin/sh\n", Some(0o755), false).unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"#!/bin/sh\n");
        let mode = fs::metadata(&dest).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode, 0o755);
    }

    #[test]
    fn test_place_file_privileged_without_sudo() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::new(OsFamily::Linux, "ubuntu", PackageManager::Apt);
        let ctx = ApplyContext::new(&platform);

        let err = place_file(&ctx, &dir.path().join("x"), b"x", None, true).unwrap_err();
        assert!(matches!(err, ApplyError::SudoUnavailable));
        assert!(!dir.path().join("x").exists());
    }

    #[test]
    fn test_download_unreachable_is_network_error() {
        let err = download("http://127.0.0.1:9/nothing").unwrap_err();
        assert!(matches!(err, ApplyError::Network { .. }));
    }
}
