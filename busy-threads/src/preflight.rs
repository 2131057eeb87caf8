//! Pre-flight checks for busy-threads
//!
//! Everything that can fail before the first round fails here: platform,
//! `jstack` location, writable output paths, the invoking user.

use std::fs::{self, OpenOptions};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use log::debug;
use nix::unistd::{geteuid, User};

use crate::config::Config;
use crate::domain::{Identity, SetupError};

/// Run all pre-flight checks that need the final configuration.
///
/// Returns the identity of the invoking user.
///
/// # Errors
/// Returns an error if a configured path is not writable or the current user
/// cannot be resolved.
pub fn run_preflight_checks(config: &Config) -> Result<Identity, SetupError> {
    if let Some(file) = &config.append_file {
        prepare_append_file(file)?;
    }
    if let Some(dir) = &config.store_dir {
        prepare_store_dir(dir)?;
    }
    current_identity()
}

/// `ps -L`, `top -H` and `/proc` task layout are Linux-only.
///
/// # Errors
/// Returns `UnsupportedOs` on anything but Linux.
pub fn check_supported_os() -> Result<(), SetupError> {
    if cfg!(target_os = "linux") {
        Ok(())
    } else {
        Err(SetupError::UnsupportedOs(std::env::consts::OS.to_string()))
    }
}

/// Find the `jstack` executable.
///
/// An explicit path must be an executable file. Otherwise `jstack` is looked
/// up on `PATH`, then in `$JAVA_HOME/bin`.
///
/// # Errors
/// Returns `DumpToolNotExecutable` or `DumpToolNotFound`.
pub fn resolve_dump_tool(explicit: Option<&Path>) -> Result<PathBuf, SetupError> {
    if let Some(path) = explicit {
        return if is_executable_file(path) {
            Ok(path.to_path_buf())
        } else {
            Err(SetupError::DumpToolNotExecutable(path.to_path_buf()))
        };
    }

    if let Ok(path) = which::which("jstack") {
        debug!("jstack found on PATH: {}", path.display());
        return Ok(path);
    }

    let java_home = std::env::var_os("JAVA_HOME").map(PathBuf::from);
    match java_home.map(|home| home.join("bin").join("jstack")) {
        Some(path) if is_executable_file(&path) => {
            debug!("jstack found in JAVA_HOME: {}", path.display());
            Ok(path)
        }
        _ => Err(SetupError::DumpToolNotFound),
    }
}

fn is_executable_file(path: &Path) -> bool {
    fs::metadata(path).is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

/// Create the append-log (and its parent directory) if needed and make sure
/// it can be appended to.
///
/// # Errors
/// Returns `UnwritablePath` if the file cannot be opened for appending.
pub fn prepare_append_file(path: &Path) -> Result<(), SetupError> {
    let unwritable = |source| SetupError::UnwritablePath { path: path.to_path_buf(), source };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(unwritable)?;
    }
    OpenOptions::new().create(true).append(true).open(path).map_err(unwritable)?;
    Ok(())
}

/// Create the store directory if needed and make sure files can be created
/// in it.
///
/// # Errors
/// Returns `UnwritablePath` if the directory cannot be created or written.
pub fn prepare_store_dir(dir: &Path) -> Result<(), SetupError> {
    let unwritable = |source| SetupError::UnwritablePath { path: dir.to_path_buf(), source };

    fs::create_dir_all(dir).map_err(unwritable)?;
    tempfile::tempfile_in(dir).map_err(unwritable)?;
    Ok(())
}

/// The invoking user, by effective uid.
///
/// # Errors
/// Returns `UnknownIdentity` if the uid has no passwd entry.
pub fn current_identity() -> Result<Identity, SetupError> {
    let uid = geteuid();
    let user = User::from_uid(uid)
        .map_err(|e| SetupError::UnknownIdentity(e.to_string()))?
        .ok_or_else(|| SetupError::UnknownIdentity(format!("no passwd entry for uid {uid}")))?;
    Ok(Identity { user: user.name, elevated: uid.is_root() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_check_on_linux() {
        #[cfg(target_os = "linux")]
        assert!(check_supported_os().is_ok());
        #[cfg(not(target_os = "linux"))]
        assert!(check_supported_os().is_err());
    }

    #[test]
    fn test_explicit_dump_tool_must_be_executable() {
        let dir = tempfile::tempdir().unwrap();
        let tool = dir.path().join("jstack");
        fs::write(&tool, "#!/bin/sh\n").unwrap();

        let err = resolve_dump_tool(Some(&tool)).unwrap_err();
        assert!(matches!(err, SetupError::DumpToolNotExecutable(_)));

        fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(resolve_dump_tool(Some(&tool)).unwrap(), tool);
    }

    #[test]
    fn test_explicit_dump_tool_missing() {
        let err = resolve_dump_tool(Some(Path::new("/nonexistent/jstack"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/jstack"));
    }

    #[test]
    fn test_prepare_append_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("logs").join("busy.log");
        prepare_append_file(&log).unwrap();
        assert!(log.is_file());
    }

    #[test]
    fn test_prepare_store_dir_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("captures");
        prepare_store_dir(&store).unwrap();
        assert!(store.is_dir());
    }

    #[test]
    fn test_store_dir_under_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("file");
        fs::write(&file, "").unwrap();
        let err = prepare_store_dir(&file.join("sub")).unwrap_err();
        assert!(err.to_string().starts_with("Cannot write to"));
    }

    #[test]
    fn test_current_identity() {
        let identity = current_identity().unwrap();
        assert!(!identity.user.is_empty());
        assert_eq!(identity.elevated, geteuid().is_root());
    }
}
