use std::{
    fs::{self, OpenOptions},
    io,
    os::unix::fs::OpenOptionsExt,
    path::{Path, PathBuf},
};

use log::debug;

use crate::error::ReconcileError;

/// Lists device nodes under `dev_root` whose file name starts with
/// `prefix`, sorted lexicographically so candidate selection is
/// deterministic. A missing `dev_root` yields an empty list, not an
/// error; callers decide whether that is fatal.
pub fn enumerate(dev_root: &Path, prefix: &str) -> Result<Vec<PathBuf>, ReconcileError> {
    let entries = match fs::read_dir(dev_root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ReconcileError::io(
                format!("Failed to list device nodes under '{}'", dev_root.display()),
                e,
            ))
        }
    };

    let mut nodes: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .map(|entry| entry.path())
        .collect();
    nodes.sort();

    Ok(nodes)
}

/// Best-effort check that a device node is currently unclaimed, by
/// opening it with O_EXCL and releasing the handle immediately. The
/// handle must not be held: the binding tool needs to acquire the
/// device itself. Any open error classifies the device as busy.
///
/// This is a time-of-check/time-of-use probe; a device reported
/// available here can become busy before the bind attempt runs, and
/// that race is handled by the bind attempt's own failure path.
pub fn probe_exclusive(path: &Path) -> bool {
    match OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_EXCL)
        .open(path)
    {
        Ok(_) => true,
        Err(e) => {
            debug!("Device '{}' is busy: {e}", path.display());
            false
        }
    }
}
