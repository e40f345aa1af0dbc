use std::{
    path::{Path, PathBuf},
    process::Command,
};

use log::{debug, info};

use crate::{
    constants::NBD_DEV_PREFIX, dependencies::Dependency, devices, error::ReconcileError,
    exe::RunTool,
};

/// A successful bind: the device that was claimed and the exact argv
/// used to claim it.
#[derive(Debug, Clone, PartialEq)]
pub struct BindResult {
    pub device: PathBuf,
    pub command: Vec<String>,
}

/// Attaches `image` to `device` by launching the binding tool. Success
/// means the tool exited zero and left a long-running process serving
/// the image; the returned argv is the exact invocation used.
pub fn connect(device: &Path, image: &str, format: &str) -> Result<Vec<String>, ReconcileError> {
    let argv: Vec<String> = vec![
        Dependency::QemuNbd.name().into(),
        "--discard=unmap".into(),
        "--detect-zeroes=unmap".into(),
        "--persistent".into(),
        "-f".into(),
        format.into(),
        "-c".into(),
        device.to_string_lossy().into_owned(),
        image.into(),
    ];

    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]);
    cmd.tool_check()?;

    Ok(argv)
}

/// Binds `image` to the first free NBD device node. Enumerates the
/// `nbd*` nodes under `dev_root` (sorted), filters to the ones that
/// probe available, and tries each in turn, stopping at the first
/// success.
pub fn bind_first_available(
    image: &str,
    format: &str,
    dev_root: &Path,
) -> Result<BindResult, ReconcileError> {
    let nodes = devices::enumerate(dev_root, NBD_DEV_PREFIX)?;
    if nodes.is_empty() {
        return Err(ReconcileError::NoDeviceNodesFound {
            prefix: NBD_DEV_PREFIX.into(),
            dev_root: dev_root.to_path_buf(),
        });
    }

    let available: Vec<PathBuf> = nodes
        .into_iter()
        .filter(|device| devices::probe_exclusive(device))
        .collect();
    debug!("{} NBD device(s) probe available", available.len());

    let result = bind_candidates(available, |device| connect(device, image, format))?;
    info!("Bound '{image}' to '{}'", result.device.display());
    Ok(result)
}

/// Selection and exhaustion policy: try `bind` against each candidate
/// in order, first success wins. Failed candidates are recorded; if
/// every candidate fails (or none was offered), the error carries the
/// full attempt list and the last tool error observed.
fn bind_candidates(
    candidates: Vec<PathBuf>,
    mut bind: impl FnMut(&Path) -> Result<Vec<String>, ReconcileError>,
) -> Result<BindResult, ReconcileError> {
    let mut attempted = Vec::new();
    let mut last_error = None;

    for device in candidates {
        match bind(&device) {
            Ok(command) => return Ok(BindResult { device, command }),
            Err(e) => {
                debug!("Bind attempt on '{}' failed: {e}", device.display());
                attempted.push(device);
                last_error = Some(e.to_string());
            }
        }
    }

    Err(ReconcileError::NoDeviceAvailable {
        attempted,
        last_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fail(device: &Path) -> Result<Vec<String>, ReconcileError> {
        Err(ReconcileError::ToolInvocation {
            tool: "qemu-nbd".into(),
            code: Some(1),
            stdout: String::new(),
            stderr: format!("{}: busy", device.display()),
        })
    }

    #[test]
    fn test_bind_candidates_first_success_wins() {
        let mut attempts = 0;
        let result = bind_candidates(
            vec!["/dev/nbd0".into(), "/dev/nbd1".into(), "/dev/nbd2".into()],
            |device| {
                attempts += 1;
                if device == Path::new("/dev/nbd1") {
                    Ok(vec!["qemu-nbd".into()])
                } else {
                    fail(device)
                }
            },
        )
        .unwrap();

        assert_eq!(result.device, PathBuf::from("/dev/nbd1"));
        // nbd2 is never tried once nbd1 succeeds
        assert_eq!(attempts, 2);
    }

    #[test]
    fn test_bind_candidates_single_candidate_single_attempt() {
        let mut attempts = 0;
        let result = bind_candidates(vec!["/dev/nbd3".into()], |_| {
            attempts += 1;
            Ok(vec!["qemu-nbd".into(), "-c".into(), "/dev/nbd3".into()])
        })
        .unwrap();

        assert_eq!(attempts, 1);
        assert_eq!(result.device, PathBuf::from("/dev/nbd3"));
        assert_eq!(result.command.last().unwrap(), "/dev/nbd3");
    }

    #[test]
    fn test_bind_candidates_exhaustion() {
        let candidates: Vec<PathBuf> = vec!["/dev/nbd0".into(), "/dev/nbd1".into()];
        match bind_candidates(candidates.clone(), fail).unwrap_err() {
            ReconcileError::NoDeviceAvailable {
                attempted,
                last_error,
            } => {
                assert_eq!(attempted, candidates);
                assert!(last_error.unwrap().contains("/dev/nbd1: busy"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bind_candidates_none_available() {
        match bind_candidates(Vec::new(), fail).unwrap_err() {
            ReconcileError::NoDeviceAvailable {
                attempted,
                last_error,
            } => {
                assert!(attempted.is_empty());
                assert!(last_error.is_none());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_bind_first_available_no_nodes() {
        let dir = tempfile::tempdir().unwrap();
        match bind_first_available("/images/foo.qcow2", "qcow2", dir.path()).unwrap_err() {
            ReconcileError::NoDeviceNodesFound { prefix, dev_root } => {
                assert_eq!(prefix, "nbd");
                assert_eq!(dev_root, dir.path());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
