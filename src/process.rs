use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use log::{debug, info};
use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::Pid,
};

use crate::{
    constants::TERMINATION_POLL_INTERVAL, dependencies::Dependency, error::ReconcileError,
};

/// A live binding process discovered in the process table. The pid is
/// invalidated the instant the process exits and may be reused by the
/// OS afterwards; callers must not retain it past a termination cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct OwningProcess {
    pub pid: i32,
    pub cmdline: Vec<String>,
}

/// Scans the process table for the binding process serving `image`.
/// Returns the first match; `None` is the steady-state "already absent"
/// case, not an error.
pub fn find_binding(image: &str) -> Result<Option<OwningProcess>, ReconcileError> {
    let processes = procfs::process::all_processes()
        .map_err(|e| ReconcileError::io("Failed to enumerate the process table", e))?;

    for process in processes.flatten() {
        // A process can exit between enumeration and the cmdline read;
        // skip it rather than failing the scan.
        let Ok(cmdline) = process.cmdline() else {
            continue;
        };
        if !matches_binding(&cmdline, image) {
            continue;
        }
        debug!("Found binding process for '{image}': pid {}", process.pid());
        return Ok(Some(OwningProcess {
            pid: process.pid(),
            cmdline,
        }));
    }

    Ok(None)
}

/// A process owns a binding when its first argument names the binding
/// tool executable and its last argument is the image name, exactly.
fn matches_binding(cmdline: &[String], image: &str) -> bool {
    let Some(first) = cmdline.first() else {
        return false;
    };
    if Path::new(first).file_name() != Some(OsStr::new(Dependency::QemuNbd.name())) {
        return false;
    }
    cmdline.last().map(|last| last == image).unwrap_or(false)
}

/// Extracts the device the binding process attached, from the argument
/// following `-c` in its invocation.
pub fn bound_device(cmdline: &[String]) -> Option<PathBuf> {
    cmdline
        .windows(2)
        .find(|pair| pair[0] == "-c")
        .map(|pair| PathBuf::from(&pair[1]))
}

/// Sends SIGTERM to `pid` and polls until the process no longer exists.
/// A process that is already gone counts as terminated. Permission
/// errors fail immediately, both on the initial signal and during
/// polling. The poll is bounded by `deadline`; exceeding it fails with
/// a distinct `TerminationTimeout`.
pub fn terminate(pid: i32, deadline: Duration) -> Result<(), ReconcileError> {
    info!("Sending SIGTERM to pid {pid}");
    match signal::kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => {}
        Err(Errno::ESRCH) => return Ok(()),
        Err(Errno::EPERM) => return Err(ReconcileError::PermissionDenied { pid }),
        Err(e) => return Err(ReconcileError::io(format!("Failed to signal pid {pid}"), e)),
    }

    let start = Instant::now();
    loop {
        // Zero-effect existence probe.
        match signal::kill(Pid::from_raw(pid), None) {
            Ok(()) => {}
            Err(Errno::ESRCH) => {
                debug!("Pid {pid} has exited");
                return Ok(());
            }
            Err(Errno::EPERM) => return Err(ReconcileError::PermissionDenied { pid }),
            Err(e) => return Err(ReconcileError::io(format!("Failed to probe pid {pid}"), e)),
        }

        if start.elapsed() >= deadline {
            return Err(ReconcileError::TerminationTimeout {
                pid,
                waited_secs: start.elapsed().as_secs(),
            });
        }

        thread::sleep(TERMINATION_POLL_INTERVAL);
    }
}
