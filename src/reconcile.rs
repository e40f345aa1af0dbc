use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use log::debug;
use serde::Serialize;

use crate::{constants::DEV_ROOT_PATH, error::ReconcileError, kpartx, process, qemu_nbd};

/// Request to converge an NBD binding towards a desired state.
#[derive(Debug, Clone)]
pub struct NbdRequest {
    /// Path of the disk image to bind.
    pub name: String,
    /// Desired state: "present" or "absent".
    pub state: String,
    /// Image format passed to the binding tool.
    pub format: String,
    /// Bound on how long to wait for the binding process to exit.
    pub termination_timeout: Duration,
}

/// Request to converge the partition mappings of a disk image or block
/// device towards a desired state.
#[derive(Debug, Clone)]
pub struct PartitionsRequest {
    pub name: String,
    pub state: String,
}

/// Outcome of an NBD reconciliation.
#[derive(Debug, Serialize, PartialEq)]
pub struct NbdState {
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<PathBuf>,
    pub command: Vec<String>,
    pub shell_command: String,
}

/// Outcome of a partition-mapping reconciliation.
#[derive(Debug, Serialize, PartialEq)]
pub struct PartitionsState {
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub present: Option<Vec<PathBuf>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<Vec<PathBuf>>,
}

enum TargetState {
    Present,
    Absent,
}

/// Validated before any OS state is touched.
fn parse_state(state: &str) -> Result<TargetState, ReconcileError> {
    match state {
        "present" => Ok(TargetState::Present),
        "absent" => Ok(TargetState::Absent),
        other => Err(ReconcileError::InvalidState {
            state: other.into(),
        }),
    }
}

/// Converges an NBD binding to the requested state.
pub fn nbd(request: &NbdRequest) -> Result<NbdState, ReconcileError> {
    match parse_state(&request.state)? {
        TargetState::Present => nbd_present(request, Path::new(DEV_ROOT_PATH)),
        TargetState::Absent => nbd_absent(request),
    }
}

fn nbd_present(request: &NbdRequest, dev_root: &Path) -> Result<NbdState, ReconcileError> {
    // If a binding process for this image already exists, the image is
    // bound; report it unchanged instead of claiming a second device.
    if let Some(owner) = process::find_binding(&request.name)? {
        debug!(
            "'{}' is already bound by pid {}; nothing to do",
            request.name, owner.pid
        );
        return Ok(NbdState {
            changed: false,
            device: process::bound_device(&owner.cmdline),
            shell_command: owner.cmdline.join(" "),
            command: owner.cmdline,
        });
    }

    let bind = qemu_nbd::bind_first_available(&request.name, &request.format, dev_root)?;
    Ok(NbdState {
        changed: true,
        device: Some(bind.device),
        shell_command: bind.command.join(" "),
        command: bind.command,
    })
}

fn nbd_absent(request: &NbdRequest) -> Result<NbdState, ReconcileError> {
    let Some(owner) = process::find_binding(&request.name)? else {
        debug!("No binding process for '{}'; already absent", request.name);
        return Ok(NbdState {
            changed: false,
            device: None,
            command: Vec::new(),
            shell_command: String::new(),
        });
    };

    process::terminate(owner.pid, request.termination_timeout)?;
    Ok(NbdState {
        changed: true,
        device: process::bound_device(&owner.cmdline),
        shell_command: owner.cmdline.join(" "),
        command: owner.cmdline,
    })
}

/// Converges the partition mappings of a disk image or block device to
/// the requested state. Removing mappings that do not exist is an
/// idempotent no-op, not an error.
pub fn partitions(request: &PartitionsRequest) -> Result<PartitionsState, ReconcileError> {
    match parse_state(&request.state)? {
        TargetState::Present => {
            let present = kpartx::add(Path::new(&request.name))?;
            Ok(PartitionsState {
                changed: !present.is_empty(),
                present: Some(present),
                removed: None,
            })
        }
        TargetState::Absent => {
            let removed = kpartx::remove(Path::new(&request.name))?;
            Ok(PartitionsState {
                changed: !removed.is_empty(),
                present: None,
                removed: Some(removed),
            })
        }
    }
}
