use std::path::PathBuf;

use serde::Serialize;

/// Structured failure surfaced by a reconciliation call. Every variant
/// carries the context needed to diagnose the failure without re-running
/// the operation; none is downgraded or swallowed on the way up.
#[derive(Debug, thiserror::Error, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case", tag = "kind", rename_all_fields = "kebab-case")]
pub enum ReconcileError {
    #[error("state must be 'present' or 'absent', got '{state}'")]
    InvalidState { state: String },

    #[error("'{tool}' finished unsuccessfully with exit code {code:?}\nstdout:\n{stdout}\nstderr:\n{stderr}")]
    ToolInvocation {
        tool: String,
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("no '{prefix}*' device nodes found under '{}'; is the kernel module loaded?", .dev_root.display())]
    NoDeviceNodesFound { prefix: String, dev_root: PathBuf },

    #[error("no free device could be bound ({} attempted)", .attempted.len())]
    NoDeviceAvailable {
        attempted: Vec<PathBuf>,
        last_error: Option<String>,
    },

    #[error("permission denied signalling pid {pid}")]
    PermissionDenied { pid: i32 },

    #[error("pid {pid} still alive after {waited_secs}s")]
    TerminationTimeout { pid: i32, waited_secs: u64 },

    #[error("{context}: {error}")]
    Io { context: String, error: String },
}

impl ReconcileError {
    pub fn io(context: impl Into<String>, error: impl std::fmt::Display) -> Self {
        ReconcileError::Io {
            context: context.into(),
            error: error.to_string(),
        }
    }
}
