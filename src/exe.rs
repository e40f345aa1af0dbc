use std::process::Command;

use log::trace;

use crate::{crate_private::Sealed, error::ReconcileError};

/// Extension for `std::process::Command` that runs an external tool to
/// completion, capturing its output, and converts a non-zero exit into a
/// `ToolInvocation` error carrying the exit code and both streams.
/// Sealed, so it cannot be implemented outside of this crate.
pub trait RunTool: Sealed {
    /// Run the tool and return its stdout on success.
    fn tool_output(&mut self) -> Result<String, ReconcileError>;

    /// Run the tool for its side effect only, checking the exit status.
    fn tool_check(&mut self) -> Result<(), ReconcileError>;

    /// Render the full invocation for logging.
    fn render_command(&self) -> String;
}

impl Sealed for Command {}

impl RunTool for Command {
    fn tool_output(&mut self) -> Result<String, ReconcileError> {
        let tool = self.get_program().to_string_lossy().into_owned();
        let rendered = self.render_command();

        trace!("Executing '{rendered}'");
        let output = self.output().map_err(|e| ReconcileError::ToolInvocation {
            tool: tool.clone(),
            code: None,
            stdout: String::new(),
            stderr: format!("failed to execute: {e}"),
        })?;
        trace!(
            "Executed '{rendered}', exit status: {:?}",
            output.status.code()
        );

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(ReconcileError::ToolInvocation {
                tool,
                code: output.status.code(),
                stdout,
                stderr,
            });
        }

        Ok(stdout)
    }

    fn tool_check(&mut self) -> Result<(), ReconcileError> {
        self.tool_output().map(|_| ())
    }

    fn render_command(&self) -> String {
        if self.get_args().count() == 0 {
            self.get_program().to_string_lossy().into()
        } else {
            format!(
                "{} {}",
                self.get_program().to_string_lossy(),
                self.get_args()
                    .map(|arg| arg.to_string_lossy())
                    .map(|arg| if arg.contains(' ') {
                        format!("'{}'", arg)
                    } else {
                        arg.into()
                    })
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_output_success() {
        let mut cmd = Command::new("echo");
        cmd.arg("something");
        assert_eq!(cmd.tool_output().unwrap(), "something\n");
    }

    #[test]
    fn test_tool_output_nonzero_exit() {
        let mut cmd = Command::new("cat");
        cmd.arg("/nonexistent_file_1234");
        match cmd.tool_output().unwrap_err() {
            ReconcileError::ToolInvocation {
                tool,
                code,
                stdout,
                stderr,
            } => {
                assert_eq!(tool, "cat");
                assert_eq!(code, Some(1));
                assert_eq!(stdout, "");
                assert!(stderr.contains("/nonexistent_file_1234"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_tool_output_missing_binary() {
        let mut cmd = Command::new("nonexistent_command_1234");
        cmd.arg("/nonexistent");
        match cmd.tool_output().unwrap_err() {
            ReconcileError::ToolInvocation { tool, code, .. } => {
                assert_eq!(tool, "nonexistent_command_1234");
                assert_eq!(code, None);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_render_command() {
        let mut cmd = Command::new("echo");
        cmd.arg("something");
        assert_eq!(cmd.render_command(), "echo something");

        let mut cmd = Command::new("echo");
        cmd.arg("something with spaces");
        assert_eq!(cmd.render_command(), "echo 'something with spaces'");

        assert_eq!(Command::new("echo").render_command(), "echo");
    }
}
