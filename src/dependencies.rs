use std::{path::PathBuf, process::Command};

/// External tools this crate drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    Kpartx,
    QemuNbd,
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Dependency {
    /// Gets the name of the dependency.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Kpartx => "kpartx",
            Self::QemuNbd => "qemu-nbd",
        }
    }

    /// Checks if the dependency is present in the system.
    pub fn exists(&self) -> bool {
        self.path().is_ok()
    }

    /// Gets the path of the dependency.
    pub fn path(&self) -> Result<PathBuf, which::Error> {
        which::which(self.name())
    }

    /// Converts the dependency to a new Command instance.
    pub fn cmd(&self) -> Command {
        Command::new(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names() {
        assert_eq!(Dependency::Kpartx.name(), "kpartx");
        assert_eq!(Dependency::QemuNbd.name(), "qemu-nbd");
        assert_eq!(Dependency::QemuNbd.to_string(), "qemu-nbd");
    }

    #[test]
    fn test_cmd_program() {
        let cmd = Dependency::Kpartx.cmd();
        assert_eq!(cmd.get_program(), "kpartx");
    }

    #[test]
    fn test_path_resolution() {
        // The tools may or may not be installed on the test host;
        // either way exists() must agree with path(), and a resolved
        // path must point at the right binary.
        for dependency in [Dependency::Kpartx, Dependency::QemuNbd] {
            match dependency.path() {
                Ok(path) => {
                    assert!(dependency.exists());
                    assert_eq!(path.file_name().unwrap(), dependency.name());
                }
                Err(_) => assert!(!dependency.exists()),
            }
        }
    }
}
