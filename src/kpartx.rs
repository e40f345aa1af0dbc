use std::path::{Path, PathBuf};

use log::info;

use crate::{
    constants::DEV_MAPPER_PATH, dependencies::Dependency, error::ReconcileError, exe::RunTool,
};

/// Creates device-mapper entries for every partition found in the given
/// disk image or block device, returning their /dev/mapper paths.
pub fn add(path: &Path) -> Result<Vec<PathBuf>, ReconcileError> {
    info!("Mapping partitions from '{}'", path.display());

    let output = Dependency::Kpartx
        .cmd()
        .arg("-s")
        .arg("-v")
        .arg("-a")
        .arg(path)
        .tool_output()?;

    Ok(parse_add_output(&output))
}

/// Destroys the device-mapper entries for the given disk image or block
/// device, returning the /dev/mapper paths that were removed.
pub fn remove(path: &Path) -> Result<Vec<PathBuf>, ReconcileError> {
    info!("Unmapping partitions of '{}'", path.display());

    let output = Dependency::Kpartx
        .cmd()
        .arg("-s")
        .arg("-v")
        .arg("-d")
        .arg(path)
        .tool_output()?;

    Ok(parse_remove_output(&output))
}

/// Add-mode records carry the mapping name as the first
/// whitespace-delimited field.
fn parse_add_output(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(|name| Path::new(DEV_MAPPER_PATH).join(name))
        .collect()
}

/// Remove-mode records differ from add-mode: the mapping name is the
/// last whitespace-delimited field.
fn parse_remove_output(output: &str) -> Vec<PathBuf> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().last())
        .map(|name| Path::new(DEV_MAPPER_PATH).join(name))
        .collect()
}
