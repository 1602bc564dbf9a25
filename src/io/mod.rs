pub mod output;
pub mod walker;

pub use output::{create_writer, JsonWriter, OutputWriter, TerminalWriter};
pub use walker::{find_java_files, FileWalker, JAVA_EXTENSION};

use crate::errors::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub fn read_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| Error::file_system("Failed to read file", path, e))
}

pub fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| Error::file_system("Failed to write file", path, e))
}

/// Sibling path the new contents are staged in before the rename.
fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.cwefix-tmp", name))
}

/// Replace `path` so readers see either the old or the new contents, never
/// a partial write. Permissions of the existing file are kept.
pub fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
    let staging = staging_path(path);
    let result = fs::write(&staging, content)
        .and_then(|()| match fs::metadata(path) {
            Ok(meta) => fs::set_permissions(&staging, meta.permissions()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        })
        .and_then(|()| fs::rename(&staging, path));
    if let Err(e) = result {
        let _ = fs::remove_file(&staging);
        return Err(Error::file_system("Failed to write file", path, e));
    }
    Ok(())
}

pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}
