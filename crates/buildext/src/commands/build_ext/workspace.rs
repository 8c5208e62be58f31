//! Temporary copy of the project used for the isolated build

use crate::errors::BuildExtError;
use buildext_logger as logger;
use std::fs;
use std::io;
use std::path::Path;
use tempfile::TempDir;
use walkdir::WalkDir;

/// Top-level entries never copied into the workspace.
/// A leading `*` matches by suffix.
pub const IGNORED_ENTRIES: &[&str] = &[".git", "__pycache__", "*.pyc", "venv", ".venv", "build"];

pub fn is_ignored(name: &str) -> bool {
    IGNORED_ENTRIES
        .iter()
        .any(|pattern| match pattern.strip_prefix('*') {
            Some(suffix) => name.ends_with(suffix),
            None => name == *pattern,
        })
}

pub fn create_workspace() -> io::Result<TempDir> {
    tempfile::Builder::new().prefix("build-ext-").tempdir()
}

/// Copy the top-level entries of `source` into `destination`, skipping
/// [`IGNORED_ENTRIES`]. Returns the number of entries copied.
pub fn copy_project(source: &Path, destination: &Path) -> Result<usize, BuildExtError> {
    let mut entries = fs::read_dir(source)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    let mut copied = 0;
    for entry in entries {
        let name = entry.file_name();
        let name_str = name.to_string_lossy();
        if is_ignored(&name_str) {
            logger::debug(&format!("Skipping {}", name_str));
            continue;
        }

        let path = entry.path();
        let target = destination.join(&name);
        if path.is_dir() {
            copy_tree(&path, &target)?;
        } else if path.is_file() {
            fs::copy(&path, &target)?;
        } else {
            logger::debug(&format!("Skipping non-regular entry {}", path.display()));
            continue;
        }
        copied += 1;
    }

    logger::debug(&format!(
        "Copied {} entries from {} to {}",
        copied,
        source.display(),
        destination.display()
    ));
    Ok(copied)
}

/// Recursively copy a directory, following symlinks
fn copy_tree(source: &Path, destination: &Path) -> Result<(), BuildExtError> {
    for entry in WalkDir::new(source).follow_links(true) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| BuildExtError::Invariant(e.to_string()))?;
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}
