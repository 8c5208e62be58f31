//! Copying compiled libraries from the workspace back into the project

use crate::errors::BuildExtError;
use buildext_logger as logger;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File suffixes of native libraries produced by the build
pub const NATIVE_SUFFIXES: &[&str] = &[".so", ".dll", ".pyd", ".dylib"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedArtifact {
    pub source: PathBuf,
    pub destination: PathBuf,
}

pub fn is_native_library(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            NATIVE_SUFFIXES
                .iter()
                .any(|suffix| suffix.strip_prefix('.') == Some(ext))
        })
}

/// Copy every native library under `built_dir` to `destination_dir`.
/// Symlinks are followed and the linked contents copied.
///
/// The destination is flat: nested libraries land directly in
/// `destination_dir`, and a later file with the same name replaces an
/// earlier one.
pub fn collect_artifacts(
    built_dir: &Path,
    destination_dir: &Path,
) -> Result<Vec<CollectedArtifact>, BuildExtError> {
    if !built_dir.is_dir() {
        logger::warn(&format!(
            "No built package directory at {}",
            built_dir.display()
        ));
        return Ok(Vec::new());
    }

    let mut collected = Vec::new();
    for entry in WalkDir::new(built_dir)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_native_library(entry.path()) {
            continue;
        }

        fs::create_dir_all(destination_dir)?;
        let destination = destination_dir.join(entry.file_name());
        fs::copy(entry.path(), &destination)?;
        logger::info(&format!(
            "Copied built binary lib: {} -> {}",
            entry.path().display(),
            destination.display()
        ));

        collected.push(CollectedArtifact {
            source: entry.path().to_path_buf(),
            destination,
        });
    }
    Ok(collected)
}
