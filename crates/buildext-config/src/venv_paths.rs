//! Interpreter lookup inside Python virtual environments
//!
//! Used to pick the Python that runs the build backend when the project (or
//! the caller's shell) already has a virtual environment set up.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// "Scripts" on Windows, "bin" on Unix
#[cfg(windows)]
pub const PYTHON_BIN_DIR: &str = "Scripts";
#[cfg(not(windows))]
pub const PYTHON_BIN_DIR: &str = "bin";

#[cfg(not(windows))]
const PYTHON_EXE_CANDIDATES: &[&str] = &["python3", "python"];
#[cfg(windows)]
const PYTHON_EXE_CANDIDATES: &[&str] = &["python.exe", "python3.exe"];

#[derive(Debug, Clone, Error)]
pub enum VenvPathError {
    #[error("Virtual environment not found: {}", .0.display())]
    VenvNotFound(PathBuf),

    #[error("{0}")]
    PathResolution(String),
}

/// Resolve the Python executable of a virtual environment
///
/// - **Unix/macOS**: `<venv>/bin/python3` or `<venv>/bin/python`
/// - **Windows**: `<venv>/Scripts/python.exe`
///
/// Falls back to any python-like file in the bin directory.
pub fn resolve_python_exe(venv_path: &Path) -> Result<PathBuf, VenvPathError> {
    if !venv_path.is_dir() {
        return Err(VenvPathError::VenvNotFound(venv_path.to_path_buf()));
    }

    let bin_dir = venv_path.join(PYTHON_BIN_DIR);
    if !bin_dir.is_dir() {
        return Err(VenvPathError::PathResolution(format!(
            "bin directory not found: {}",
            bin_dir.display()
        )));
    }

    if let Some(candidate) = PYTHON_EXE_CANDIDATES
        .iter()
        .map(|exe| bin_dir.join(exe))
        .find(|candidate| candidate.is_file())
    {
        return Ok(candidate);
    }

    let fallback = fs::read_dir(&bin_dir).ok().and_then(|entries| {
        entries.filter_map(|e| e.ok()).map(|e| e.path()).find(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| name.starts_with("python"))
        })
    });

    fallback.ok_or_else(|| {
        VenvPathError::PathResolution(format!(
            "Python executable not found in {}",
            bin_dir.display()
        ))
    })
}
