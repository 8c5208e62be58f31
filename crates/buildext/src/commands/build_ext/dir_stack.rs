//! Working-directory stack for the build step
//!
//! The stack is owned by the command and never touches the process working
//! directory; callers hand [`DirStack::current`] to subprocesses explicitly.

use crate::errors::BuildExtError;
use buildext_logger as logger;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct DirStack {
    current: PathBuf,
    saved: Vec<PathBuf>,
}

impl DirStack {
    pub fn new(start: impl Into<PathBuf>) -> Self {
        Self {
            current: start.into(),
            saved: Vec::new(),
        }
    }

    pub fn current(&self) -> &Path {
        &self.current
    }

    /// Number of directories waiting to be restored
    pub fn depth(&self) -> usize {
        self.saved.len()
    }

    pub fn pushd(&mut self, dir: impl Into<PathBuf>) {
        let previous = std::mem::replace(&mut self.current, dir.into());
        self.saved.push(previous);
        logger::info(&format!("Switched to {}", self.current.display()));
    }

    /// Restore the directory saved by the matching [`DirStack::pushd`]
    pub fn popd(&mut self) -> Result<&Path, BuildExtError> {
        let previous = self.saved.pop().ok_or_else(|| {
            BuildExtError::Invariant("popd called with an empty directory stack".to_string())
        })?;
        self.current = previous;
        logger::info(&format!("Switched to {}", self.current.display()));
        Ok(&self.current)
    }
}
