//! Project manifest handling
//!
//! Loads a Poetry-managed `pyproject.toml`, reads values by dotted key path and
//! rewrites the `[project]` and `[build-system]` tables so that the project
//! builds with scikit-build-core instead of its original backend.

pub mod errors;
pub mod pyproject;

pub use errors::ManifestError;
pub use pyproject::{
    rewrite_pyproject, Pyproject, BACKEND_MODULE, BACKEND_REQUIREMENT, DISPLACED_REQUIREMENTS,
    PYPROJECT_FILE,
};
