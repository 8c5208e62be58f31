//! Centralized error types for the buildext CLI
//!
//! Every failure of a command ends up as a [`BuildExtError`], which the host
//! runner logs before exiting with a non-zero status.

use buildext_config::ConfigError;
use buildext_manifest::ManifestError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BuildExtError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Invalid arguments: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invariant violated: {0}")]
    Invariant(String),

    #[error("Command failed: {command} (exit {status:?})")]
    CommandFailed {
        command: String,
        status: Option<i32>,
    },

    #[error("Build backend error: {0}")]
    Backend(String),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}
