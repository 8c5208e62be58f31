use std::io;
use thiserror::Error;

/// Errors that can occur while reading or rewriting a project manifest
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse manifest: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Missing key '{0}' in pyproject.toml")]
    MissingKey(String),

    #[error("Key '{key}' in pyproject.toml must be {expected}")]
    InvalidValue { key: String, expected: &'static str },
}
