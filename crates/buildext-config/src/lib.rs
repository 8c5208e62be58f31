//! Configuration for the buildext CLI
//!
//! The configuration lives in a small TOML file (by default
//! `~/.config/buildext/buildext.toml`, overridable through `BUILDEXT_CONFIG`)
//! and controls which interpreter runs the build backend, which backend
//! module is used, and the default for keeping the temporary workspace.

pub mod venv_paths;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use which::which;

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "BUILDEXT_CONFIG";

/// Module providing the PEP 517 style build hooks
pub const DEFAULT_BACKEND_MODULE: &str = "scikit_build_core.build";

/// Keys accepted by [`Config::get`] and [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &["python", "backend", "keep-tmp"];

/// Interpreter names searched on `PATH` as a last resort
const PATH_INTERPRETERS: &[&str] = &["python3", "python"];

/// Virtual environment directory names probed inside the project
const PROJECT_VENV_DIRS: &[&str] = &[".venv", "venv"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Could not determine the configuration directory")]
    NoConfigDir,

    #[error("Unknown config key: {0}. Supported keys: python, backend, keep-tmp")]
    UnknownKey(String),

    #[error("Invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },

    #[error("No Python interpreter found: {0}")]
    InterpreterNotFound(String),
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_tmp: Option<bool>,
}

impl Config {
    /// Resolve the config file path.
    ///
    /// `BUILDEXT_CONFIG` wins when set and non-empty.
    pub fn path() -> Result<PathBuf, ConfigError> {
        if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
            let trimmed = env_path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        #[cfg(not(target_os = "windows"))]
        let default = dirs::home_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join(".config")
            .join("buildext")
            .join("buildext.toml");

        #[cfg(target_os = "windows")]
        let default = dirs::config_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join("buildext")
            .join("buildext.toml");

        Ok(default)
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// Load from an explicit path; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        match key {
            "python" => Ok(self.python.clone()),
            "backend" => Ok(self.backend.clone()),
            "keep-tmp" => Ok(self.keep_tmp.map(|v| v.to_string())),
            _ => Err(ConfigError::UnknownKey(key.to_string())),
        }
    }

    pub fn set(&mut self, key: &str, value: String) -> Result<(), ConfigError> {
        match key {
            "python" => self.python = Some(value),
            "backend" => self.backend = Some(value),
            "keep-tmp" => {
                let parsed = value
                    .parse::<bool>()
                    .map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value,
                    })?;
                self.keep_tmp = Some(parsed);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.python.is_none() && self.backend.is_none() && self.keep_tmp.is_none()
    }

    pub fn values_iter(&self) -> Vec<(&str, String)> {
        let mut values = Vec::new();
        if let Some(ref val) = self.python {
            values.push(("python", val.clone()));
        }
        if let Some(ref val) = self.backend {
            values.push(("backend", val.clone()));
        }
        if let Some(val) = self.keep_tmp {
            values.push(("keep-tmp", val.to_string()));
        }
        values
    }

    /// Backend hook module, falling back to scikit-build-core
    pub fn backend_module(&self) -> &str {
        self.backend.as_deref().unwrap_or(DEFAULT_BACKEND_MODULE)
    }

    pub fn keep_tmp_default(&self) -> bool {
        self.keep_tmp.unwrap_or(false)
    }

    /// Resolve the interpreter used to run the backend for `project_dir`,
    /// honouring `$VIRTUAL_ENV`.
    pub fn resolve_python(&self, project_dir: &Path) -> Result<PathBuf, ConfigError> {
        let virtual_env = std::env::var_os("VIRTUAL_ENV").map(PathBuf::from);
        self.resolve_python_with(project_dir, virtual_env.as_deref())
    }

    /// Interpreter resolution order:
    /// 1. configured `python`
    /// 2. the active virtual environment
    /// 3. `.venv` or `venv` inside the project
    /// 4. `python3` / `python` on `PATH`
    pub fn resolve_python_with(
        &self,
        project_dir: &Path,
        virtual_env: Option<&Path>,
    ) -> Result<PathBuf, ConfigError> {
        if let Some(ref python) = self.python {
            let candidate = PathBuf::from(python);
            if candidate.is_file() {
                return Ok(candidate);
            }
            return which(python).map_err(|_| {
                ConfigError::InterpreterNotFound(format!("configured python '{}'", python))
            });
        }

        let venvs = virtual_env
            .map(Path::to_path_buf)
            .into_iter()
            .chain(PROJECT_VENV_DIRS.iter().map(|name| project_dir.join(name)));
        for venv in venvs {
            if let Ok(python) = venv_paths::resolve_python_exe(&venv) {
                return Ok(python);
            }
        }

        PATH_INTERPRETERS
            .iter()
            .find_map(|name| which(name).ok())
            .ok_or_else(|| {
                ConfigError::InterpreterNotFound(
                    "no virtual environment and no python3/python on PATH".to_string(),
                )
            })
    }
}
