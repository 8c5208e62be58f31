//! pyproject.toml loading and rewriting

use crate::errors::ManifestError;
use std::fs;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::{debug, info};

pub const PYPROJECT_FILE: &str = "pyproject.toml";

/// Value written to `build-system.build-backend`
pub const BACKEND_MODULE: &str = "scikit_build_core";

/// Requirement appended to `build-system.requires`
pub const BACKEND_REQUIREMENT: &str = "scikit-build-core";

/// Build tools the backend replaces; dropped from `build-system.requires`
pub const DISPLACED_REQUIREMENTS: &[&str] = &["cmake", "ninja", "setuptools", "wheel", "poetry-core"];

/// A parsed pyproject.toml bound to the file it came from
#[derive(Debug, Clone)]
pub struct Pyproject {
    path: PathBuf,
    table: Table,
}

impl Pyproject {
    /// Map a project directory to its manifest; file paths pass through.
    pub fn resolve_path(path: &Path) -> PathBuf {
        if path.is_dir() {
            path.join(PYPROJECT_FILE)
        } else {
            path.to_path_buf()
        }
    }

    /// Load a manifest from a project directory or a manifest file
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let path = Self::resolve_path(path);
        debug!("Reading manifest from {:?}", path);
        let content = fs::read_to_string(&path)?;
        Self::parse(path, &content)
    }

    pub fn parse(path: PathBuf, content: &str) -> Result<Self, ManifestError> {
        let table: Table = toml::from_str(content)?;
        Ok(Self { path, table })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Look up a value by key path, e.g. `["tool", "poetry", "name"]`
    pub fn lookup(&self, keys: &[&str]) -> Result<&Value, ManifestError> {
        let missing = || ManifestError::MissingKey(keys.join("."));
        let (last, parents) = keys.split_last().ok_or_else(missing)?;

        let mut table = &self.table;
        for key in parents {
            table = table
                .get(*key)
                .and_then(Value::as_table)
                .ok_or_else(missing)?;
        }
        table.get(*last).ok_or_else(missing)
    }

    pub fn lookup_str(&self, keys: &[&str]) -> Result<&str, ManifestError> {
        self.lookup(keys)?
            .as_str()
            .ok_or_else(|| ManifestError::InvalidValue {
                key: keys.join("."),
                expected: "a string",
            })
    }

    /// `project.name`, as written by [`Pyproject::rewrite_for_backend`]
    pub fn project_name(&self) -> Result<&str, ManifestError> {
        self.lookup_str(&["project", "name"])
    }

    /// Point the manifest at scikit-build-core.
    ///
    /// Copies the Poetry name and version into `[project]`, sets the build
    /// backend and replaces displaced build tools in `build-system.requires`.
    /// Every other key is left untouched, so applying it twice is a no-op.
    pub fn rewrite_for_backend(&mut self) -> Result<(), ManifestError> {
        let name = self.lookup(&["tool", "poetry", "name"])?.clone();
        let version = self.lookup(&["tool", "poetry", "version"])?.clone();

        let project = subtable_mut(&mut self.table, "project")?;
        project.insert("name".to_string(), name);
        project.insert("version".to_string(), version);

        let build_system = subtable_mut(&mut self.table, "build-system")?;
        build_system.insert(
            "build-backend".to_string(),
            Value::String(BACKEND_MODULE.to_string()),
        );

        let existing = match build_system.get("requires") {
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                return Err(ManifestError::InvalidValue {
                    key: "build-system.requires".to_string(),
                    expected: "an array",
                })
            }
            None => Vec::new(),
        };
        build_system.insert("requires".to_string(), Value::Array(rewrite_requires(existing)));

        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, ManifestError> {
        Ok(toml::to_string(&self.table)?)
    }

    /// Write the manifest back to the file it was loaded from
    pub fn save(&self) -> Result<(), ManifestError> {
        fs::write(&self.path, self.to_toml_string()?)?;
        info!("Manifest written to {:?}", self.path);
        Ok(())
    }
}

/// Rewrite the manifest at `path` (a project directory or the file itself) in place
pub fn rewrite_pyproject(path: &Path) -> Result<(), ManifestError> {
    let mut pyproject = Pyproject::load(path)?;
    pyproject.rewrite_for_backend()?;
    pyproject.save()
}

fn subtable_mut<'a>(table: &'a mut Table, key: &str) -> Result<&'a mut Table, ManifestError> {
    table
        .entry(key.to_string())
        .or_insert(Value::Table(Table::new()))
        .as_table_mut()
        .ok_or_else(|| ManifestError::InvalidValue {
            key: key.to_string(),
            expected: "a table",
        })
}

fn rewrite_requires(existing: Vec<Value>) -> Vec<Value> {
    let mut requires: Vec<Value> = existing
        .into_iter()
        .filter(|item| {
            item.as_str().is_none_or(|req| {
                let name = requirement_name(req);
                !DISPLACED_REQUIREMENTS.contains(&name.as_str())
            })
        })
        .collect();

    let has_backend = requires
        .iter()
        .filter_map(Value::as_str)
        .any(|req| requirement_name(req) == BACKEND_REQUIREMENT);
    if !has_backend {
        requires.push(Value::String(BACKEND_REQUIREMENT.to_string()));
    }
    requires
}

/// Normalized distribution name of a requirement string
/// (`"Poetry_Core>=1.0"` -> `"poetry-core"`)
fn requirement_name(requirement: &str) -> String {
    requirement
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .map(|c| match c {
            '_' | '.' => '-',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
