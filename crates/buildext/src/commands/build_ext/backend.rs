//! Build backend invocation
//!
//! The default backend runs the hook of a Python build module
//! (`scikit_build_core.build` unless configured otherwise) in a subprocess
//! whose working directory is the project being built.

use super::target::BuildTarget;
use crate::errors::BuildExtError;
use buildext_config::Config;
use buildext_logger as logger;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Something that can turn a project directory into a distribution
pub trait BuildBackend {
    /// Build `target` for the project in `project_dir`, writing into
    /// `output_dir` (relative paths are taken from `project_dir`).
    /// Returns the file name of the produced distribution.
    fn build(
        &self,
        target: BuildTarget,
        project_dir: &Path,
        output_dir: &Path,
    ) -> Result<String, BuildExtError>;

    /// Short human-readable name for log messages
    fn describe(&self) -> String;
}

/// Runs the backend module's hooks with a Python interpreter
#[derive(Debug, Clone)]
pub struct PythonBackend {
    python: PathBuf,
    module: String,
}

impl PythonBackend {
    pub fn new(python: impl Into<PathBuf>, module: impl Into<String>) -> Self {
        Self {
            python: python.into(),
            module: module.into(),
        }
    }

    /// Backend using the configured module and the interpreter resolved for `project_dir`
    pub fn from_config(config: &Config, project_dir: &Path) -> Result<Self, BuildExtError> {
        let python = config.resolve_python(project_dir)?;
        logger::debug(&format!("Using Python interpreter: {}", python.display()));
        Ok(Self::new(python, config.backend_module()))
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    /// Script calling the hook and writing the returned file name to `outfile`
    fn script(&self, target: BuildTarget, output_dir: &Path, outfile: &Path) -> String {
        format!(
            r#"from {module} import {hook} as hook

filename = hook("{output}")
with open("{outfile}", "w") as fp:
    fp.write(filename)
"#,
            module = self.module,
            hook = target.hook_name(),
            output = escape_path_for_python(output_dir),
            outfile = escape_path_for_python(outfile),
        )
    }
}

impl BuildBackend for PythonBackend {
    fn build(
        &self,
        target: BuildTarget,
        project_dir: &Path,
        output_dir: &Path,
    ) -> Result<String, BuildExtError> {
        // The hook result goes through a file; stdout belongs to the build tools.
        let hook_dir = tempfile::Builder::new()
            .prefix("build-ext-hook-")
            .tempdir()?;
        let outfile = hook_dir.path().join(format!("{}.txt", target.hook_name()));
        let script = self.script(target, output_dir, &outfile);

        let command_name = format!(
            "{} -c {}.{}(\"{}\")",
            self.python.display(),
            self.module,
            target.hook_name(),
            output_dir.display()
        );
        debug!(
            "Calling `{}.{}` in {:?}",
            self.module,
            target.hook_name(),
            project_dir
        );
        logger::debug(&format!("Running: {}", command_name));

        let output = Command::new(&self.python)
            .args(["-c", &script])
            .current_dir(project_dir)
            .env("PYTHONIOENCODING", "utf-8:backslashreplace")
            .output()?;
        logger::capture_output(&command_name, &output);

        if !output.status.success() {
            return Err(BuildExtError::CommandFailed {
                command: command_name,
                status: output.status.code(),
            });
        }

        let filename = fs::read_to_string(&outfile).map_err(|e| {
            BuildExtError::Backend(format!(
                "`{}.{}` did not report a distribution: {}",
                self.module,
                target.hook_name(),
                e
            ))
        })?;
        Ok(filename.trim().to_string())
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.module, self.python.display())
    }
}

fn escape_path_for_python(path: &Path) -> String {
    path.to_string_lossy()
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
}
