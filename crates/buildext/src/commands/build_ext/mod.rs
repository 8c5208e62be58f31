//! The `build-ext` command
//!
//! A run moves through `idle → initialized → built → collected → cleaned`:
//! the project is copied into a temporary workspace, its pyproject.toml is
//! rewritten for scikit-build-core, the backend builds the requested
//! distributions, compiled libraries are copied back into the project
//! package, and the workspace is removed unless it should be kept.

pub mod arguments;
pub mod backend;
pub mod collect;
pub mod dir_stack;
pub mod target;
pub mod workspace;

use crate::errors::BuildExtError;
use crate::registry::{Application, ApplicationPlugin, HostCommand};
use crate::GlobalOpts;
use arguments::{command_definition, BuildArguments, BUILD_OPTIONS};
use backend::{BuildBackend, PythonBackend};
use buildext_config::Config;
use buildext_logger as logger;
use buildext_manifest::{rewrite_pyproject, Pyproject};
use clap::{ArgMatches, Command};
use collect::{collect_artifacts, CollectedArtifact};
use dir_stack::DirStack;
use std::fmt;
use std::path::{Path, PathBuf};
use target::BuildTarget;
use tempfile::TempDir;

pub const BUILD_EXT_COMMAND: &str = "build-ext";

/// Output directory handed to the backend, relative to the workspace
pub const DIST_DIR: &str = "dist";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Idle,
    Initialized,
    Built,
    Collected,
    Cleaned,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::Idle => "idle",
            BuildState::Initialized => "initialized",
            BuildState::Built => "built",
            BuildState::Collected => "collected",
            BuildState::Cleaned => "cleaned",
        };
        f.write_str(name)
    }
}

/// Outcome of a complete run
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// File names of the distributions the backend produced
    pub distributions: Vec<String>,
    pub artifacts: Vec<CollectedArtifact>,
    /// Set when the workspace was kept on disk
    pub kept_workspace: Option<PathBuf>,
}

pub struct BuildExt {
    project_dir: Option<PathBuf>,
    backend: Option<Box<dyn BuildBackend>>,
    workspace: Option<TempDir>,
    dirs: DirStack,
    state: BuildState,
}

impl Default for BuildExt {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildExt {
    pub fn new() -> Self {
        Self {
            project_dir: None,
            backend: None,
            workspace: None,
            dirs: DirStack::default(),
            state: BuildState::Idle,
        }
    }

    /// Build this project instead of the current working directory
    pub fn with_project_dir(mut self, project_dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(project_dir.into());
        self
    }

    /// Use `backend` instead of resolving a Python backend from the config
    pub fn with_backend(mut self, backend: impl BuildBackend + 'static) -> Self {
        self.backend = Some(Box::new(backend));
        self
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn workspace_path(&self) -> Option<&Path> {
        self.workspace.as_ref().map(TempDir::path)
    }

    fn resolve_project_dir(&mut self) -> Result<PathBuf, BuildExtError> {
        if let Some(ref dir) = self.project_dir {
            return Ok(dir.clone());
        }
        let dir = std::env::current_dir()?;
        self.project_dir = Some(dir.clone());
        Ok(dir)
    }

    fn expect_state(&self, expected: BuildState, step: &str) -> Result<(), BuildExtError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(BuildExtError::Invariant(format!(
                "cannot {} while {} (expected {})",
                step, self.state, expected
            )))
        }
    }

    fn require_workspace(&self) -> Result<PathBuf, BuildExtError> {
        self.workspace_path()
            .map(Path::to_path_buf)
            .ok_or_else(|| BuildExtError::Invariant("no temporary workspace".to_string()))
    }

    /// Copy the project into a fresh workspace and rewrite its manifest
    pub fn initialize(&mut self) -> Result<PathBuf, BuildExtError> {
        self.expect_state(BuildState::Idle, "initialize")?;
        let project_dir = self.resolve_project_dir()?;

        let workspace = workspace::create_workspace()?;
        let workspace_path = workspace.path().to_path_buf();
        self.workspace = Some(workspace);
        logger::info(&format!(
            "Using temporary directory: {}",
            workspace_path.display()
        ));

        workspace::copy_project(&project_dir, &workspace_path)?;
        rewrite_pyproject(&workspace_path)?;

        self.dirs = DirStack::new(project_dir);
        self.state = BuildState::Initialized;
        Ok(workspace_path)
    }

    /// Run the backend for every target inside the workspace
    pub fn build(&mut self, targets: &[BuildTarget]) -> Result<Vec<String>, BuildExtError> {
        self.expect_state(BuildState::Initialized, "build")?;
        let workspace = self.require_workspace()?;
        let backend = self
            .backend
            .as_deref()
            .ok_or_else(|| BuildExtError::Invariant("no build backend configured".to_string()))?;

        self.dirs.pushd(workspace);
        let result = build_targets(backend, targets, self.dirs.current());
        self.dirs.popd()?;

        let distributions = result?;
        self.state = BuildState::Built;
        Ok(distributions)
    }

    /// Copy native libraries from the built package back into the project
    pub fn collect(&mut self) -> Result<Vec<CollectedArtifact>, BuildExtError> {
        self.expect_state(BuildState::Built, "collect")?;
        let workspace = self.require_workspace()?;
        let project_dir = self.resolve_project_dir()?;

        let pyproject = Pyproject::load(&workspace)?;
        let project_name = pyproject.project_name()?;

        let artifacts = collect_artifacts(
            &workspace.join(project_name),
            &project_dir.join(project_name),
        )?;
        self.state = BuildState::Collected;
        Ok(artifacts)
    }

    /// Remove the workspace unless `keep_tmp`; returns the kept path.
    /// Calling it again, or without a workspace, does nothing.
    pub fn cleanup(&mut self, keep_tmp: bool) -> Result<Option<PathBuf>, BuildExtError> {
        let Some(workspace) = self.workspace.take() else {
            return Ok(None);
        };
        self.state = BuildState::Cleaned;

        if keep_tmp {
            let path = workspace.keep();
            logger::info(&format!("Kept temporary directory: {}", path.display()));
            return Ok(Some(path));
        }

        let path = workspace.path().to_path_buf();
        workspace.close()?;
        logger::info(&format!("Removed temporary directory: {}", path.display()));
        Ok(None)
    }

    /// Run every step; on failure the workspace is left on disk for inspection
    pub fn execute(&mut self, args: &BuildArguments) -> Result<BuildReport, BuildExtError> {
        let targets = args.targets()?;
        let result = self.run_steps(args, &targets);
        if result.is_err() {
            if let Some(workspace) = self.workspace.take() {
                let path = workspace.keep();
                logger::warn(&format!(
                    "Build failed; temporary directory left at {}",
                    path.display()
                ));
            }
        }
        result
    }

    fn run_steps(
        &mut self,
        args: &BuildArguments,
        targets: &[BuildTarget],
    ) -> Result<BuildReport, BuildExtError> {
        self.initialize()?;
        let distributions = self.build(targets)?;
        let artifacts = self.collect()?;
        let kept_workspace = self.cleanup(args.keep_tmp)?;
        Ok(BuildReport {
            distributions,
            artifacts,
            kept_workspace,
        })
    }
}

fn build_targets(
    backend: &dyn BuildBackend,
    targets: &[BuildTarget],
    project_dir: &Path,
) -> Result<Vec<String>, BuildExtError> {
    let mut distributions = Vec::with_capacity(targets.len());
    for target in targets {
        logger::step(&format!("Building {} with {}", target, backend.describe()));
        logger::spinner_start(&format!("Building {}...", target));

        let filename = match backend.build(*target, project_dir, Path::new(DIST_DIR)) {
            Ok(filename) => filename,
            Err(e) => {
                logger::spinner_error(&format!("Failed to build {}", target));
                return Err(e);
            }
        };

        if !project_dir.join(DIST_DIR).join(&filename).is_file() {
            logger::spinner_error(&format!("Failed to build {}", target));
            return Err(BuildExtError::Backend(format!(
                "{} reported {} but it was not written to {}",
                target.hook_name(),
                filename,
                DIST_DIR
            )));
        }

        logger::spinner_success(&format!("Built {}", filename));
        distributions.push(filename);
    }
    Ok(distributions)
}

impl HostCommand for BuildExt {
    fn definition(&self) -> Command {
        command_definition(BUILD_EXT_COMMAND, BUILD_OPTIONS)
    }

    fn handle(&mut self, matches: &ArgMatches, _opts: &GlobalOpts) -> Result<(), BuildExtError> {
        let mut args = BuildArguments::from_matches(matches)?;
        args.targets()?;
        let config = Config::load()?;
        args.keep_tmp |= config.keep_tmp_default();

        if self.backend.is_none() {
            let project_dir = self.resolve_project_dir()?;
            self.backend = Some(Box::new(PythonBackend::from_config(&config, &project_dir)?));
        }

        let report = self.execute(&args)?;
        logger::success(&format!(
            "Built {} distribution(s), copied {} native librar{}",
            report.distributions.len(),
            report.artifacts.len(),
            if report.artifacts.len() == 1 { "y" } else { "ies" }
        ));
        if let Some(path) = report.kept_workspace {
            logger::success(&format!("Temporary directory kept at {}", path.display()));
        }
        Ok(())
    }
}

pub fn build_ext_factory() -> Box<dyn HostCommand> {
    Box::new(BuildExt::new())
}

/// Registers `build-ext` with the host application
pub struct BuildExtPlugin;

impl ApplicationPlugin for BuildExtPlugin {
    fn activate(&self, application: &mut Application) {
        application
            .command_loader
            .register_factory(BUILD_EXT_COMMAND, build_ext_factory);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::fs;
    use std::rc::Rc;

    const PYPROJECT: &str = r#"[tool.poetry]
name = "hello_world"
version = "0.1.0"
description = "Sample native extension"

[tool.poetry.dependencies]
python = "^3.11"

[build-system]
requires = ["poetry-core>=1.0.0", "cmake"]
build-backend = "poetry.core.masonry.api"
"#;

    const LIBRARY: &str = "_ext.cpython-312-x86_64-linux-gnu.so";

    /// Pretends to compile: writes a wheel into the output dir and a shared
    /// library plus an object file into the package.
    #[derive(Clone, Default)]
    struct FakeBackend {
        calls: Rc<RefCell<Vec<(BuildTarget, PathBuf)>>>,
        fail: bool,
    }

    impl BuildBackend for FakeBackend {
        fn build(
            &self,
            target: BuildTarget,
            project_dir: &Path,
            output_dir: &Path,
        ) -> Result<String, BuildExtError> {
            self.calls
                .borrow_mut()
                .push((target, project_dir.to_path_buf()));
            if self.fail {
                return Err(BuildExtError::CommandFailed {
                    command: "fake".to_string(),
                    status: Some(1),
                });
            }

            let pyproject = Pyproject::load(project_dir)?;
            let backend = pyproject.lookup_str(&["build-system", "build-backend"])?;
            if backend != "scikit_build_core" {
                return Err(BuildExtError::Backend(format!("unexpected backend {}", backend)));
            }

            let package = project_dir.join("hello_world");
            fs::create_dir_all(package.join("build"))?;
            fs::write(package.join(LIBRARY), b"\x7fELF")?;
            fs::write(package.join("build").join("ext.o"), b"obj")?;

            let dist = project_dir.join(output_dir);
            fs::create_dir_all(&dist)?;
            let filename = format!("hello_world-0.1.0-{}.whl", target);
            fs::write(dist.join(&filename), b"PK")?;
            Ok(filename)
        }

        fn describe(&self) -> String {
            "fake".to_string()
        }
    }

    fn sample_project() -> Result<TempDir, BuildExtError> {
        let project = TempDir::new()?;
        let root = project.path();
        fs::write(root.join("pyproject.toml"), PYPROJECT)?;
        fs::write(root.join("CMakeLists.txt"), "python_add_library(_ext ext.cpp)\n")?;
        fs::create_dir_all(root.join("hello_world"))?;
        fs::write(root.join("hello_world").join("__init__.py"), "")?;
        fs::write(root.join("hello_world").join("ext.cpp"), "int answer() { return 42; }\n")?;
        fs::create_dir_all(root.join(".git"))?;
        fs::write(root.join(".git").join("HEAD"), "ref: refs/heads/main\n")?;
        Ok(project)
    }

    fn package_files(project: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(project.join("hello_world"))
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.file_name().to_string_lossy().to_string())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }

    #[test]
    fn test_end_to_end_collects_one_library() -> Result<(), BuildExtError> {
        let project = sample_project()?;
        let backend = FakeBackend::default();
        let mut command = BuildExt::new()
            .with_project_dir(project.path())
            .with_backend(backend.clone());

        let report = command.execute(&BuildArguments::default())?;

        assert_eq!(report.distributions, vec!["hello_world-0.1.0-wheel.whl"]);
        assert_eq!(report.artifacts.len(), 1);
        assert_eq!(
            report.artifacts[0].destination,
            project.path().join("hello_world").join(LIBRARY)
        );
        assert_eq!(
            package_files(project.path()),
            vec!["__init__.py", LIBRARY, "ext.cpp"]
        );
        assert!(report.kept_workspace.is_none());
        assert_eq!(command.state(), BuildState::Cleaned);

        let calls = backend.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, BuildTarget::Wheel);
        assert!(!calls[0].1.exists(), "workspace should be removed");

        // The source manifest is never rewritten
        assert_eq!(fs::read_to_string(project.path().join("pyproject.toml"))?, PYPROJECT);
        Ok(())
    }

    #[test]
    fn test_keep_tmp_leaves_workspace() -> Result<(), BuildExtError> {
        let project = sample_project()?;
        let mut command = BuildExt::new()
            .with_project_dir(project.path())
            .with_backend(FakeBackend::default());

        let args = BuildArguments {
            keep_tmp: true,
            ..Default::default()
        };
        let report = command.execute(&args)?;

        let kept = report.kept_workspace.ok_or_else(|| {
            BuildExtError::Invariant("workspace was not kept".to_string())
        })?;
        assert!(kept.join("pyproject.toml").is_file());
        assert!(kept.join("dist").join("hello_world-0.1.0-wheel.whl").is_file());
        assert!(!kept.join(".git").exists());
        fs::remove_dir_all(&kept)?;
        Ok(())
    }

    #[test]
    fn test_steps_in_order() -> Result<(), BuildExtError> {
        let project = sample_project()?;
        let mut command = BuildExt::new()
            .with_project_dir(project.path())
            .with_backend(FakeBackend::default());
        assert_eq!(command.state(), BuildState::Idle);

        assert!(matches!(command.collect(), Err(BuildExtError::Invariant(_))));

        let workspace = command.initialize()?;
        assert_eq!(command.state(), BuildState::Initialized);
        let rewritten = Pyproject::load(&workspace)?;
        assert_eq!(rewritten.project_name()?, "hello_world");
        assert_eq!(rewritten.lookup_str(&["project", "version"])?, "0.1.0");

        command.build(&[BuildTarget::Wheel, BuildTarget::Sdist])?;
        assert_eq!(command.state(), BuildState::Built);
        assert!(workspace.join("dist").join("hello_world-0.1.0-sdist.whl").is_file());

        command.collect()?;
        assert_eq!(command.state(), BuildState::Collected);

        assert_eq!(command.cleanup(false)?, None);
        assert!(!workspace.exists());
        assert_eq!(command.cleanup(false)?, None);
        assert_eq!(command.state(), BuildState::Cleaned);
        Ok(())
    }

    #[test]
    fn test_failed_build_keeps_workspace() -> Result<(), BuildExtError> {
        let project = sample_project()?;
        let backend = FakeBackend {
            fail: true,
            ..Default::default()
        };
        let mut command = BuildExt::new()
            .with_project_dir(project.path())
            .with_backend(backend.clone());

        let result = command.execute(&BuildArguments::default());
        assert!(matches!(result, Err(BuildExtError::CommandFailed { .. })));
        assert!(command.workspace_path().is_none());

        let workspace = backend
            .calls
            .borrow()
            .first()
            .map(|(_, dir)| dir.clone())
            .ok_or_else(|| BuildExtError::Invariant("backend not called".to_string()))?;
        assert!(workspace.join("pyproject.toml").is_file());
        assert!(package_files(project.path()).iter().all(|f| f != LIBRARY));
        fs::remove_dir_all(&workspace)?;
        Ok(())
    }

    #[test]
    fn test_missing_poetry_metadata_fails_before_build() -> Result<(), BuildExtError> {
        let project = TempDir::new()?;
        fs::write(project.path().join("pyproject.toml"), "[tool.poetry]\nname = \"x\"\n")?;
        let backend = FakeBackend::default();
        let mut command = BuildExt::new()
            .with_project_dir(project.path())
            .with_backend(backend.clone());

        let result = command.execute(&BuildArguments::default());
        assert!(matches!(
            result,
            Err(BuildExtError::Manifest(buildext_manifest::ManifestError::MissingKey(_)))
        ));
        assert!(backend.calls.borrow().is_empty());
        Ok(())
    }

    #[test]
    fn test_unknown_target_fails_before_initialize() {
        let mut command = BuildExt::new().with_backend(FakeBackend::default());
        let args = BuildArguments {
            target: "msi".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            command.execute(&args),
            Err(BuildExtError::Configuration(_))
        ));
        assert_eq!(command.state(), BuildState::Idle);
    }

    #[test]
    fn test_plugin_registers_build_ext() {
        let app = Application::with_plugins(&[&BuildExtPlugin]);
        assert_eq!(app.command_loader.names(), vec![BUILD_EXT_COMMAND]);
        let cli = app.cli();
        assert!(cli
            .find_subcommand(BUILD_EXT_COMMAND)
            .is_some_and(|cmd| cmd.get_arguments().any(|a| a.get_short() == Some('k'))));
    }
}
