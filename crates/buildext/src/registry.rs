//! Host application and command loader
//!
//! Commands are registered as factories under a name. The loader builds a
//! fresh command instance for every invocation, so commands may keep
//! per-run state without sharing it between runs.

use crate::commands::config::{self, ConfigAction};
use crate::errors::BuildExtError;
use crate::GlobalOpts;
use clap::{ArgMatches, Args, Command, FromArgMatches, Subcommand};
use std::collections::BTreeMap;

/// A command the host application can dispatch to
pub trait HostCommand {
    /// clap definition of the command's options
    fn definition(&self) -> Command;

    /// Run the command with its parsed options
    fn handle(&mut self, matches: &ArgMatches, opts: &GlobalOpts) -> Result<(), BuildExtError>;
}

pub type CommandFactory = fn() -> Box<dyn HostCommand>;

#[derive(Default)]
pub struct CommandLoader {
    factories: BTreeMap<&'static str, CommandFactory>,
}

impl CommandLoader {
    pub fn register_factory(&mut self, name: &'static str, factory: CommandFactory) {
        self.factories.insert(name, factory);
    }

    pub fn has(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }

    /// Construct a fresh instance of the command registered under `name`
    pub fn get(&self, name: &str) -> Result<Box<dyn HostCommand>, BuildExtError> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| BuildExtError::UnknownCommand(name.to_string()))
    }

    fn definitions(&self) -> Vec<Command> {
        self.factories
            .iter()
            .map(|(name, factory)| factory().definition().name(*name))
            .collect()
    }
}

/// Extends the host application, typically by registering commands
pub trait ApplicationPlugin {
    fn activate(&self, application: &mut Application);
}

#[derive(Default)]
pub struct Application {
    pub command_loader: CommandLoader,
}

impl Application {
    /// Application with every given plugin activated
    pub fn with_plugins(plugins: &[&dyn ApplicationPlugin]) -> Self {
        let mut application = Self::default();
        for plugin in plugins {
            plugin.activate(&mut application);
        }
        application
    }

    /// Root clap command: global options, `config`, and every registered command
    pub fn cli(&self) -> Command {
        let root = Command::new("buildext")
            .version(env!("CARGO_PKG_VERSION"))
            .about("Native extension builder for Poetry projects")
            .long_about(
                "buildext builds a Poetry project's native extensions with scikit-build-core \
                 in an isolated copy of the project and copies the compiled libraries back.",
            )
            .subcommand_required(true)
            .arg_required_else_help(true);
        let root = GlobalOpts::augment_args(root);

        let config_command =
            ConfigAction::augment_subcommands(Command::new("config").about("Configure buildext"))
                .subcommand_required(true)
                .arg_required_else_help(true);

        root.subcommand(config_command)
            .subcommands(self.command_loader.definitions())
    }

    /// Dispatch parsed arguments to the selected command
    pub fn dispatch(&self, matches: &ArgMatches, opts: &GlobalOpts) -> Result<(), BuildExtError> {
        match matches.subcommand() {
            Some(("config", sub_matches)) => {
                let action = ConfigAction::from_arg_matches(sub_matches)
                    .map_err(|e| BuildExtError::Validation(e.to_string()))?;
                config::handle_config(action, opts)
            }
            Some((name, sub_matches)) => {
                let mut command = self.command_loader.get(name)?;
                command.handle(sub_matches, opts)
            }
            None => Err(BuildExtError::UnknownCommand(String::new())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    thread_local! {
        static HANDLED: Cell<u32> = const { Cell::new(0) };
    }

    struct Echo;

    impl HostCommand for Echo {
        fn definition(&self) -> Command {
            Command::new("echo").arg(clap::Arg::new("word"))
        }

        fn handle(&mut self, matches: &ArgMatches, _opts: &GlobalOpts) -> Result<(), BuildExtError> {
            if matches.get_one::<String>("word").is_some_and(|w| w == "fail") {
                return Err(BuildExtError::Validation("fail".to_string()));
            }
            HANDLED.with(|count| count.set(count.get() + 1));
            Ok(())
        }
    }

    fn echo_factory() -> Box<dyn HostCommand> {
        Box::new(Echo)
    }

    struct EchoPlugin;

    impl ApplicationPlugin for EchoPlugin {
        fn activate(&self, application: &mut Application) {
            application.command_loader.register_factory("echo", echo_factory);
        }
    }

    #[test]
    fn test_plugin_registers_factory() {
        let app = Application::with_plugins(&[&EchoPlugin]);
        assert!(app.command_loader.has("echo"));
        assert_eq!(app.command_loader.names(), vec!["echo"]);
        assert!(app.command_loader.get("echo").is_ok());
    }

    #[test]
    fn test_unknown_command() {
        let app = Application::default();
        assert!(matches!(
            app.command_loader.get("build-ext"),
            Err(BuildExtError::UnknownCommand(_))
        ));
    }

    #[test]
    fn test_dispatch_to_registered_command() {
        let app = Application::with_plugins(&[&EchoPlugin]);
        let matches = app.cli().try_get_matches_from(["buildext", "echo", "hi"]);
        assert!(matches.is_ok());
        let Ok(matches) = matches else {
            return;
        };

        let before = HANDLED.with(Cell::get);
        assert!(app.dispatch(&matches, &GlobalOpts::default()).is_ok());
        assert_eq!(HANDLED.with(Cell::get), before + 1);
    }

    #[test]
    fn test_dispatch_propagates_errors() {
        let app = Application::with_plugins(&[&EchoPlugin]);
        let Ok(matches) = app.cli().try_get_matches_from(["buildext", "echo", "fail"]) else {
            return;
        };
        assert!(matches!(
            app.dispatch(&matches, &GlobalOpts::default()),
            Err(BuildExtError::Validation(_))
        ));
    }

    #[test]
    fn test_cli_requires_subcommand() {
        let app = Application::with_plugins(&[&EchoPlugin]);
        assert!(app.cli().try_get_matches_from(["buildext"]).is_err());
    }
}
