use crate::errors::BuildExtError;
use crate::GlobalOpts;
use buildext_config::{Config, CONFIG_KEYS};
use buildext_logger as logger;
use clap::Subcommand;
use colored::Colorize;

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Print the value of a configuration key
    Get { key: String },
    /// Set a configuration key (python, backend, keep-tmp)
    Set { key: String, value: String },
    /// Print the path of the configuration file
    Path,
}

pub fn handle_config(action: ConfigAction, opts: &GlobalOpts) -> Result<(), BuildExtError> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            println!("{}", "Configuration:".bold().green());
            if config.is_empty() {
                if opts.verbosity_level() > 0 {
                    println!("  {}", "(empty)".yellow());
                }
            } else {
                for (key, value) in config.values_iter() {
                    println!("  {}: {}", key.cyan(), value);
                }
            }
        }
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key)? {
                Some(value) => println!("{}", value),
                None => logger::debug(&format!(
                    "{} is not set (known keys: {})",
                    key,
                    CONFIG_KEYS.join(", ")
                )),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, value.clone())?;
            config.save()?;
            logger::success(&format!("Set {} = {}", key, value));
        }
        ConfigAction::Path => {
            println!("{}", Config::path()?.display());
        }
    }
    Ok(())
}
