//! Common types shared across commands

use clap::Parser;

/// Global CLI options available to all commands
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    #[arg(short, long, global = true, help = "Decrease verbosity")]
    pub quiet: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase verbosity (-v for info, -vv for trace)")]
    pub verbose: u8,
}

impl GlobalOpts {
    /// Get the effective verbosity level
    /// - 0: quiet/warn only
    /// - 1: info and debug (-v)
    /// - 2: trace (-vv)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_overrides_verbose() {
        let opts = GlobalOpts {
            quiet: true,
            verbose: 2,
        };
        assert_eq!(opts.verbosity_level(), 0);
    }

    #[test]
    fn test_verbose_count() {
        let opts = GlobalOpts {
            quiet: false,
            verbose: 2,
        };
        assert_eq!(opts.verbosity_level(), 2);
    }
}
