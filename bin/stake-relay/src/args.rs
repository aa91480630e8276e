//! Parses command-line arguments for the relay.

use std::{fmt::Display, path::PathBuf};

use clap::{crate_version, Parser, ValueEnum};
use sync_tracker::SyncMode;

#[derive(Debug, Parser)]
#[clap(
    name = "stake-relay",
    about = "Keeps era and rate of a staking deployment in sync across two chains",
    version = crate_version!()
)]
pub(crate) struct Cli {
    #[arg(
        value_enum,
        help = "Which loops to run: `all`, `new-era` (alias: start) or `sync-rate` (alias: rate)",
        default_value_t = Mode::All
    )]
    pub mode: Mode,

    #[clap(
        long,
        short = 'c',
        help = "The file containing the configuration for the relay",
        default_value = "config.toml"
    )]
    pub config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Mode {
    /// Advance eras on the primary chain and vote rates on the secondary chain.
    All,

    /// Only advance eras on the primary chain.
    #[clap(alias = "start")]
    NewEra,

    /// Only vote rates on the secondary chain.
    #[clap(alias = "rate")]
    SyncRate,
}

impl Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::All => write!(f, "all"),
            Mode::NewEra => write!(f, "new-era"),
            Mode::SyncRate => write!(f, "sync-rate"),
        }
    }
}

impl From<Mode> for SyncMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::All => SyncMode::All,
            Mode::NewEra => SyncMode::NewEra,
            Mode::SyncRate => SyncMode::SyncRate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_command_names_are_accepted() {
        let cli = Cli::parse_from(["stake-relay", "start", "-c", "relay.toml"]);
        assert_eq!(cli.mode, Mode::NewEra);
        assert_eq!(cli.config, PathBuf::from("relay.toml"));

        let cli = Cli::parse_from(["stake-relay", "sync-rate"]);
        assert_eq!(SyncMode::from(cli.mode), SyncMode::SyncRate);

        let cli = Cli::parse_from(["stake-relay"]);
        assert_eq!(cli.mode, Mode::All);
        assert_eq!(cli.config, PathBuf::from("config.toml"));
    }
}
