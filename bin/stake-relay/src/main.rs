//! The stake relay keeps the era and exchange rate of a staking deployment in sync between a
//! primary chain and a secondary chain.

use std::{fs, path::Path, process};

use clap::Parser;
use config::Config;
use constants::DEFAULT_THREAD_COUNT;
use serde::de::DeserializeOwned;
use stake_relay_common::logging::{self, LoggerConfig};
use tokio::runtime;
use tracing::{debug, error, info, trace};

mod args;
mod bootstrap;
mod config;

mod constants;

fn main() {
    let logger_config = LoggerConfig::with_base_name("stake-relay").with_otlp_from_env();
    if let Err(e) = logging::init(logger_config) {
        eprintln!("could not initialize logging: {e}");
        process::exit(1);
    }

    let cli = args::Cli::parse();
    info!(mode = %cli.mode, "starting stake relay");

    let config = parse_toml::<Config>(&cli.config);

    let runtime = runtime::Builder::new_multi_thread()
        .worker_threads(config.num_threads.unwrap_or(DEFAULT_THREAD_COUNT).into())
        .enable_all()
        .build()
        .expect("must be able to create runtime");

    if let Err(e) = runtime.block_on(bootstrap::bootstrap(config, cli.mode.into())) {
        error!(?e, "stake relay crashed");
        process::exit(1);
    }

    info!("stake relay shutdown complete");
}

/// Reads and parses a TOML file from the given path into the given type `T`.
///
/// # Panics
///
/// 1. If the file is not readable.
/// 2. If the contents of the file cannot be deserialized into the given type `T`.
fn parse_toml<T>(path: impl AsRef<Path>) -> T
where
    T: std::fmt::Debug + DeserializeOwned,
{
    fs::read_to_string(path)
        .map(|p| {
            trace!(?p, "read file");

            let parsed = toml::from_str::<T>(&p).unwrap_or_else(|e| {
                panic!("failed to parse TOML file: {e:?}");
            });
            debug!(?parsed, "parsed TOML file");

            parsed
        })
        .unwrap_or_else(|_| {
            panic!("failed to read TOML file");
        })
}
