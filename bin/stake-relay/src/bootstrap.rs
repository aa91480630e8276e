//! Wires the chain links, contracts and sync loops together and runs them until interrupted.

use std::{fmt, fs, future::Future, io, path::Path, str::FromStr, sync::Arc};

use anyhow::Context;
use chain_link::{
    evm::{EvmBackend, PrivateKeySigner},
    ChainLink,
};
use stake_relay_contracts::{StakeManagerContract, StakePortalRateContract};
use sync_tracker::{
    metrics::{MetricsSink, NoopSink, PushGateway},
    SyncMode, TaskScheduler,
};
use tokio::signal;
use tracing::{info, warn};

use crate::config::Config;

/// Bootstraps the relay in the given mode and blocks until SIGINT or SIGTERM.
pub(crate) async fn bootstrap(config: Config, mode: SyncMode) -> anyhow::Result<()> {
    info!(?mode, "bootstrapping relay");

    let signer = load_signer(&config.signer.key_file)?;
    let address = signer.address();
    info!(%address, "loaded signer");

    let policy = config.gas_policy()?;

    let primary_backend = EvmBackend::connect(&config.primary.rpc_url, signer.clone())
        .await
        .context("could not connect to the primary chain")?;
    let secondary_backend = EvmBackend::connect(&config.secondary.rpc_url, signer)
        .await
        .context("could not connect to the secondary chain")?;

    let primary = Arc::new(ChainLink::new("primary", primary_backend, policy)?);
    let secondary = Arc::new(ChainLink::new("secondary", secondary_backend, policy)?);

    let stake_manager = Arc::new(StakeManagerContract::new(
        config.primary.contract,
        primary.clone(),
    ));
    let portal = Arc::new(StakePortalRateContract::new(
        config.secondary.contract,
        secondary.clone(),
    ));

    let sink: Arc<dyn MetricsSink> = match &config.metrics {
        Some(metrics) => {
            info!(gateway = %metrics.push_gateway, job = %metrics.job, "pushing metrics");
            Arc::new(PushGateway::new(
                &metrics.push_gateway,
                &metrics.job,
                &address.to_string(),
            )?)
        }
        None => Arc::new(NoopSink),
    };

    let mut scheduler = TaskScheduler::new(
        config.scheduler_config(mode),
        primary,
        secondary,
        stake_manager,
        portal,
        sink,
    );
    scheduler.start().await?;
    info!("relay started");

    let received = wait_for_shutdown_signal()
        .await
        .context("could not listen for the shutdown signal")?;
    info!(signal = %received, "received shutdown signal");

    if !scheduler.shutdown(config.shutdown_timeout).await {
        warn!("some loops were still running at shutdown");
    }

    Ok(())
}

/// The process signal that asked the relay to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownSignal {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownSignal::Interrupt => f.write_str("SIGINT"),
            ShutdownSignal::Terminate => f.write_str("SIGTERM"),
        }
    }
}

async fn wait_for_shutdown_signal() -> io::Result<ShutdownSignal> {
    #[cfg(unix)]
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
    #[cfg(unix)]
    let terminate = terminate.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    first_signal(signal::ctrl_c(), terminate).await
}

async fn first_signal(
    interrupt: impl Future<Output = io::Result<()>>,
    terminate: impl Future<Output = Option<()>>,
) -> io::Result<ShutdownSignal> {
    tokio::select! {
        res = interrupt => res.map(|()| ShutdownSignal::Interrupt),
        _ = terminate => Ok(ShutdownSignal::Terminate),
    }
}

/// Reads a hex-encoded private key, with or without `0x`, from `path`.
fn load_signer(path: &Path) -> anyhow::Result<PrivateKeySigner> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read key file {}", path.display()))?;

    let key = raw.trim();
    let key = key.strip_prefix("0x").unwrap_or(key);

    PrivateKeySigner::from_str(key).context("key file does not contain a valid private key")
}

#[cfg(test)]
mod tests {
    use std::{env, future, io};

    use alloy_primitives::address;

    use super::*;

    #[tokio::test]
    async fn terminate_signal_stops_the_relay() {
        let received = first_signal(future::pending::<io::Result<()>>(), async { Some(()) })
            .await
            .unwrap();
        assert_eq!(received, ShutdownSignal::Terminate);
        assert_eq!(received.to_string(), "SIGTERM");
    }

    #[tokio::test]
    async fn interrupt_signal_stops_the_relay() {
        let received = first_signal(async { Ok::<_, io::Error>(()) }, future::pending())
            .await
            .unwrap();
        assert_eq!(received, ShutdownSignal::Interrupt);
    }

    #[test]
    fn key_file_is_trimmed_and_prefix_is_optional() {
        let key = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
        let expected = address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

        for (i, contents) in [format!("0x{key}\n"), format!("  {key}  ")].iter().enumerate() {
            let name = format!("stake-relay-key-{}-{i}", std::process::id());
            let path = env::temp_dir().join(name);
            fs::write(&path, contents).unwrap();

            let signer = load_signer(&path).unwrap();
            fs::remove_file(&path).unwrap();

            assert_eq!(signer.address(), expected);
        }
    }

    #[test]
    fn garbage_key_is_rejected() {
        let path = env::temp_dir().join(format!("stake-relay-bad-key-{}", std::process::id()));
        fs::write(&path, "not a key").unwrap();

        let res = load_signer(&path);
        fs::remove_file(&path).unwrap();

        assert!(res.is_err());
        assert!(load_signer(Path::new("/nonexistent/relay.key")).is_err());
    }
}
