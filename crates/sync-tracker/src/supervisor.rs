//! Restart-on-panic supervision of long-running loops.

use std::{any::Any, future::Future, time::Duration};

use chain_link::sleep_unless_cancelled;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Spawns the future produced by `make` and spawns a fresh one whenever it panics.
///
/// The supervisor exits when the future returns normally, when it is aborted, or when `cancel`
/// fires while waiting `restart_delay` before a restart.
pub fn spawn_supervised<F, Fut>(
    name: &'static str,
    cancel: CancellationToken,
    restart_delay: Duration,
    make: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            match tokio::spawn(make()).await {
                Ok(()) => {
                    info!(task = %name, "task finished");
                    break;
                }
                Err(err) if err.is_panic() => {
                    let reason = panic_message(err.into_panic());
                    error!(task = %name, %reason, "task panicked, restarting");

                    if !sleep_unless_cancelled(restart_delay, &cancel).await {
                        break;
                    }
                }
                Err(err) => {
                    warn!(task = %name, %err, "task aborted");
                    break;
                }
            }
        }
    })
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        return (*msg).to_string();
    }

    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(_) => "non-string panic payload".to_string(),
    }
}
