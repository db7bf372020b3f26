//! Reload and shutdown on signals.

use std::sync::Arc;

use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;

/// SIGHUP reloads the output modules; SIGINT and SIGTERM cancel `cancel`.
///
/// Returns once a shutdown signal arrived or `cancel` fired elsewhere.
pub async fn run_admin(
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) -> std::io::Result<()> {
    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = hangup.recv() => {
                info!("SIGHUP received, reloading output modules");
                if let Err(e) = dispatcher.reload().await {
                    warn!(error = %e, "Reload failed");
                }
            }
            _ = interrupt.recv() => {
                info!("SIGINT received, shutting down");
                cancel.cancel();
                break;
            }
            _ = terminate.recv() => {
                info!("SIGTERM received, shutting down");
                cancel.cancel();
                break;
            }
        }
    }
    Ok(())
}
