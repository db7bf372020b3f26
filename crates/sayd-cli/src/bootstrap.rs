//! Composition root.
//!
//! The ONLY place where the runtime, the server and the core are wired
//! together: the module supervisor is created here and handed to the
//! dispatcher as its output port.

use std::sync::Arc;

use anyhow::{Context, Result};
use sayd_core::{CoreState, DaemonConfig, SpeechOutput};
use sayd_runtime::ModuleSupervisor;
use sayd_server::{Dispatcher, bind_socket, remove_socket, run_admin, run_coordinator, serve};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Run the daemon until SIGINT/SIGTERM or a fatal coordinator error.
pub async fn run_daemon(config: DaemonConfig) -> Result<()> {
    let socket = config.effective_socket_path();
    let listener = bind_socket(&socket).context("cannot open the client socket")?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let supervisor = Arc::new(ModuleSupervisor::start(&config, events_tx).await);
    let output: Arc<dyn SpeechOutput> = Arc::clone(&supervisor) as Arc<dyn SpeechOutput>;
    let dispatcher = Arc::new(Dispatcher::new(
        CoreState::new(config.session_defaults()),
        output,
    ));
    let cancel = CancellationToken::new();

    let coordinator = {
        let dispatcher = Arc::clone(&dispatcher);
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let result = run_coordinator(dispatcher, events_rx, cancel.clone()).await;
            if let Err(e) = &result {
                error!(error = %e, "Speaking coordinator failed, shutting down");
                cancel.cancel();
            }
            result
        })
    };
    let admin = tokio::spawn(run_admin(Arc::clone(&dispatcher), cancel.clone()));

    info!(socket = %socket.display(), "sayd ready");
    let served = serve(listener, Arc::clone(&dispatcher), cancel.clone()).await;
    cancel.cancel();

    let coordinator_result = coordinator.await.context("coordinator task panicked")?;
    match admin.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "Signal handling failed"),
        Err(e) => warn!(error = %e, "Admin task panicked"),
    }

    supervisor.shutdown().await;
    remove_socket(&socket);
    info!("sayd stopped");

    served.context("client server failed")?;
    coordinator_result.context("speaking coordinator failed")?;
    Ok(())
}
