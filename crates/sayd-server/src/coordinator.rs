//! The speaking coordinator.
//!
//! One task owns the path from the queues to the output modules. It waits
//! on the dispatcher's wake signal, the module event channel and the
//! shutdown token; after every wake it performs the actions
//! [`CoreState::next_dispatch`](sayd_core::CoreState::next_dispatch) hands
//! back until there are none left.

use std::sync::Arc;

use sayd_core::{CoreError, Dispatch, ModuleEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;

/// Run until `cancel` fires or the module event channel closes.
pub async fn run_coordinator(
    dispatcher: Arc<Dispatcher>,
    mut events: mpsc::UnboundedReceiver<ModuleEvent>,
    cancel: CancellationToken,
) -> Result<(), CoreError> {
    info!("Speaking coordinator started");
    loop {
        perform_pending(&dispatcher).await?;

        tokio::select! {
            () = cancel.cancelled() => break,
            () = dispatcher.woken() => {}
            event = events.recv() => {
                let Some(event) = event else {
                    debug!("Module event channel closed");
                    break;
                };
                dispatcher.on_worker_event(event)?;
            }
        }
    }
    info!("Speaking coordinator stopped");
    Ok(())
}

async fn perform_pending(dispatcher: &Dispatcher) -> Result<(), CoreError> {
    let output = dispatcher.output();
    while let Some(action) = dispatcher.next_dispatch()? {
        match action {
            Dispatch::Speak { module, request } => {
                let id = request.message;
                if let Err(e) = output.speak(&module, request).await {
                    warn!(module = %module, message = %id, error = %e, "Speak failed, abandoning message");
                    dispatcher.abandon(id)?;
                }
            }
            Dispatch::Stop { module } => {
                if let Err(e) = output.stop(&module).await {
                    warn!(module = %module, error = %e, "Stop failed");
                    dispatcher.abandon_module(&module)?;
                }
            }
            Dispatch::Pause { module } => {
                if let Err(e) = output.pause(&module).await {
                    warn!(module = %module, error = %e, "Pause failed");
                    dispatcher.abandon_module(&module)?;
                }
            }
        }
    }
    Ok(())
}
