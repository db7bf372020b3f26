//! The Unix socket accept loop.

use std::path::Path;
use std::sync::Arc;

use tokio::net::UnixListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::connection::serve_client;
use crate::dispatcher::Dispatcher;
use crate::error::ServerError;

/// Bind the client socket, replacing a stale socket file left behind by an
/// earlier run.
pub fn bind_socket(path: &Path) -> Result<UnixListener, ServerError> {
    let bind_error = |source| ServerError::Bind {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(bind_error)?;
    }
    if path.exists() {
        debug!(path = %path.display(), "Removing stale socket");
        std::fs::remove_file(path).map_err(bind_error)?;
    }
    let listener = UnixListener::bind(path).map_err(bind_error)?;
    info!(path = %path.display(), "Listening for clients");
    Ok(listener)
}

/// Remove the socket file on shutdown.
pub fn remove_socket(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Socket removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove socket"),
    }
}

/// Accept clients until `cancel` fires, then wait for every connection
/// task to finish.
pub async fn serve(
    listener: UnixListener,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) -> Result<(), ServerError> {
    let tracker = TaskTracker::new();
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let (reader, writer) = stream.into_split();
                    let dispatcher = Arc::clone(&dispatcher);
                    let cancel = cancel.clone();
                    tracker.spawn(serve_client(reader, writer, dispatcher, cancel));
                }
                Err(e) => warn!(error = %e, "Failed to accept client"),
            },
        }
    }

    tracker.close();
    debug!(connections = tracker.len(), "Waiting for client connections to close");
    tracker.wait().await;
    info!("Client server stopped");
    Ok(())
}
