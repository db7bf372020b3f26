//! Single-slot request/reply connection to one worker.
//!
//! A reader task owns the worker's reply pipe. It hands complete replies to
//! whoever holds the request slot and sends asynchronous events straight to
//! the dispatcher's event channel. The request slot is a mutex over the
//! write half and the reply receiver, so at most one request is ever
//! outstanding on a pipe.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use sayd_core::{ModuleEvent, WorkerEvent};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, mpsc};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::ModuleError;
use crate::process::LineReader;
use crate::protocol::{Frame, Reply, ReplyAssembler, Request};

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

struct Slot {
    writer: Writer,
    replies: mpsc::UnboundedReceiver<Reply>,
}

/// Request/reply channel to one worker.
pub struct ModuleConnection {
    module: String,
    slot: Mutex<Slot>,
    alive: Arc<AtomicBool>,
}

impl ModuleConnection {
    /// Wrap a worker's pipes and start its reader task.
    ///
    /// Events are tagged with `module` and sent to `events`; when the reply
    /// pipe closes a final [`WorkerEvent::Closed`] is sent.
    pub fn new(
        module: impl Into<String>,
        writer: impl AsyncWrite + Send + Unpin + 'static,
        reader: impl AsyncRead + Send + Unpin + 'static,
        events: mpsc::UnboundedSender<ModuleEvent>,
    ) -> Self {
        let module = module.into();
        let alive = Arc::new(AtomicBool::new(true));
        let (reply_tx, replies) = mpsc::unbounded_channel();

        tokio::spawn(read_loop(
            module.clone(),
            reader,
            reply_tx,
            events,
            Arc::clone(&alive),
        ));

        Self {
            module,
            slot: Mutex::new(Slot {
                writer: Box::new(writer),
                replies,
            }),
            alive,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    /// False once the pipe closed or a request failed fatally.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Send `request` and wait for its final reply.
    ///
    /// Two-phase requests send the verb, wait for a `2xx` go-ahead, then
    /// send the body and wait again. A reply that is not `2xx` ends the
    /// exchange as [`ModuleError::Rejected`]. Fire-and-forget requests
    /// return `Ok(None)` right after writing. Any failure other than a
    /// rejected reply marks the connection dead.
    pub async fn request(
        &self,
        request: &Request,
        limit: Duration,
    ) -> Result<Option<Reply>, ModuleError> {
        if !self.is_alive() {
            return Err(ModuleError::Closed);
        }
        let mut slot = self.slot.lock().await;
        let result = self.exchange(&mut slot, request, limit).await;
        if let Err(e) = &result {
            if e.is_fatal() {
                warn!(module = %self.module, request = request.name(), error = %e, "Worker request failed");
                self.mark_dead();
            }
        }
        result
    }

    async fn exchange(
        &self,
        slot: &mut Slot,
        request: &Request,
        limit: Duration,
    ) -> Result<Option<Reply>, ModuleError> {
        // Replies left over from an earlier timed-out request.
        while let Ok(stale) = slot.replies.try_recv() {
            debug!(module = %self.module, reply = %stale, "Discarding stale reply");
        }

        let verb = request.verb_line();
        debug!(module = %self.module, "-> {}", verb);
        write_line(&mut slot.writer, &verb).await?;
        if !request.expects_reply() {
            return Ok(None);
        }

        let reply = self.await_reply(slot, request, limit).await?;
        let Some(body) = request.body() else {
            return Ok(Some(reply));
        };
        slot.writer.write_all(body.as_bytes()).await?;
        slot.writer.flush().await?;
        self.await_reply(slot, request, limit).await.map(Some)
    }

    async fn await_reply(
        &self,
        slot: &mut Slot,
        request: &Request,
        limit: Duration,
    ) -> Result<Reply, ModuleError> {
        match timeout(limit, slot.replies.recv()).await {
            Ok(Some(reply)) if reply.is_success() => {
                debug!(module = %self.module, "<- {}", reply);
                Ok(reply)
            }
            Ok(Some(reply)) => Err(ModuleError::Rejected {
                request: request.name(),
                reply,
            }),
            Ok(None) => Err(ModuleError::Closed),
            Err(_) => Err(ModuleError::Timeout {
                request: request.name(),
                timeout: limit,
            }),
        }
    }
}

async fn write_line(writer: &mut Writer, line: &str) -> Result<(), ModuleError> {
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

async fn read_loop(
    module: String,
    reader: impl AsyncRead + Unpin,
    replies: mpsc::UnboundedSender<Reply>,
    events: mpsc::UnboundedSender<ModuleEvent>,
    alive: Arc<AtomicBool>,
) {
    let mut lines = LineReader::new(reader);
    let mut assembler = ReplyAssembler::new();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug!(module = %module, error = %e, "Reply reader exiting due to read error");
                break;
            }
        };
        match assembler.push(&line) {
            Ok(Some(Frame::Reply(reply))) => {
                // Nobody holds the receiver only if the connection is gone.
                if replies.send(reply).is_err() {
                    break;
                }
            }
            Ok(Some(Frame::Event(event))) => {
                debug!(module = %module, ?event, "Worker event");
                let _ = events.send(ModuleEvent::new(module.clone(), event));
            }
            Ok(None) => {}
            Err(e) => warn!(module = %module, error = %e, "Ignoring unparseable worker line"),
        }
    }

    alive.store(false, Ordering::SeqCst);
    debug!(module = %module, "Reply pipe closed");
    let _ = events.send(ModuleEvent::new(module, WorkerEvent::Closed));
}
