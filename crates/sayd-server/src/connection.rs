//! One task per connected client.

use std::sync::Arc;

use sayd_core::{ClientId, CoreError, MessageKind, Notification};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::command::{Command, error_reply, format_event, reply, reply_lines};
use crate::dispatcher::Dispatcher;

/// What to do after answering a line.
enum Flow {
    Continue(String),
    Close(String),
}

/// Protocol state of one client.
struct ClientConnection {
    uid: ClientId,
    dispatcher: Arc<Dispatcher>,
    /// Payload lines of a `SPEAK` in progress.
    data: Option<Vec<String>>,
}

/// Serve one client until it quits, hangs up or the daemon shuts down.
///
/// The session is created on entry and destroyed, with everything it still
/// had queued, on exit.
pub async fn serve_client<R, W>(
    reader: R,
    mut writer: W,
    dispatcher: Arc<Dispatcher>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (events_tx, mut events) = mpsc::unbounded_channel();
    let uid = match dispatcher.connect(events_tx) {
        Ok(uid) => uid,
        Err(e) => {
            warn!(error = %e, "Rejecting client");
            let _ = writer.write_all(error_reply(&e).as_bytes()).await;
            return;
        }
    };

    let mut conn = ClientConnection {
        uid,
        dispatcher: Arc::clone(&dispatcher),
        data: None,
    };
    if let Err(e) = conn.run(reader, &mut writer, &mut events, &cancel).await {
        debug!(client = %uid, error = %e, "Client connection ended with error");
    }
    if let Err(e) = dispatcher.disconnect(uid) {
        warn!(client = %uid, error = %e, "Failed to remove session");
    }
}

impl ClientConnection {
    async fn run<R, W>(
        &mut self,
        reader: R,
        writer: &mut W,
        events: &mut mpsc::UnboundedReceiver<Notification>,
        cancel: &CancellationToken,
    ) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!(client = %self.uid, "Client hung up");
                        break;
                    };
                    match self.handle_line(&line).await {
                        Flow::Continue(out) => send(writer, &out).await?,
                        Flow::Close(out) => {
                            send(writer, &out).await?;
                            break;
                        }
                    }
                }
                Some(notification) = events.recv() => {
                    send(writer, &format_event(&notification)).await?;
                }
            }
        }
        Ok(())
    }

    async fn handle_line(&mut self, line: &str) -> Flow {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if let Some(data) = self.data.as_mut() {
            if line == "." {
                let text = data.join("\n");
                self.data = None;
                return Flow::Continue(self.queue(MessageKind::Text, &text));
            }
            // Leading dots are doubled on the wire.
            let unescaped = line.strip_prefix('.').filter(|l| l.starts_with('.'));
            data.push(unescaped.unwrap_or(line).to_string());
            return Flow::Continue(String::new());
        }

        match Command::parse(line) {
            Ok(Command::Quit) => Flow::Close(reply(231, "HAPPY HACKING")),
            Ok(command) => Flow::Continue(self.execute(command).await),
            Err(e) => {
                debug!(client = %self.uid, error = %e, "Rejected client command");
                Flow::Continue(e.reply())
            }
        }
    }

    fn queue(&self, kind: MessageKind, text: &str) -> String {
        match self.dispatcher.enqueue(self.uid, kind, text) {
            Ok(id) => reply_lines(225, [id.to_string()], "OK MESSAGE QUEUED"),
            Err(e) => error_reply(&e),
        }
    }

    async fn execute(&mut self, command: Command) -> String {
        let uid = self.uid;
        let d = Arc::clone(&self.dispatcher);
        let result: Result<String, CoreError> = match command {
            Command::Speak => {
                self.data = Some(Vec::new());
                Ok(reply(230, "OK RECEIVING DATA"))
            }
            Command::Char(c) => return self.queue(MessageKind::Char, &c),
            Command::Key(k) => return self.queue(MessageKind::Key, &k),
            Command::SoundIcon(s) => return self.queue(MessageKind::SoundIcon, &s),
            Command::Stop(target) => d.stop(target, uid).map(|_| reply(210, "OK STOPPED")),
            Command::Cancel(target) => d.cancel(target, uid).map(|_| reply(210, "OK CANCELED")),
            Command::Pause(target) => d.pause(target, uid).map(|()| reply(210, "OK PAUSED")),
            Command::Resume(target) => d.resume(target, uid).map(|()| reply(210, "OK RESUMED")),
            Command::Set(target, setting) => d
                .set(target, uid, &setting)
                .map(|_| reply(203, "OK PARAMETER SET")),
            Command::SetDebug(enabled) => d
                .set_debug(enabled)
                .await
                .map(|()| reply(203, "OK DEBUGGING SET")),
            Command::ListModules => {
                let modules = d.list_modules().await;
                let names = modules.into_iter().filter(|m| m.working).map(|m| m.name);
                Ok(reply_lines(250, names, "OK MODULE LIST SENT"))
            }
            Command::ListVoices => d.list_voices(uid).await.map(|voices| {
                let lines = voices
                    .iter()
                    .map(|v| format!("{}\t{}\t{}", v.name, v.language, v.variant));
                reply_lines(249, lines, "OK VOICE LIST SENT")
            }),
            Command::GetClientId => Ok(reply_lines(245, [uid.to_string()], "OK CLIENT ID SENT")),
            Command::BlockBegin => d.block_begin(uid).map(|()| reply(260, "OK INSIDE BLOCK")),
            Command::BlockEnd => d.block_end(uid).map(|()| reply(261, "OK OUTSIDE BLOCK")),
            Command::Quit => Ok(reply(231, "HAPPY HACKING")),
        };
        result.unwrap_or_else(|e| {
            debug!(client = %uid, error = %e, "Request failed");
            error_reply(&e)
        })
    }
}

async fn send<W: AsyncWrite + Unpin>(writer: &mut W, out: &str) -> std::io::Result<()> {
    if out.is_empty() {
        return Ok(());
    }
    writer.write_all(out.as_bytes()).await?;
    writer.flush().await
}
