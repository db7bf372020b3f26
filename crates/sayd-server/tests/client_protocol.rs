//! The client line protocol over an in-memory stream.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Harness;
use sayd_server::connection::serve_client;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, WriteHalf};
use tokio::time::timeout;

struct Client {
    lines: Lines<BufReader<tokio::io::ReadHalf<DuplexStream>>>,
    writer: WriteHalf<DuplexStream>,
}

impl Client {
    fn connect(h: &Harness) -> Self {
        let (ours, theirs) = tokio::io::duplex(4096);
        let (their_read, their_write) = tokio::io::split(theirs);
        tokio::spawn(serve_client(
            their_read,
            their_write,
            Arc::clone(&h.dispatcher),
            h.cancel.clone(),
        ));
        let (read, writer) = tokio::io::split(ours);
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    async fn line(&mut self) -> String {
        let line = timeout(Duration::from_secs(2), self.lines.next_line())
            .await
            .expect("timed out waiting for a reply")
            .unwrap()
            .expect("server closed the connection");
        line.trim_end_matches('\r').to_string()
    }

    /// Read through the next terminal line.
    async fn reply(&mut self) -> Vec<String> {
        let mut out = Vec::new();
        loop {
            let line = self.line().await;
            let terminal = line.as_bytes().get(3) != Some(&b'-');
            out.push(line);
            if terminal {
                return out;
            }
        }
    }

    async fn request(&mut self, line: &str) -> Vec<String> {
        self.send(line).await;
        self.reply().await
    }
}

#[tokio::test]
async fn speak_queues_and_reports_events() {
    let h = Harness::auto_complete();
    let mut c = Client::connect(&h);

    assert_eq!(
        c.request("SET self NOTIFICATION all on").await,
        ["203 OK PARAMETER SET"]
    );
    assert_eq!(c.request("SPEAK").await, ["230 OK RECEIVING DATA"]);
    c.send("Hello there.").await;
    c.send("..dotted").await;
    let queued = c.request(".").await;
    assert_eq!(queued, ["225-1", "225 OK MESSAGE QUEUED"]);

    assert_eq!(c.reply().await, ["701-1", "701-1", "701 BEGIN"]);
    assert_eq!(c.reply().await, ["702-1", "702-1", "702 END"]);

    let spoken = h.output.spoken();
    assert!(spoken[0].contains("Hello there."));
    assert!(spoken[0].contains("\n.dotted"));
}

#[tokio::test]
async fn malformed_input_gets_3xx_and_never_queues() {
    let h = Harness::start();
    let mut c = Client::connect(&h);

    assert_eq!(c.request("FROBNICATE").await, ["300 ERR UNKNOWN COMMAND"]);
    assert_eq!(c.request("SET self RATE 500").await, ["303 ERR VALUE OUT OF RANGE"]);
    assert_eq!(c.request("CHAR").await, ["301 ERR MISSING ARGUMENT"]);
    assert!(h.dispatcher.with_state(|s| s.queues.is_empty()).unwrap());
    assert!(h.output.calls().is_empty());
}

#[tokio::test]
async fn empty_message_is_rejected_by_the_daemon() {
    let h = Harness::start();
    let mut c = Client::connect(&h);

    assert_eq!(c.request("SPEAK").await, ["230 OK RECEIVING DATA"]);
    assert_eq!(c.request(".").await, ["410 ERR EMPTY MESSAGE"]);
}

#[tokio::test]
async fn listing_ids_blocks_and_quit() {
    let h = Harness::start();
    let mut c = Client::connect(&h);

    assert_eq!(c.request("HISTORY GET CLIENT_ID").await, ["245-1", "245 OK CLIENT ID SENT"]);
    assert_eq!(
        c.request("LIST OUTPUT_MODULES").await,
        ["250-mock", "250 OK MODULE LIST SENT"]
    );
    assert_eq!(
        c.request("LIST SYNTHESIS_VOICES").await,
        ["249-kal\ten\tnone", "249 OK VOICE LIST SENT"]
    );
    assert_eq!(c.request("BLOCK BEGIN").await, ["260 OK INSIDE BLOCK"]);
    assert_eq!(c.request("BLOCK BEGIN").await, ["410 ERR ALREADY INSIDE A BLOCK"]);
    assert_eq!(c.request("BLOCK END").await, ["261 OK OUTSIDE BLOCK"]);
    assert_eq!(c.request("QUIT").await, ["231 HAPPY HACKING"]);

    // The session is gone once the connection task finishes.
    timeout(Duration::from_secs(2), async {
        while h.dispatcher.with_state(|s| s.sessions.len()).unwrap() != 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("session was not removed");
}

#[tokio::test]
async fn stop_and_cancel_replies() {
    let h = Harness::start();
    let mut c = Client::connect(&h);

    assert_eq!(c.request("STOP self").await, ["210 OK STOPPED"]);
    assert_eq!(c.request("CANCEL all").await, ["210 OK CANCELED"]);
    assert_eq!(c.request("PAUSE all").await, ["210 OK PAUSED"]);
    assert_eq!(c.request("RESUME all").await, ["210 OK RESUMED"]);
    assert_eq!(c.request("SET 99 RATE 10").await, ["412 ERR NO SUCH CLIENT"]);
}
