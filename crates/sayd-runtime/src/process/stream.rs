//! Byte-based line reading with lossy UTF-8 decoding.
//!
//! Workers are independently written executables and may emit non-UTF8
//! bytes. `BufReader::lines()` would end the reader on the first invalid
//! sequence, so lines are read as bytes and decoded lossily instead.

use std::path::PathBuf;

use tokio::fs::OpenOptions;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

/// Reads `\n`-terminated lines, stripping `\r\n`/`\n`.
pub struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(stream: R) -> Self {
        Self {
            reader: BufReader::new(stream),
            buf: Vec::with_capacity(1024),
        }
    }

    /// Next line, or `None` at EOF.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

/// Forward a worker's stderr into `debug!` events and, if configured, a
/// per-module log file.
pub fn spawn_stderr_reader(
    module: String,
    stream: impl AsyncRead + Unpin + Send + 'static,
    log_path: Option<PathBuf>,
) {
    tokio::spawn(async move {
        let mut file = match &log_path {
            Some(path) => match OpenOptions::new().create(true).append(true).open(path).await {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(module = %module, path = %path.display(), error = %e, "Cannot open module debug log");
                    None
                }
            },
            None => None,
        };

        let mut lines = LineReader::new(stream);
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    debug!(module = %module, "stderr: {}", line);
                    if let Some(f) = file.as_mut() {
                        if f.write_all(format!("{line}\n").as_bytes()).await.is_err() {
                            file = None;
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    debug!(module = %module, error = %e, "stderr reader exiting due to read error");
                    break;
                }
            }
        }

        debug!(module = %module, "stderr reader task exiting");
    });
}
