//! Worker process lifecycle: spawn, handshake, speech, shutdown.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use sayd_core::{DaemonConfig, ModuleConfig, ModuleEvent, SpeechRequest, Timeouts, Voice};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::connection::ModuleConnection;
use crate::error::ModuleError;
use crate::process::{shutdown_child, spawn_stderr_reader};
use crate::protocol::{Request, parse_voice};

/// What every worker is told right after `INIT`.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Pushed with `AUDIO`.
    pub audio: Vec<(String, String)>,
    /// Pushed with `LOGLEVEL`.
    pub log_level: u8,
    pub timeouts: Timeouts,
}

impl LoadOptions {
    pub fn from_config(config: &DaemonConfig) -> Self {
        Self {
            audio: config
                .audio
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            log_level: config.module_log_level,
            timeouts: config.timeouts,
        }
    }
}

/// A loaded, handshaken worker.
pub struct OutputModule {
    config: ModuleConfig,
    conn: ModuleConnection,
    child: Mutex<Option<Child>>,
    voices: Vec<Voice>,
    timeouts: Timeouts,
}

impl OutputModule {
    /// Spawn the worker and run the handshake.
    ///
    /// `INIT`, then `AUDIO` and `LOGLEVEL`, then `LIST_VOICES` whose result
    /// is cached. Any failure kills the process and returns the error.
    pub async fn load(
        config: ModuleConfig,
        options: &LoadOptions,
        events: mpsc::UnboundedSender<ModuleEvent>,
    ) -> Result<Self, ModuleError> {
        info!(module = %config.name, executable = %config.executable.display(), "Loading output module");

        let mut cmd = Command::new(&config.executable);
        if let Some(path) = &config.config_path {
            cmd.arg(path);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        let mut child = cmd.spawn().map_err(ModuleError::Spawn)?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            let _ = shutdown_child(&mut child, options.timeouts.shutdown()).await;
            return Err(ModuleError::Spawn(std::io::Error::other(
                "worker pipes unavailable",
            )));
        };
        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_reader(config.name.clone(), stderr, config.debug_log.clone());
        }

        let conn = ModuleConnection::new(config.name.clone(), stdin, stdout, events);
        let mut module = Self {
            config,
            conn,
            child: Mutex::new(Some(child)),
            voices: Vec::new(),
            timeouts: options.timeouts,
        };

        match module.handshake(options).await {
            Ok(voices) => {
                info!(module = %module.name(), voices = voices.len(), "Output module loaded");
                module.voices = voices;
                Ok(module)
            }
            Err(e) => {
                warn!(module = %module.name(), error = %e, "Output module failed to load");
                module.conn.mark_dead();
                module.reap().await;
                Err(e)
            }
        }
    }

    async fn handshake(&self, options: &LoadOptions) -> Result<Vec<Voice>, ModuleError> {
        let request = self.timeouts.request();
        self.conn
            .request(&Request::Init, self.timeouts.init())
            .await
            .map_err(|e| match e {
                ModuleError::Rejected { reply, .. } => {
                    let mut reason = reply.lines.join("; ");
                    if reason.is_empty() {
                        reason = reply.text;
                    }
                    ModuleError::Init(reason)
                }
                other => other,
            })?;
        self.conn
            .request(&Request::Audio(options.audio.clone()), request)
            .await?;
        self.conn
            .request(&Request::LogLevel(options.log_level), request)
            .await?;
        let voices = self
            .conn
            .request(&Request::ListVoices, request)
            .await?
            .map(|reply| reply.lines.iter().filter_map(|l| parse_voice(l)).collect())
            .unwrap_or_default();
        Ok(voices)
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub const fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// False after a crash, a timeout or a failed write.
    pub fn is_working(&self) -> bool {
        self.conn.is_alive()
    }

    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }

    /// Push the request's settings, then its payload.
    pub async fn speak(&self, request: &SpeechRequest) -> Result<(), ModuleError> {
        let limit = self.timeouts.request();
        let params = request
            .settings
            .module_params()
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect();
        self.conn.request(&Request::Set(params), limit).await?;
        self.conn
            .request(&Request::Speak(request.kind, request.text.clone()), limit)
            .await?;
        debug!(module = %self.name(), message = %request.message, "Worker accepted message");
        Ok(())
    }

    pub async fn stop(&self) -> Result<(), ModuleError> {
        self.conn
            .request(&Request::Stop, self.timeouts.request())
            .await
            .map(|_| ())
    }

    pub async fn pause(&self) -> Result<(), ModuleError> {
        self.conn
            .request(&Request::Pause, self.timeouts.request())
            .await
            .map(|_| ())
    }

    /// `DEBUG ON <path>` or `DEBUG OFF`.
    pub async fn set_debug(&self, path: Option<PathBuf>) -> Result<(), ModuleError> {
        self.conn
            .request(&Request::Debug(path), self.timeouts.request())
            .await
            .map(|_| ())
    }

    /// Orderly shutdown: `STOP`, `QUIT`, then a bounded wait before
    /// signalling the process.
    pub async fn shutdown(&self) {
        if self.conn.is_alive() {
            let _ = self.stop().await;
            if let Err(e) = self
                .conn
                .request(&Request::Quit, self.timeouts.request())
                .await
            {
                debug!(module = %self.name(), error = %e, "QUIT failed");
            }
        }
        self.conn.mark_dead();

        let Some(mut child) = self.child.lock().await.take() else {
            return;
        };
        let grace = self.timeouts.shutdown();
        match timeout(grace, child.wait()).await {
            Ok(Ok(status)) => debug!(module = %self.name(), %status, "Worker exited"),
            Ok(Err(e)) => warn!(module = %self.name(), error = %e, "Failed to wait for worker"),
            Err(_) => {
                warn!(module = %self.name(), "Worker ignored QUIT, terminating");
                terminate(self.name(), &mut child, grace).await;
            }
        }
    }

    /// Make sure a dead worker's process is gone and reaped.
    pub async fn reap(&self) {
        if let Some(mut child) = self.child.lock().await.take() {
            terminate(self.name(), &mut child, Duration::from_millis(200)).await;
        }
    }
}

async fn terminate(module: &str, child: &mut Child, grace: Duration) {
    match shutdown_child(child, grace).await {
        Ok(status) => debug!(module, %status, "Worker reaped"),
        Err(e) => warn!(module, error = %e, "Failed to terminate worker"),
    }
}
