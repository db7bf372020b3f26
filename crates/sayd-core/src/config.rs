//! Resolved daemon configuration.
//!
//! These are plain serde types; reading them from disk is the binary's job.
//! Every field has a default so a partial (or missing) file still yields a
//! usable configuration.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Priority, VoiceSettings};
use crate::ports::FALLBACK_MODULE;

/// Directory name used under the XDG config and runtime directories.
pub const APP_DIR: &str = "sayd";

/// Default log level pushed to workers with `LOGLEVEL`.
pub const DEFAULT_MODULE_LOG_LEVEL: u8 = 3;

/// Configuration validation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Output module #{0} has an empty name")]
    EmptyModuleName(usize),

    #[error("Output module '{0}' is configured more than once")]
    DuplicateModule(String),

    #[error("Output module name '{0}' is reserved")]
    ReservedModuleName(String),

    #[error("Default output module '{0}' is not configured")]
    UnknownDefaultModule(String),

    #[error("Timeout '{0}' must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// One output module entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub name: String,
    pub executable: PathBuf,
    /// Passed to the worker as its only argument.
    #[serde(default)]
    pub config_path: Option<PathBuf>,
    /// File that receives the worker's stderr.
    #[serde(default)]
    pub debug_log: Option<PathBuf>,
}

impl ModuleConfig {
    pub fn new(name: impl Into<String>, executable: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            executable: executable.into(),
            config_path: None,
            debug_log: None,
        }
    }

    #[must_use]
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_log = Some(path.into());
        self
    }
}

/// Bounds on blocking worker requests, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Spawn plus `INIT` handshake.
    pub init_ms: u64,
    /// Any other request/reply exchange.
    pub request_ms: u64,
    /// Wait for a worker to exit after `QUIT` before signalling it.
    pub shutdown_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            init_ms: 10_000,
            request_ms: 5_000,
            shutdown_ms: 2_000,
        }
    }
}

impl Timeouts {
    pub const fn init(&self) -> Duration {
        Duration::from_millis(self.init_ms)
    }

    pub const fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }

    pub const fn shutdown(&self) -> Duration {
        Duration::from_millis(self.shutdown_ms)
    }
}

/// Everything the daemon needs at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Unix socket clients connect to; see [`default_socket_path`].
    pub socket_path: Option<PathBuf>,
    pub modules: Vec<ModuleConfig>,
    pub default_module: Option<String>,
    /// Settings every new session starts with.
    pub client_defaults: VoiceSettings,
    pub default_priority: Priority,
    /// Opaque key/values pushed to every worker with `AUDIO`.
    pub audio: BTreeMap<String, String>,
    pub module_log_level: u8,
    /// Where worker debug logs go after `SET all DEBUG on`.
    pub debug_dir: Option<PathBuf>,
    pub timeouts: Timeouts,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            modules: Vec::new(),
            default_module: None,
            client_defaults: VoiceSettings::default(),
            default_priority: Priority::default(),
            audio: BTreeMap::new(),
            module_log_level: DEFAULT_MODULE_LOG_LEVEL,
            debug_dir: None,
            timeouts: Timeouts::default(),
        }
    }
}

impl DaemonConfig {
    /// Check the module table and timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, module) in self.modules.iter().enumerate() {
            let name = module.name.trim();
            if name.is_empty() {
                return Err(ConfigError::EmptyModuleName(index));
            }
            if name == FALLBACK_MODULE {
                return Err(ConfigError::ReservedModuleName(name.to_string()));
            }
            if !seen.insert(name) {
                return Err(ConfigError::DuplicateModule(name.to_string()));
            }
        }
        if let Some(default) = &self.default_module {
            if !seen.contains(default.as_str()) {
                return Err(ConfigError::UnknownDefaultModule(default.clone()));
            }
        }
        for (label, value) in [
            ("init_ms", self.timeouts.init_ms),
            ("request_ms", self.timeouts.request_ms),
            ("shutdown_ms", self.timeouts.shutdown_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroTimeout(label));
            }
        }
        Ok(())
    }

    pub fn module(&self, name: &str) -> Option<&ModuleConfig> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Settings for a freshly connected client.
    pub fn session_defaults(&self) -> VoiceSettings {
        VoiceSettings {
            priority: self.default_priority,
            ..self.client_defaults.clone()
        }
    }

    /// Configured socket path, or the per-user default.
    pub fn effective_socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(default_socket_path)
    }

    pub fn effective_debug_dir(&self) -> PathBuf {
        self.debug_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("sayd-debug"))
    }
}

/// `$XDG_CONFIG_HOME/sayd/sayd.json`, if a config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("sayd.json"))
}

/// `$XDG_RUNTIME_DIR/sayd/sayd.sock`, falling back to the temp directory.
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join("sayd.sock")
}
