//! Loading the daemon configuration from disk.

use std::path::{Path, PathBuf};

use sayd_core::DaemonConfig;
use sayd_core::config::default_config_path;
use tracing::{debug, info};

use crate::error::CliError;

/// Read and validate the configuration.
///
/// An explicit path must exist. Without one the per-user default is used,
/// and a missing default file means built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<DaemonConfig, CliError> {
    let (path, required) = match explicit {
        Some(path) => (Some(path.to_path_buf()), true),
        None => (default_config_path(), false),
    };
    let Some(path) = path else {
        debug!("No configuration directory, using defaults");
        return Ok(DaemonConfig::default());
    };

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            debug!(path = %path.display(), "No configuration file, using defaults");
            return Ok(DaemonConfig::default());
        }
        Err(e) => return Err(CliError::Io(format!("{}: {e}", path.display()))),
    };

    let config = parse_config(&text, &path)?;
    info!(path = %path.display(), modules = config.modules.len(), "Configuration loaded");
    Ok(config)
}

fn parse_config(text: &str, path: &Path) -> Result<DaemonConfig, CliError> {
    let config: DaemonConfig = serde_json::from_str(text)
        .map_err(|e| CliError::Config(format!("{}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

/// Command-line overrides applied on top of the file.
pub fn apply_overrides(config: &mut DaemonConfig, socket: Option<PathBuf>) {
    if let Some(socket) = socket {
        config.socket_path = Some(socket);
    }
}
