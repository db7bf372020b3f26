//! `sayd run`

use sayd_core::DaemonConfig;

use crate::bootstrap::run_daemon;
use crate::error::CliError;

pub async fn execute(config: DaemonConfig) -> Result<(), CliError> {
    run_daemon(config).await.map_err(CliError::from)
}
