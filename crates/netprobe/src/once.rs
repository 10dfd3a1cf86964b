//! One-shot ping.

use tracing::{debug, warn};

use crate::command::{ProbeCommand, validate_host};
use crate::error::ProbeError;

/// Run a single ping and return its standard output.
///
/// A non-zero exit is reported as [`ProbeError::Failed`] carrying the tool's
/// error output, or its exit status when the error output is empty. A host
/// that could be read as an option is refused before anything runs.
pub async fn ping_once(program: &str, host: &str) -> Result<String, ProbeError> {
    let host = validate_host(host)?;
    run_once(&ProbeCommand::single_ping(program, host)).await
}

pub async fn run_once(command: &ProbeCommand) -> Result<String, ProbeError> {
    let output = command.to_command().output().await?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    debug!(command = %command, status = %output.status, %stdout, %stderr, "One-shot probe finished");

    if output.status.success() {
        return Ok(stdout);
    }

    warn!(command = %command, status = %output.status, "One-shot probe failed");
    if stderr.trim().is_empty() {
        Err(ProbeError::Failed(format!("Command failed: {command} ({})", output.status)))
    } else {
        Err(ProbeError::Failed(stderr))
    }
}
