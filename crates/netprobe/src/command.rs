//! Platform specific probe command lines.

use std::ffi::OsString;
use std::process::Stdio;

use tokio::process::Command;

use crate::error::SessionError;

/// Program and arguments of an external probe tool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl ProbeCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Continuous ping that keeps probing until it is killed, using the
    /// platform's default flags
    pub fn continuous_ping(program: &str, host: &str) -> Self {
        Self::continuous_ping_with(program, &default_continuous_ping_flags(), host)
    }

    /// Continuous ping with explicit flags placed before the host
    pub fn continuous_ping_with(program: &str, flags: &[String], host: &str) -> Self {
        Self::new(program).args(flags).arg(host)
    }

    /// Ping that sends a single probe and exits
    pub fn single_ping(program: &str, host: &str) -> Self {
        let count_flag = if cfg!(windows) { "-n" } else { "-c" };
        Self::new(program).arg(count_flag).arg("1").arg(host)
    }

    /// One-shot hop tracing
    pub fn traceroute(program: &str, host: &str) -> Self {
        Self::new(program).arg(host)
    }

    /// Build a tokio command with both output streams piped
    pub(crate) fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

impl std::fmt::Display for ProbeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Flags that keep the platform's ping running until it is killed.
///
/// Windows needs `-t`. On Linux `-O` makes iputils report unanswered probes
/// as they happen; busybox ping rejects it, so such hosts configure an empty
/// flag list. Other unix pings run continuously without flags.
pub fn default_continuous_ping_flags() -> Vec<String> {
    if cfg!(windows) {
        vec!["-t".into()]
    } else if cfg!(target_os = "linux") {
        vec!["-O".into()]
    } else {
        Vec::new()
    }
}

/// Check that a client supplied host can only ever be read as a host.
///
/// The host is passed to the probe tool as a positional argument, so
/// anything that could parse as an option is refused.
pub fn validate_host(host: &str) -> Result<&str, SessionError> {
    let host = host.trim();
    if host.is_empty() {
        return Err(SessionError::MissingParameter("IP"));
    }
    if host.starts_with('-') || host.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(SessionError::InvalidHost(host.to_string()));
    }
    Ok(host)
}

/// Default ping program name
pub fn default_ping_program() -> &'static str {
    "ping"
}

/// Default traceroute program name for this platform
pub fn default_traceroute_program() -> &'static str {
    if cfg!(windows) { "tracert" } else { "traceroute" }
}
