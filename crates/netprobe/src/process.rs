//! Supervised probe child process with framed output.

use std::collections::VecDeque;
use std::io;
use std::process::ExitStatus;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout};
use tracing::{debug, warn};

use crate::command::ProbeCommand;
use crate::framing::LineFramer;

const READ_BUFFER: usize = 4096;

/// Output observed from a running probe
#[derive(Debug)]
pub enum ProcessEvent {
    Stdout(String),
    Stderr(String),
    /// Both pipes are closed and the process has been reaped
    Exited(Option<ExitStatus>),
}

/// A running probe process whose pipes are read incrementally
pub struct ProbeProcess {
    child: Child,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    stdout_framer: LineFramer,
    stderr_framer: LineFramer,
    queued: VecDeque<ProcessEvent>,
    exited: bool,
}

impl ProbeProcess {
    pub fn spawn(command: &ProbeCommand) -> io::Result<Self> {
        let mut child = command.to_command().spawn()?;
        debug!(pid = ?child.id(), command = %command, "Spawned probe process");

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        Ok(Self {
            child,
            stdout,
            stderr,
            stdout_framer: LineFramer::new(),
            stderr_framer: LineFramer::new(),
            queued: VecDeque::new(),
            exited: false,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Wait for the next line of output or for process exit.
    ///
    /// Cancel safe: lines framed from a completed read are queued before
    /// being returned, so dropping the future never loses output. Returns
    /// `None` once [`ProcessEvent::Exited`] has been delivered.
    pub async fn next_event(&mut self) -> Option<ProcessEvent> {
        loop {
            if let Some(event) = self.queued.pop_front() {
                return Some(event);
            }
            if self.exited {
                return None;
            }

            if self.stdout.is_none() && self.stderr.is_none() {
                let status = match self.child.wait().await {
                    Ok(status) => Some(status),
                    Err(error) => {
                        warn!(%error, "Failed to reap probe process");
                        None
                    }
                };
                self.exited = true;
                return Some(ProcessEvent::Exited(status));
            }

            let mut out_buf = [0u8; READ_BUFFER];
            let mut err_buf = [0u8; READ_BUFFER];

            tokio::select! {
                read = read_pipe(&mut self.stdout, &mut out_buf) => {
                    match read {
                        Ok(0) | Err(_) => {
                            self.stdout = None;
                            self.stdout_framer.finish();
                        }
                        Ok(n) => self
                            .queued
                            .extend(self.stdout_framer.feed(&out_buf[..n]).map(ProcessEvent::Stdout)),
                    }
                }
                read = read_pipe(&mut self.stderr, &mut err_buf) => {
                    match read {
                        Ok(0) | Err(_) => {
                            self.stderr = None;
                            // Error messages are often written without a newline.
                            if let Some(rest) = self.stderr_framer.take_remainder() {
                                self.queued.push_back(ProcessEvent::Stderr(rest));
                            }
                        }
                        Ok(n) => self
                            .queued
                            .extend(self.stderr_framer.feed(&err_buf[..n]).map(ProcessEvent::Stderr)),
                    }
                }
            }
        }
    }

    /// Kill the process unless it has already exited.
    ///
    /// Killing an exited process is a no-op, so calling this twice is safe.
    pub async fn terminate(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(%status, "Probe process already exited");
            }
            Ok(None) => {
                if let Err(error) = self.child.kill().await {
                    warn!(%error, "Failed to kill probe process");
                }
            }
            Err(error) => warn!(%error, "Failed to query probe process state"),
        }
        self.exited = true;
        self.queued.clear();
    }
}

/// Read from a pipe, or never resolve once the pipe is closed
async fn read_pipe<R>(pipe: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    match pipe {
        Some(reader) => reader.read(buf).await,
        None => std::future::pending().await,
    }
}
