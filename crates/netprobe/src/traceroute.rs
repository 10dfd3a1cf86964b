//! Streaming traceroute.
//!
//! Each traceroute belongs to exactly one client connection: there is no
//! registry entry, and the process is killed as soon as the client's stream
//! is dropped. After the last hop a terminal completed event is sent and the
//! stream closes.

use tokio::sync::mpsc;
use tracing::{Instrument, error, info, info_span};

use crate::command::{ProbeCommand, default_traceroute_program, validate_host};
use crate::error::SessionError;
use crate::event::StreamEvent;
use crate::ping::DEFAULT_STREAM_BUFFER;
use crate::process::{ProbeProcess, ProcessEvent};
use crate::state::{SessionState, SessionTrigger};

/// Text of the terminal event
pub const COMPLETED_MESSAGE: &str = "Traceroute completed";

const ERROR_PREFIX: &str = "ERROR";

/// Launches per-connection traceroute streams
#[derive(Debug, Clone)]
pub struct TracerouteRunner {
    program: String,
    buffer: usize,
}

impl Default for TracerouteRunner {
    fn default() -> Self {
        Self::new(default_traceroute_program())
    }
}

impl TracerouteRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), buffer: DEFAULT_STREAM_BUFFER }
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    /// Trace the route to `host`
    pub fn start(&self, host: &str) -> Result<mpsc::Receiver<StreamEvent>, SessionError> {
        let host = validate_host(host)?;
        Ok(self.start_command(ProbeCommand::traceroute(&self.program, host)))
    }

    /// Stream the output of an arbitrary hop tracing command
    pub fn start_command(&self, command: ProbeCommand) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(self.buffer);

        match ProbeProcess::spawn(&command) {
            Ok(process) => {
                info!(pid = ?process.id(), command = %command, "Started traceroute");
                let span = info_span!("traceroute", command = %command);
                tokio::spawn(run(process, tx).instrument(span));
            }
            Err(spawn_error) => {
                error!(command = %command, %spawn_error, "Failed to start traceroute");
                let _ = tx.try_send(StreamEvent::Error {
                    prefix: ERROR_PREFIX,
                    message: spawn_error.to_string(),
                });
                let _ = tx.try_send(StreamEvent::Completed(COMPLETED_MESSAGE));
            }
        }

        rx
    }
}

async fn run(mut process: ProbeProcess, tx: mpsc::Sender<StreamEvent>) -> SessionState {
    let mut state = SessionState::Starting;
    state.apply(SessionTrigger::Spawned);

    loop {
        tokio::select! {
            biased;

            () = tx.closed() => {
                if state.apply(SessionTrigger::ClientDisconnected) {
                    process.terminate().await;
                }
                break;
            }

            event = process.next_event() => {
                let delivered = match event {
                    Some(ProcessEvent::Stdout(line)) => tx.send(StreamEvent::Line(line)).await.is_ok(),
                    Some(ProcessEvent::Stderr(message)) => tx
                        .send(StreamEvent::Error { prefix: ERROR_PREFIX, message })
                        .await
                        .is_ok(),
                    Some(ProcessEvent::Exited(_)) | None => {
                        state.apply(SessionTrigger::ProcessExited);
                        let _ = tx.send(StreamEvent::Completed(COMPLETED_MESSAGE)).await;
                        break;
                    }
                };

                if !delivered {
                    if state.apply(SessionTrigger::ClientDisconnected) {
                        process.terminate().await;
                    }
                    break;
                }
            }
        }
    }

    info!(%state, "Traceroute ended");
    state
}
