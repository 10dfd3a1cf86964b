//! Streaming ping sessions.
//!
//! A session owns one continuous ping process. Every framed line is recorded
//! in the session's statistics and then pushed to the client, in the order the
//! process produced it. The session ends when the client disconnects, a stop
//! request arrives through the [`SessionRegistry`], or the process exits.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{Instrument, debug, error, info, info_span};

use crate::classify::{LineClassifier, PingOutputClassifier};
use crate::command::{
    ProbeCommand, default_continuous_ping_flags, default_ping_program, validate_host,
};
use crate::error::SessionError;
use crate::event::StreamEvent;
use crate::process::{ProbeProcess, ProcessEvent};
use crate::registry::{Registration, SessionRegistry, StopReply};
use crate::state::{SessionState, SessionTrigger};
use crate::stats::{ProbeStats, StatsSummary};

/// Default capacity of a session's event channel
pub const DEFAULT_STREAM_BUFFER: usize = 64;

const ERROR_PREFIX: &str = "Error";

/// Starts and stops streaming ping sessions
#[derive(Clone)]
pub struct PingSupervisor {
    registry: SessionRegistry,
    classifier: Arc<dyn LineClassifier>,
    program: String,
    flags: Vec<String>,
    buffer: usize,
}

impl Default for PingSupervisor {
    fn default() -> Self {
        Self::new(default_ping_program())
    }
}

impl PingSupervisor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            classifier: Arc::new(PingOutputClassifier),
            program: program.into(),
            flags: default_continuous_ping_flags(),
            buffer: DEFAULT_STREAM_BUFFER,
        }
    }

    pub fn with_classifier(mut self, classifier: impl LineClassifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Replace the flags that keep the ping running
    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer.max(1);
        self
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    /// Start a continuous ping of `host` registered under `id`
    pub async fn start(
        &self,
        host: &str,
        id: &str,
    ) -> Result<mpsc::Receiver<StreamEvent>, SessionError> {
        let host = validate_host(host)?;
        let command = ProbeCommand::continuous_ping_with(&self.program, &self.flags, host);
        self.start_command(id, command).await
    }

    /// Start a session running an arbitrary probe command.
    ///
    /// A spawn failure does not fail the call: the returned stream carries a
    /// single error event and then ends.
    pub async fn start_command(
        &self,
        id: &str,
        command: ProbeCommand,
    ) -> Result<mpsc::Receiver<StreamEvent>, SessionError> {
        if id.trim().is_empty() {
            return Err(SessionError::MissingParameter("ID"));
        }

        let registration = self.registry.register(id).await?;
        let (tx, rx) = mpsc::channel(self.buffer);

        let process = match ProbeProcess::spawn(&command) {
            Ok(process) => process,
            Err(spawn_error) => {
                error!(session = id, command = %command, %spawn_error, "Failed to start ping");
                self.registry.release(id, registration.token).await;
                let _ = tx.try_send(StreamEvent::Error {
                    prefix: ERROR_PREFIX,
                    message: spawn_error.to_string(),
                });
                return Ok(rx);
            }
        };

        info!(session = id, pid = ?process.id(), command = %command, "Started ping session");

        let session = PingSession {
            registration,
            registry: self.registry.clone(),
            classifier: self.classifier.clone(),
            process,
            tx,
        };
        let span = info_span!("ping_session", session = id);
        tokio::spawn(session.run().instrument(span));

        Ok(rx)
    }

    /// Stop the session registered under `id`, returning its final summary.
    ///
    /// `None` means no session was running under that identifier.
    pub async fn stop(&self, id: &str) -> Option<StatsSummary> {
        self.registry.stop(id).await
    }
}

struct PingSession {
    registration: Registration,
    registry: SessionRegistry,
    classifier: Arc<dyn LineClassifier>,
    process: ProbeProcess,
    tx: mpsc::Sender<StreamEvent>,
}

/// What the session loop does next
enum Step {
    Continue,
    Emit(StreamEvent),
    Stop(StopReply),
    Disconnected,
    Exited,
}

impl PingSession {
    async fn run(self) -> SessionState {
        let PingSession { registration, registry, classifier, mut process, tx } = self;
        let Registration { id, token, mut stop_rx, stats } = registration;

        let mut state = SessionState::Starting;
        state.apply(SessionTrigger::Spawned);
        let mut stop_open = true;

        loop {
            let step = tokio::select! {
                biased;

                request = &mut stop_rx, if stop_open => match request {
                    Ok(reply) => Step::Stop(reply),
                    Err(_) => {
                        stop_open = false;
                        Step::Continue
                    }
                },

                () = tx.closed() => Step::Disconnected,

                event = process.next_event() => match event {
                    Some(ProcessEvent::Stdout(line)) => {
                        debug!(%line, "Ping output");
                        record(&stats, classifier.as_ref(), &line).await;
                        Step::Emit(StreamEvent::Line(line))
                    }
                    Some(ProcessEvent::Stderr(message)) => {
                        Step::Emit(StreamEvent::Error { prefix: ERROR_PREFIX, message })
                    }
                    Some(ProcessEvent::Exited(_)) | None => Step::Exited,
                },
            };

            let step = match step {
                Step::Emit(event) => emit(&tx, event, &mut stop_rx, &mut stop_open).await,
                step => step,
            };

            match step {
                Step::Continue | Step::Emit(_) => {}
                Step::Stop(reply) => {
                    if state.apply(SessionTrigger::StopRequested) {
                        process.terminate().await;
                    }
                    let _ = reply.send(stats.lock().await.summarize());
                    break;
                }
                Step::Disconnected => {
                    if state.apply(SessionTrigger::ClientDisconnected) {
                        process.terminate().await;
                    }
                    break;
                }
                Step::Exited => {
                    state.apply(SessionTrigger::ProcessExited);
                    break;
                }
            }
        }

        registry.release(&id, token).await;
        let summary = stats.lock().await.summarize();
        info!(%state, sent = summary.sent, received = summary.received, "Ping session ended");
        state
    }
}

/// Send `event` to the client unless a stop request arrives first.
///
/// A client that stops reading must not hold up its own stop request.
async fn emit(
    tx: &mpsc::Sender<StreamEvent>,
    event: StreamEvent,
    stop_rx: &mut oneshot::Receiver<StopReply>,
    stop_open: &mut bool,
) -> Step {
    let send = tx.send(event);
    tokio::pin!(send);

    loop {
        tokio::select! {
            biased;

            request = &mut *stop_rx, if *stop_open => match request {
                Ok(reply) => return Step::Stop(reply),
                Err(_) => *stop_open = false,
            },

            sent = &mut send => {
                return if sent.is_ok() { Step::Continue } else { Step::Disconnected };
            }
        }
    }
}

async fn record(stats: &Mutex<ProbeStats>, classifier: &dyn LineClassifier, line: &str) {
    stats.lock().await.classify_and_record(classifier, line);
}
