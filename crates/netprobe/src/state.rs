//! Lifecycle of a streaming probe session.
//!
//! ```text
//! Starting --spawned--> Streaming --stop--------> Stopped
//!                                 --exit--------> Completed
//!                                 --disconnect--> Errored
//! ```
//!
//! Terminal states absorb every further trigger, which is what makes a stop
//! request racing a client disconnect harmless: only the first one asks for
//! the process to be killed.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Streaming,
    /// Stopped by an explicit stop request
    Stopped,
    /// The probe process exited on its own
    Completed,
    /// The client went away or the probe could not be started
    Errored,
}

/// Something that happened to a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTrigger {
    Spawned,
    SpawnFailed,
    StopRequested,
    ProcessExited,
    ClientDisconnected,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Completed | SessionState::Errored)
    }

    /// Apply a trigger, returning `true` if the probe process must be killed
    pub fn apply(&mut self, trigger: SessionTrigger) -> bool {
        if self.is_terminal() {
            return false;
        }

        let (next, kill) = match (*self, trigger) {
            (SessionState::Starting, SessionTrigger::Spawned) => (SessionState::Streaming, false),
            (SessionState::Starting, SessionTrigger::SpawnFailed) => (SessionState::Errored, false),
            (_, SessionTrigger::StopRequested) => (SessionState::Stopped, true),
            (_, SessionTrigger::ClientDisconnected) => (SessionState::Errored, true),
            (_, SessionTrigger::ProcessExited) => (SessionState::Completed, false),
            (state, SessionTrigger::Spawned | SessionTrigger::SpawnFailed) => (state, false),
        };

        *self = next;
        kill
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Starting => write!(f, "starting"),
            SessionState::Streaming => write!(f, "streaming"),
            SessionState::Stopped => write!(f, "stopped"),
            SessionState::Completed => write!(f, "completed"),
            SessionState::Errored => write!(f, "errored"),
        }
    }
}
