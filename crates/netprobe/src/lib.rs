//! netprobe - network diagnostic probes with live streaming output
//!
//! This library supervises long running `ping` and `traceroute` processes on
//! behalf of streaming clients: it frames their output into lines, keeps
//! per-session ping statistics, and kills the process when the client goes
//! away or asks for the session to stop. One-shot pings and TCP/UDP port
//! checks are provided as plain request/response helpers.

pub mod classify;
pub mod command;
pub mod error;
pub mod event;
pub mod framing;
pub mod once;
pub mod ping;
pub mod port;
pub mod process;
pub mod registry;
pub mod state;
pub mod stats;
pub mod traceroute;

// Re-export main types
pub use classify::{LineClassifier, LineEvent, PingOutputClassifier};
pub use command::ProbeCommand;
pub use error::{ProbeError, SessionError};
pub use event::{StreamEvent, sse_stream};
pub use framing::LineFramer;
pub use once::ping_once;
pub use ping::PingSupervisor;
pub use port::{PortCheck, PortStatus, Protocol, check_port};
pub use registry::SessionRegistry;
pub use state::{SessionState, SessionTrigger};
pub use stats::{ProbeStats, StatsSummary};
pub use traceroute::TracerouteRunner;
