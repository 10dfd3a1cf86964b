//! Events pushed to streaming clients and their server-sent event framing.

use std::convert::Infallible;

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};

/// One event on a ping or traceroute stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A framed line from the probe's standard output, sent verbatim
    Line(String),
    /// A line from the probe's error stream, or a spawn failure
    Error { prefix: &'static str, message: String },
    /// Terminal event emitted once the probe process has exited
    Completed(&'static str),
}

impl StreamEvent {
    /// Text carried by the event's `data:` field
    pub fn data(&self) -> String {
        match self {
            StreamEvent::Line(line) => line.clone(),
            StreamEvent::Error { prefix, message } => format!("{prefix}: {message}"),
            StreamEvent::Completed(message) => (*message).to_string(),
        }
    }

    /// Encode as a single server-sent event: `data: <text>\n\n`
    pub fn to_sse(&self) -> Bytes {
        // A raw newline inside the payload would split the event.
        let data = self.data().replace(['\r', '\n'], " ");
        Bytes::from(format!("data: {data}\n\n"))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed(_))
    }
}

/// Turn a session's event receiver into a body stream of encoded events.
///
/// Dropping the returned stream closes the receiver, which the owning session
/// observes as a client disconnect.
pub fn sse_stream(rx: mpsc::Receiver<StreamEvent>) -> impl Stream<Item = Result<Bytes, Infallible>> {
    ReceiverStream::new(rx).map(|event| Ok(event.to_sse()))
}
