//! Classification of probe output lines.
//!
//! Ping tools only report their results as human readable text, so every
//! framed line is mapped to a [`LineEvent`] before it touches the statistics.
//! The mapping lives behind [`LineClassifier`] so other tools or output
//! formats can be plugged in without changing the session controller.

use std::sync::LazyLock;

use regex::Regex;

/// Meaning of a single line of probe output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineEvent {
    /// An echo reply with its round-trip time in milliseconds
    Reply { rtt_ms: u64 },
    /// A probe that was sent but never answered
    Timeout,
    /// Banner, header or summary output with no statistical meaning
    Info,
    /// Output from the process's error stream
    Error,
}

/// Maps a line of probe output to a [`LineEvent`]
pub trait LineClassifier: Send + Sync {
    fn classify(&self, line: &str) -> LineEvent;
}

impl<F> LineClassifier for F
where
    F: Fn(&str) -> LineEvent + Send + Sync,
{
    fn classify(&self, line: &str) -> LineEvent {
        self(line)
    }
}

// Windows prints `time=12ms` / `time<1ms`, iputils prints `time=12.3 ms`.
static REPLY_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"time[=<](\d+)(?:\.\d+)?\s?ms").expect("reply pattern is valid")
});

static TIMEOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Request timed out|no answer yet").expect("timeout pattern is valid")
});

/// Classifier for the output of the system `ping` tool
#[derive(Debug, Default, Clone, Copy)]
pub struct PingOutputClassifier;

impl LineClassifier for PingOutputClassifier {
    fn classify(&self, line: &str) -> LineEvent {
        if let Some(caps) = REPLY_TIME.captures(line) {
            // Saturate absurd values instead of dropping the reply.
            let rtt_ms = caps[1].parse().unwrap_or(u64::MAX);
            return LineEvent::Reply { rtt_ms };
        }

        if TIMEOUT.is_match(line) {
            return LineEvent::Timeout;
        }

        LineEvent::Info
    }
}
