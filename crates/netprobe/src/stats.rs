//! Per-session ping statistics.

use std::fmt;

use serde::Serialize;

use crate::classify::{LineClassifier, LineEvent};

/// Running counters for one streaming ping session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeStats {
    sent: u64,
    received: u64,
    samples: Vec<u64>,
}

impl ProbeStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a line of output and record its effect
    pub fn classify_and_record(&mut self, classifier: &dyn LineClassifier, line: &str) {
        let event = classifier.classify(line);
        self.record(&event);
    }

    /// Apply an already classified event
    pub fn record(&mut self, event: &LineEvent) {
        match event {
            LineEvent::Reply { rtt_ms } => {
                self.sent += 1;
                self.received += 1;
                self.samples.push(*rtt_ms);
            }
            LineEvent::Timeout => self.sent += 1,
            LineEvent::Info | LineEvent::Error => {}
        }
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn samples(&self) -> &[u64] {
        &self.samples
    }

    /// Compute the summary reported when a session is stopped.
    ///
    /// With no samples, min, max and average are all reported as 0.
    pub fn summarize(&self) -> StatsSummary {
        let lost = self.sent - self.received;
        let loss_rate = if self.sent == 0 {
            0.0
        } else {
            lost as f64 / self.sent as f64 * 100.0
        };

        let min = self.samples.iter().copied().min().unwrap_or(0);
        let max = self.samples.iter().copied().max().unwrap_or(0);
        let average = if self.samples.is_empty() {
            0.0
        } else {
            self.samples.iter().map(|&s| s as f64).sum::<f64>() / self.samples.len() as f64
        };

        StatsSummary { sent: self.sent, received: self.received, lost, loss_rate, min, max, average }
    }
}

/// Final statistics of a ping session
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSummary {
    pub sent: u64,
    pub received: u64,
    pub lost: u64,
    /// Percentage of probes lost, 0 when nothing was sent
    pub loss_rate: f64,
    pub min: u64,
    pub max: u64,
    pub average: f64,
}

impl StatsSummary {
    /// Loss rate with two decimals, e.g. `25.00`
    pub fn loss_rate_display(&self) -> String {
        format!("{:.2}", self.loss_rate)
    }

    /// Average latency with two decimals, e.g. `20.00`
    pub fn average_display(&self) -> String {
        format!("{:.2}", self.average)
    }
}

impl fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Ping statistics:")?;
        writeln!(
            f,
            "  Packets: Sent = {}, Received = {}, Lost = {} ({}% loss),",
            self.sent,
            self.received,
            self.lost,
            self.loss_rate_display()
        )?;
        write!(
            f,
            "  Minimum = {}ms, Maximum = {}ms, Average = {}ms",
            self.min,
            self.max,
            self.average_display()
        )
    }
}
