use std::time::Duration;

use netprobe::{PingSupervisor, TracerouteRunner};

use crate::config::Probe;

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub pings: PingSupervisor,
    pub traceroutes: TracerouteRunner,
    pub ping_program: String,
    pub port_timeout: Duration,
}

impl AppState {
    pub fn from_config(probe: &Probe) -> Self {
        Self {
            pings: PingSupervisor::new(probe.ping_program.clone())
                .with_flags(probe.continuous_ping_flags.clone())
                .with_buffer(probe.stream_buffer),
            traceroutes: TracerouteRunner::new(probe.traceroute_program.clone())
                .with_buffer(probe.stream_buffer),
            ping_program: probe.ping_program.clone(),
            port_timeout: Duration::from_millis(probe.port_timeout_ms),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::from_config(&Probe::default())
    }
}
