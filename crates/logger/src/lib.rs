//! Shared tracing setup for the netprobe binaries.

mod subscriber;

pub use subscriber::{LogFormat, init as init_tracing, init_with_level};
