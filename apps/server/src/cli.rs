use std::path::PathBuf;

use clap::Parser;

/// HTTP server exposing ping, traceroute and port checks
#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    /// Path to the config file (defaults to $XDG_CONFIG_HOME/netprobe/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Port to listen on, overriding the config file and PORT
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub print_config: bool,
}
