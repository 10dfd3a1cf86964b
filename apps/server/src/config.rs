use std::{env, fmt, fs, io, path};

use netprobe::command::{default_continuous_ping_flags, default_ping_program, default_traceroute_program};
use netprobe::ping::DEFAULT_STREAM_BUFFER;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    ReadFailed { path: path::PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    WriteFailed { path: path::PathBuf, source: io::Error },
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] toml::de::Error),
    #[error("failed to serialize config: {0}")]
    SerializeFailed(#[from] toml::ser::Error),
    #[error("no config directory available (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
    #[error("invalid value '{value}' for {name}")]
    InvalidOverride { name: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub probe: Probe,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Server {
    pub bind: String,
    pub port: u16,
    /// Origins allowed to call the API from a browser, empty allows any
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Probe {
    pub ping_program: String,
    /// Flags placed before the host to keep the ping running until stopped
    pub continuous_ping_flags: Vec<String>,
    pub traceroute_program: String,
    /// Per-probe timeout for port checks
    pub port_timeout_ms: u64,
    /// Capacity of each streaming session's event channel
    pub stream_buffer: usize,
}

impl Default for Server {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 3000, allowed_origins: Vec::new() }
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self {
            ping_program: default_ping_program().into(),
            continuous_ping_flags: default_continuous_ping_flags(),
            traceroute_program: default_traceroute_program().into(),
            port_timeout_ms: 3000,
            stream_buffer: DEFAULT_STREAM_BUFFER,
        }
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/netprobe/config.toml or
/// $HOME/.config/...)
pub fn default_config_path() -> Result<path::PathBuf, ConfigError> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(ConfigError::ConfigPathUnavailable);
    };

    Ok(path.join("netprobe/config.toml"))
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;
        if self.server.allowed_origins.is_empty() {
            write_1(f, "Allowed Origins", &"*")?;
        } else {
            write_1(f, "Allowed Origins", &self.server.allowed_origins.join(", "))?;
        }
        write_title_1(f, "Probe")?;
        write_1(f, "Ping Program", &self.probe.ping_program)?;
        write_1(f, "Continuous Ping Flags", &self.probe.continuous_ping_flags.join(" "))?;
        write_1(f, "Traceroute Program", &self.probe.traceroute_program)?;
        write_1(f, "Port Timeout (ms)", &self.probe.port_timeout_ms)?;
        write_1(f, "Stream Buffer", &self.probe.stream_buffer)?;

        Ok(())
    }
}

impl Config {
    /// Load the config file, creating it with defaults if it does not exist.
    ///
    /// Without an explicit path, `$XDG_CONFIG_HOME/netprobe/config.toml` is
    /// used.
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, ConfigError> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path)
                .map_err(|source| ConfigError::ReadFailed { path: config_path.clone(), source })?;
            Ok(toml::from_str(raw_string.as_str())?)
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            Ok(config)
        }
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &path::Path) -> Result<(), ConfigError> {
        let config_str = toml::to_string_pretty(self)?;

        let write_failed = |source: io::Error| ConfigError::WriteFailed { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_failed)?;
        }

        fs::write(path, config_str).map_err(write_failed)
    }

    /// Apply `BIND` and `PORT` from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| env::var(name).ok())
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(bind) = lookup("BIND").filter(|bind| !bind.trim().is_empty()) {
            self.server.bind = bind.trim().to_string();
        }

        if let Some(port) = lookup("PORT") {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidOverride { name: "PORT", value: port.clone() })?;
        }

        Ok(())
    }
}
