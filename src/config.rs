use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::types::SettleStrategy;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub bus: BusConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BusConfig {
    /// Known raw-socket SCPI endpoints, VISA form or plain host:port.
    /// The socket transport has no broadcast discovery, so these are
    /// what a discovery sweep probes.
    pub resources: Vec<String>,
    pub connect_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionConfig {
    /// Timeout for identity probes during discovery
    pub probe_timeout_ms: u64,
    /// Timeout applied to the link once connected
    pub session_timeout_ms: u64,
    pub auto_scale: SettleConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub log_level: String,
}

/// Settle wait after `:AUT`. `fixed` preserves the flat sleep; `poll`
/// queries `*OPC?` until the instrument reports completion.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SettleConfig {
    Fixed { seconds: f64 },
    Poll { timeout_seconds: f64, interval_ms: u64 },
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bus: BusConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            resources: vec!["TCPIP0::127.0.0.1::5025::SOCKET".to_string()],
            connect_timeout_ms: 5000,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 1000,
            session_timeout_ms: 5000,
            auto_scale: SettleConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for SettleConfig {
    fn default() -> Self {
        Self::Fixed { seconds: 2.0 }
    }
}

impl BusConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl SessionConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

impl SettleConfig {
    pub fn strategy(&self) -> SettleStrategy {
        match self {
            SettleConfig::Fixed { seconds } => SettleStrategy::Fixed {
                wait: Duration::from_secs_f64(*seconds),
            },
            SettleConfig::Poll {
                timeout_seconds,
                interval_ms,
            } => SettleStrategy::OperationComplete {
                timeout: Duration::from_secs_f64(*timeout_seconds),
                interval: Duration::from_millis(*interval_ms),
            },
        }
    }
}

/// Load configuration from file with layered fallbacks
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder()
        .add_source(Config::try_from(&AppConfig::default())?);

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(File::from(path));
        } else {
            return Err(ConfigError::Message(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
    } else {
        // Try common config file locations
        let possible_paths = ["config.toml", "scope_config.toml"];

        for path in &possible_paths {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
                break;
            }
        }
    }

    // Add environment variable overrides with prefix "RUSTY_SCOPE_"
    builder = builder.add_source(
        Environment::with_prefix("RUSTY_SCOPE")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize::<AppConfig>()
}

/// Load configuration with better error handling and defaults
pub fn load_config_or_default(config_path: Option<&Path>) -> AppConfig {
    match load_config(config_path) {
        Ok(config) => {
            log::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            log::warn!("Failed to load config ({}), using defaults", e);
            AppConfig::default()
        }
    }
}
