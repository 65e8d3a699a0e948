use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

// Re-export existing config types
pub use crate::connectors::hubspot::config::HubSpotConfig;
pub use crate::store::RedisConfig;

/// Complete connector service configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConnectorServiceConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub hubspot: HubSpotConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Inbound HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Browser origins allowed to call the API (the frontend)
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Outbound HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Deadline for each request to the provider
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    "hubspot-connector/0.1".to_string()
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

impl ConnectorServiceConfig {
    /// Apply environment overrides on top of file/default values.
    pub fn apply_env(&mut self) {
        self.hubspot.apply_env();

        if let Ok(v) = std::env::var("CONNECTOR_BIND_ADDR") {
            self.server.bind_addr = v;
        }
        if let Ok(v) = std::env::var("CONNECTOR_REDIS_ENABLED") {
            if let Ok(b) = v.parse::<bool>() {
                self.redis.enabled = b;
            }
        }
        if let Ok(v) = std::env::var("CONNECTOR_REDIS_URL") {
            self.redis.url = v;
        }
    }

    /// Check settings that have no usable default.
    pub fn validate(&self) -> Result<()> {
        self.hubspot.validate()
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<ConnectorServiceConfig> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: ConnectorServiceConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    Ok(config)
}

/// Load configuration from `HUBSPOT_CONNECTOR_CONFIG` (if set), then apply
/// environment overrides and validate.
pub fn load_from_env() -> Result<ConnectorServiceConfig> {
    let mut config = match std::env::var("HUBSPOT_CONNECTOR_CONFIG") {
        Ok(path) => load_config(path)?,
        Err(_) => ConnectorServiceConfig::default(),
    };
    config.apply_env();
    config.validate()?;
    Ok(config)
}
