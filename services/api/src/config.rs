//! Service configuration
//!
//! Loaded once at start-up from an optional `config/sponsorhub.toml` file,
//! overlaid by `APP_*` environment variables (`APP_PORT=9000`,
//! `APP_STORAGE=memory`, ...). Connection settings for Postgres, Redis and
//! the JWT keys keep their own `from_env` constructors.

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

/// Which repositories back the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Postgres => "postgres",
            StorageBackend::Memory => "memory",
        }
    }
}

/// Where revoked tokens are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevocationBackend {
    Redis,
    Memory,
}

/// Service settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Interface to bind
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Repository implementation
    pub storage: StorageBackend,
    /// Serve from memory when Postgres is unreachable at start-up
    pub memory_fallback: bool,
    /// Token revocation store
    pub revocation: RevocationBackend,
    /// Default agent account created at start-up when both are set
    pub seed_agent_email: Option<String>,
    pub seed_agent_password: Option<String>,
    pub seed_agent_name: String,
}

impl AppConfig {
    /// Load the configuration
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("storage", "postgres")?
            .set_default("memory_fallback", true)?
            .set_default("revocation", "memory")?
            .set_default("seed_agent_name", "Platform Agent")?
            .add_source(File::with_name("config/sponsorhub").required(false))
            .add_source(Environment::with_prefix("APP").try_parsing(true))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Socket address to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Seed agent credentials, when configured
    pub fn seed_agent(&self) -> Option<(&str, &str)> {
        match (&self.seed_agent_email, &self.seed_agent_password) {
            (Some(email), Some(password)) => Some((email.as_str(), password.as_str())),
            _ => None,
        }
    }
}
