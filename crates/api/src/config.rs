//! Environment-driven configuration for the API binary.

use std::net::SocketAddr;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not a valid {expected}")]
    Invalid {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub database_url: Option<String>,
}

impl ApiConfig {
    /// Read configuration from the environment. Absent variables fall back
    /// to dev defaults (with a warning where that is a security concern);
    /// malformed values abort startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind = std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind.parse().map_err(|_| ConfigError::Invalid {
            var: "BIND_ADDR",
            value: bind.clone(),
            expected: "socket address such as \"0.0.0.0:8080\"",
        })?;

        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            "dev-secret".to_string()
        });

        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url,
        })
    }
}
