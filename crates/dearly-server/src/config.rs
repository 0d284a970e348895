use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("DEARLY_JWT_SECRET is unset or still a placeholder")]
    MissingSecret,
    #[error("DEARLY_PORT is not a valid port: {0}")]
    InvalidPort(String),
    #[error("{host}:{port} is not a valid listen address")]
    InvalidAddress { host: String, port: u16 },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub db_path: PathBuf,
    pub addr: SocketAddr,
    /// Object storage base URL for the audio proxy.
    pub storage_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("DEARLY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(ConfigError::MissingSecret);
        }

        let db_path = lookup("DEARLY_DB_PATH").unwrap_or_else(|| "dearly.db".into());
        let host = lookup("DEARLY_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let raw_port = lookup("DEARLY_PORT").unwrap_or_else(|| "3000".into());
        let port: u16 = raw_port
            .parse()
            .map_err(|_| ConfigError::InvalidPort(raw_port.clone()))?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .map_err(|_| ConfigError::InvalidAddress { host, port })?;
        let storage_url = lookup("DEARLY_STORAGE_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            jwt_secret,
            db_path: db_path.into(),
            addr,
            storage_url,
        })
    }
}
