//! Process settings from environment variables and an optional `.env` file.

use crate::error::ConfigError;
use crate::executor::Dialect;
use crate::routes::DEFAULT_BODY_LIMIT;
use axum::http::StatusCode;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub max_connections: u32,
    pub max_body_bytes: usize,
    /// Status of successful GET responses (201 or 200).
    pub read_status: StatusCode,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "sqlite::memory:".into(),
            bind_addr: "127.0.0.1:3000".into(),
            max_connections: 5,
            max_body_bytes: DEFAULT_BODY_LIMIT,
            read_status: StatusCode::CREATED,
        }
    }
}

impl Settings {
    /// Loads `.env` if present, then reads DATABASE_URL, BIND_ADDR, MAX_CONNECTIONS, MAX_BODY_BYTES and READ_STATUS.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        if let Some(url) = lookup("DATABASE_URL") {
            if Dialect::from_url(&url).is_none() {
                return Err(ConfigError::UnsupportedDatabase(url));
            }
            settings.database_url = url;
        }
        if let Some(addr) = lookup("BIND_ADDR") {
            settings.bind_addr = addr;
        }
        if let Some(v) = lookup("MAX_CONNECTIONS") {
            settings.max_connections = parse("MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("MAX_BODY_BYTES") {
            settings.max_body_bytes = parse("MAX_BODY_BYTES", &v)?;
        }
        if let Some(v) = lookup("READ_STATUS") {
            settings.read_status = match v.trim() {
                "200" => StatusCode::OK,
                "201" => StatusCode::CREATED,
                _ => return Err(ConfigError::Invalid { key: "READ_STATUS", value: v.clone() }),
            };
        }
        Ok(settings)
    }
}

fn parse<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}
