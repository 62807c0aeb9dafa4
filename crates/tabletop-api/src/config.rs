//! Server configuration read from the environment.

use std::net::SocketAddr;

use crate::error::AppError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Settings the server needs at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Upper bound on pooled database connections.
    pub database_max_connections: u32,
    /// OTLP collector endpoint; span export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl AppConfig {
    /// Reads the configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a numeric
    /// variable does not parse.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is missing or a numeric
    /// variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL").ok_or_else(|| {
            AppError::Config("DATABASE_URL environment variable must be set".to_owned())
        })?;
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned());
        let port = match lookup("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => DEFAULT_PORT,
        };
        let database_max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::Config(format!("DATABASE_MAX_CONNECTIONS must be a valid u32: {e}"))
            })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };
        let otlp_endpoint = lookup("OTEL_EXPORTER_OTLP_ENDPOINT").filter(|v| !v.trim().is_empty());

        Ok(Self {
            database_url,
            host,
            port,
            database_max_connections,
            otlp_endpoint,
        })
    }

    /// The socket address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if host and port do not form an address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}
