//! Process configuration, read once at startup from the environment.

use std::net::SocketAddr;

use thiserror::Error;

pub const BIND_ADDR_ENV: &str = "LEDGER_BIND_ADDR";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const DB_MAX_CONNECTIONS_ENV: &str = "LEDGER_DB_MAX_CONNECTIONS";

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {var}: {message}")]
    Invalid { var: &'static str, message: String },
}

#[derive(Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Postgres connection string. Without one the API runs on an in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
}

impl ApiConfig {
    /// In-memory configuration with the given secret (tests, local runs).
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let bind_addr = get(BIND_ADDR_ENV)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: BIND_ADDR_ENV,
                message: e.to_string(),
            })?;

        let jwt_secret = get(JWT_SECRET_ENV).unwrap_or_else(|| {
            tracing::warn!("JWT_SECRET not set; using insecure dev default");
            DEV_JWT_SECRET.to_string()
        });

        let db_max_connections = match get(DB_MAX_CONNECTIONS_ENV) {
            None => DEFAULT_DB_MAX_CONNECTIONS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: DB_MAX_CONNECTIONS_ENV,
                        message: format!("expected a positive integer, got `{raw}`"),
                    });
                }
            },
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url: get(DATABASE_URL_ENV),
            db_max_connections,
        })
    }
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("db_max_connections", &self.db_max_connections)
            .finish_non_exhaustive()
    }
}
