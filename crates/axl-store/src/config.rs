//! Reporting database connection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::error::{StoreError, StoreResult};

/// Connection settings for the recording database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_database")]
    pub database: String,

    /// Maximum pooled connections.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_database() -> String {
    "callrec".to_string()
}

fn default_pool_size() -> u32 {
    2
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl StoreConfig {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: user.into(),
            password: password.into(),
            database: default_database(),
            pool_size: default_pool_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn validate(&self) -> StoreResult<()> {
        if self.host.trim().is_empty() {
            return Err(StoreError::InvalidConfiguration {
                message: "database host is required".to_string(),
            });
        }
        if self.user.trim().is_empty() {
            return Err(StoreError::InvalidConfiguration {
                message: "database user is required".to_string(),
            });
        }
        if self.pool_size == 0 {
            return Err(StoreError::InvalidConfiguration {
                message: "pool_size must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Connection options; the recording database runs without TLS.
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password)
            .database(&self.database)
            .ssl_mode(PgSslMode::Disable)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// `host=.. port=.. user=.. dbname=..` without the password, for logs.
    pub fn describe(&self) -> String {
        format!(
            "host={} port={} user={} dbname={}",
            self.host, self.port, self.user, self.database
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::new("callrec", "pw");
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "callrec");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_describe_omits_password() {
        let config = StoreConfig::new("callrec", "hunter2").with_host("db.local");
        let text = config.describe();
        assert_eq!(text, "host=db.local port=5432 user=callrec dbname=callrec");
    }

    #[test]
    fn test_validate() {
        assert!(StoreConfig::new("", "pw").validate().is_err());
        assert!(StoreConfig::new("u", "pw").with_host(" ").validate().is_err());
    }

    #[test]
    fn test_connect_options() {
        let options = StoreConfig::new("callrec", "pw").with_port(6543).connect_options();
        assert_eq!(options.get_port(), 6543);
        assert_eq!(options.get_host(), "localhost");
        assert_eq!(options.get_database(), Some("callrec"));
    }
}
