//! Importer error types.

use thiserror::Error;

use axl_connector::AxlError;
use axl_store::StoreError;

/// Configuration loading or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Error ending a sync run.
#[derive(Debug, Error)]
pub enum ImporterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("AXL: {0}")]
    Axl(#[from] AxlError),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("cache refresh failed: {message}")]
    CacheRefresh {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },
}

impl ImporterError {
    /// Whether the next scheduled run may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        match self {
            ImporterError::Config(_) => false,
            ImporterError::Axl(e) => e.is_transient(),
            ImporterError::Store(e) => e.is_transient(),
            ImporterError::CacheRefresh { .. } => true,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ImporterError::Config(_) => "INVALID_CONFIG",
            ImporterError::Axl(e) => e.error_code(),
            ImporterError::Store(e) => e.error_code(),
            ImporterError::CacheRefresh { .. } => "CACHE_REFRESH_FAILED",
        }
    }
}

pub type ImporterResult<T> = Result<T, ImporterError>;
