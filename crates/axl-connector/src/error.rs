//! AXL connector error types
//!
//! Error definitions with transient/permanent classification so the
//! periodic trigger can decide whether the next run has a chance.

use thiserror::Error;

/// Error that can occur while talking to an AXL server.
#[derive(Debug, Error)]
pub enum AxlError {
    // Transport errors (usually transient)
    /// Network, DNS or TLS failure before an HTTP status was received.
    #[error("transport error talking to {server}: {message}")]
    Transport {
        server: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Server answered with a status outside the AXL contract.
    #[error("unexpected HTTP status from {server}: {status}")]
    UnexpectedStatus { server: String, status: String },

    // Authentication errors (permanent for the run)
    /// Credentials rejected (HTTP 401).
    #[error("authentication failed for user {user} on {server}")]
    AuthenticationFailed { server: String, user: String },

    // Version errors
    /// Server rejected the schema version used for the request (HTTP 599).
    #[error("schema version {version} rejected by {server}")]
    VersionMismatch { server: String, version: String },

    /// None of the candidate schema versions was accepted.
    #[error("no supported AXL schema version on {server}")]
    UnsupportedVersion { server: String },

    // Application faults
    /// Query result exceeds what the server returns in one call.
    #[error("query too large: {total} rows, server returns at most {fetch_max}")]
    QueryTooLarge { total: usize, fetch_max: usize },

    /// Server reported a SOAP fault.
    #[error("AXL fault {code}: {message}")]
    Fault { code: String, message: String },

    /// Fault section could not be parsed.
    #[error("malformed fault payload: {message}")]
    MalformedFault { message: String },

    /// Fault parsed but carries no row limits.
    #[error("fault message carries no row limits: {message}")]
    FaultLimitsMissing { message: String },

    /// Success payload could not be decoded.
    #[error("malformed response payload: {message}")]
    MalformedPayload { message: String },

    // Local errors (never sent over the wire)
    /// Query rejected before sending.
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    /// Connector configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// A page of a paged query failed, so the result set is incomplete.
    #[error("page {failed_page} of {pages} failed: {message}")]
    IncompletePages {
        failed_page: usize,
        pages: usize,
        message: String,
    },
}

impl AxlError {
    /// Check if this error is transient and a later run may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AxlError::Transport { .. }
                | AxlError::UnexpectedStatus { .. }
                | AxlError::IncompletePages { .. }
        )
    }

    /// Check if this error is permanent and retry won't help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Fatal errors end the whole sync run, not just the current request.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            AxlError::Transport { .. }
                | AxlError::AuthenticationFailed { .. }
                | AxlError::UnsupportedVersion { .. }
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            AxlError::Transport { .. } => "TRANSPORT_ERROR",
            AxlError::UnexpectedStatus { .. } => "UNEXPECTED_STATUS",
            AxlError::AuthenticationFailed { .. } => "AUTH_FAILED",
            AxlError::VersionMismatch { .. } => "VERSION_MISMATCH",
            AxlError::UnsupportedVersion { .. } => "UNSUPPORTED_VERSION",
            AxlError::QueryTooLarge { .. } => "QUERY_TOO_LARGE",
            AxlError::Fault { .. } => "AXL_FAULT",
            AxlError::MalformedFault { .. } => "MALFORMED_FAULT",
            AxlError::FaultLimitsMissing { .. } => "FAULT_LIMITS_MISSING",
            AxlError::MalformedPayload { .. } => "MALFORMED_PAYLOAD",
            AxlError::InvalidQuery { .. } => "INVALID_QUERY",
            AxlError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            AxlError::IncompletePages { .. } => "INCOMPLETE_PAGES",
        }
    }

    // Convenience constructors

    /// Create a transport error.
    pub fn transport(server: impl Into<String>, message: impl Into<String>) -> Self {
        AxlError::Transport {
            server: server.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create a transport error with source.
    pub fn transport_with_source(
        server: impl Into<String>,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AxlError::Transport {
            server: server.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid query error.
    pub fn invalid_query(message: impl Into<String>) -> Self {
        AxlError::InvalidQuery {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        AxlError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a malformed payload error.
    pub fn malformed_payload(message: impl Into<String>) -> Self {
        AxlError::MalformedPayload {
            message: message.into(),
        }
    }
}

/// Result type for AXL operations.
pub type AxlResult<T> = Result<T, AxlError>;
