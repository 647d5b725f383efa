//! AXL connection configuration
//!
//! Connection settings for a single CUCM publisher.

use serde::{Deserialize, Serialize};

use crate::error::{AxlError, AxlResult};

/// Configuration for an AXL connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxlConfig {
    /// Host name or IP address of the CUCM publisher.
    pub server: String,

    /// HTTPS port of the AXL service.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application user with the AXL API access role.
    pub user: String,

    /// Password of the application user.
    #[serde(default)]
    pub password: String,

    /// Timeout applied to every request, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Verify the server TLS certificate.
    #[serde(default)]
    pub verify_certificate: bool,

    /// Full endpoint URL overriding `https://{server}:{port}/axl/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Value of the `User-Agent` header.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_port() -> u16 {
    8443
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Recording Info 1.0".to_string()
}

impl AxlConfig {
    /// Create a new AXL config with required fields.
    pub fn new(
        server: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port: default_port(),
            user: user.into(),
            password: password.into(),
            timeout_secs: default_timeout_secs(),
            verify_certificate: false,
            endpoint: None,
            user_agent: default_user_agent(),
        }
    }

    /// Set the request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Enable or disable TLS certificate verification.
    pub fn with_verify_certificate(mut self, verify: bool) -> Self {
        self.verify_certificate = verify;
        self
    }

    /// Send requests to an explicit endpoint instead of the derived one.
    ///
    /// Integration tests point this at a mock server.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// URL every AXL request is posted to.
    pub fn url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!("https://{}:{}/axl/", self.server, self.port),
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> AxlResult<()> {
        if self.server.trim().is_empty() {
            return Err(AxlError::invalid_configuration("server is required"));
        }
        if self.user.trim().is_empty() {
            return Err(AxlError::invalid_configuration("user is required"));
        }
        if self.timeout_secs == 0 {
            return Err(AxlError::invalid_configuration(
                "timeout_secs must be greater than zero",
            ));
        }

        let url = url::Url::parse(&self.url())
            .map_err(|e| AxlError::invalid_configuration(format!("invalid endpoint: {e}")))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(AxlError::invalid_configuration(format!(
                "unsupported scheme: {}",
                url.scheme()
            )));
        }

        Ok(())
    }

    /// Copy of the configuration safe to log.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.password.is_empty() {
            config.password = "***".to_string();
        }
        config
    }
}
