//! Schema version candidates and `getCCMVersion` decoding.

use crate::error::{AxlError, AxlResult};
use crate::xml;

/// Schema versions tried during negotiation, in order.
pub const SUPPORTED_VERSIONS: [&str; 4] = ["10.0", "12.0", "14.0", "16.0"];

/// Version reported by `getCCMVersion`, e.g. `11.5.1.14900(11)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentVersion {
    pub raw: String,
}

impl ComponentVersion {
    /// Decode `<return><componentVersion><version>..</version>..</return>`.
    pub fn decode(payload: &str) -> AxlResult<Self> {
        let root = xml::parse(payload).map_err(AxlError::malformed_payload)?;
        let raw = root
            .path(&["componentVersion", "version"])
            .map(|v| v.text.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AxlError::malformed_payload("componentVersion/version missing"))?;
        Ok(Self { raw })
    }

    /// `major.minor` form used in the AXL namespace.
    ///
    /// `11.5.1.14900(11)` becomes `11.5`; a bare major `14` becomes `14.0`.
    pub fn schema_version(&self) -> AxlResult<String> {
        let mut parts = self.raw.split('.');
        let major = parts
            .next()
            .filter(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| {
                AxlError::malformed_payload(format!("unrecognized version: {}", self.raw))
            })?;
        let minor: String = parts
            .next()
            .map(|p| p.chars().take_while(char::is_ascii_digit).collect())
            .unwrap_or_default();
        let minor = if minor.is_empty() { "0".to_string() } else { minor };
        Ok(format!("{major}.{minor}"))
    }
}
