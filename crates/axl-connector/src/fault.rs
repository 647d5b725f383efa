//! SOAP fault decoding.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{AxlError, AxlResult};
use crate::xml;

/// Prefix of the fault string CUCM sends when a result set exceeds its
/// per-call row limit.
pub const QUERY_TOO_LARGE_PREFIX: &str = "Query request too large.";

/// Two digit runs, each preceded by at least one non-digit.
static LIMITS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\D+(\d+)\D+(\d+)").expect("Invalid limits regex"));

/// Vendor block inside `<detail>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxlErrorDetail {
    pub code: String,
    pub message: String,
    /// Operation name echoed by the server.
    pub request: String,
}

/// Decoded `<soapenv:Fault>` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultDetail {
    pub code: String,
    pub message: String,
    pub axl_error: Option<AxlErrorDetail>,
}

/// Row limits carried by a too-large fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Rows matched by the query.
    pub total: usize,
    /// Rows the server returns per call.
    pub fetch_max: usize,
}

impl FaultDetail {
    /// Parse an isolated fault section.
    ///
    /// Fails with [`AxlError::MalformedFault`] when the section is not a
    /// well-formed `Fault` element.
    pub fn decode(fault: &str) -> AxlResult<Self> {
        let root = xml::parse(fault).map_err(|message| AxlError::MalformedFault { message })?;
        if root.name != "Fault" {
            return Err(AxlError::MalformedFault {
                message: format!("expected Fault element, found <{}>", root.name),
            });
        }

        let axl_error = root.path(&["detail", "axlError"]).map(|e| AxlErrorDetail {
            code: e.child_text("axlcode").to_string(),
            message: e.child_text("axlmessage").to_string(),
            request: e.child_text("request").to_string(),
        });

        Ok(Self {
            code: root.child_text("faultcode").to_string(),
            message: root.child_text("faultstring").to_string(),
            axl_error,
        })
    }

    pub fn is_query_too_large(&self) -> bool {
        self.message.starts_with(QUERY_TOO_LARGE_PREFIX)
    }

    /// Total and per-call maximum from the fault message.
    ///
    /// A message without the two numbers yields
    /// [`AxlError::FaultLimitsMissing`], never `MalformedFault`.
    pub fn query_limits(&self) -> AxlResult<QueryLimits> {
        let missing = || AxlError::FaultLimitsMissing {
            message: self.message.clone(),
        };
        let caps = LIMITS_PATTERN.captures(&self.message).ok_or_else(missing)?;
        let total = caps[1].parse().map_err(|_| missing())?;
        let fetch_max = caps[2].parse().map_err(|_| missing())?;
        Ok(QueryLimits { total, fetch_max })
    }

    /// The most specific message available, for logs.
    pub fn summary(&self) -> &str {
        match &self.axl_error {
            Some(detail) if !detail.message.is_empty() => &detail.message,
            _ => &self.message,
        }
    }
}
