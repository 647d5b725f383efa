//! # AXL Connector
//!
//! Query and reconciliation engine for the Cisco UCM AXL SOAP API.
//!
//! This crate negotiates a schema version with the publisher, runs the
//! directory SQL templates through `executeSQLQuery` (paging automatically
//! when the server reports a result set as too large), and removes rows
//! whose device or line is shared between several users before they are
//! persisted.
//!
//! ## Example
//!
//! ```ignore
//! use axl_connector::{reconcile, AxlConfig, AxlConnector};
//!
//! let config = AxlConfig::new("cucm.example.com", "axl-user", "secret");
//! let mut connector = AxlConnector::new(config)?;
//! connector.ensure_negotiated().await?;
//!
//! let rows = connector
//!     .fetch_user_device_lines(&["jtapi_rec".to_string()], false)
//!     .await?;
//! let clean = reconcile(rows);
//! for ambiguity in &clean.ambiguities {
//!     eprintln!("{ambiguity}");
//! }
//! ```

pub mod config;
pub mod connector;
pub mod error;
pub mod fault;
pub mod reconcile;
pub mod request;
pub mod response;
pub mod rows;
pub mod session;
pub mod sql;
pub mod version;

mod xml;

// Re-exports
pub use config::AxlConfig;
pub use connector::{AxlConnector, Negotiation};
pub use error::{AxlError, AxlResult};
pub use fault::{AxlErrorDetail, FaultDetail, QueryLimits};
pub use reconcile::{reconcile, Ambiguity, AssociationIndex, Reconciliation, ResourceKind};
pub use response::{classify, ApplicationFault, HttpReply, Outcome, TransportFailure};
pub use rows::{apply_ccx_policy, decode_rows, AxlRow, LoginUser, UserDeviceLine};
pub use session::{DbVersion, NegotiationState, Session};
pub use sql::{QueryTemplate, SqlQuery};
pub use version::{ComponentVersion, SUPPORTED_VERSIONS};
