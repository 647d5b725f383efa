//! # AXL Store
//!
//! Writes reconciled directory batches into the recording database and
//! runs the follow-up maintenance procedures (QM agent refresh and call
//! mapping).
//!
//! The sync job depends only on the [`DirectoryStore`] and
//! [`MaintenanceStore`] traits; [`PgDirectoryStore`] is the `PostgreSQL`
//! implementation.

pub mod config;
pub mod error;
pub mod postgres;
pub mod store;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use postgres::{log_agent_messages, log_call_messages, PgDirectoryStore};
pub use store::{
    AgentEvent, CallEvent, CallMapping, DirectoryStore, MaintenanceStore, ProcedureMessage,
};
