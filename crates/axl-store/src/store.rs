//! Persistence traits and stored-procedure messages.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use axl_connector::{LoginUser, UserDeviceLine};

use crate::error::StoreResult;

/// Destination of reconciled directory batches.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Replace the user/device/line snapshot with this batch.
    async fn persist_user_device_lines(&self, rows: &[UserDeviceLine]) -> StoreResult<()>;

    /// Replace the login-user snapshot with this batch.
    async fn persist_login_users(&self, rows: &[LoginUser]) -> StoreResult<()>;
}

/// Follow-up procedures run on the recording database.
#[async_trait]
pub trait MaintenanceStore: Send + Sync {
    /// Create, update or retire QM agents from the imported users.
    async fn refresh_agents(&self, team: &str, role: &str) -> StoreResult<Vec<ProcedureMessage>>;

    /// Attach recent calls to users by device or by line.
    async fn update_calls(
        &self,
        mapping: CallMapping,
        hours_back: u32,
        set_direction: bool,
    ) -> StoreResult<Vec<ProcedureMessage>>;
}

/// How recorded calls are matched to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMapping {
    Device,
    Line,
}

impl CallMapping {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallMapping::Device => "device",
            CallMapping::Line => "line",
        }
    }
}

/// One `(message, data)` row returned by a maintenance procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcedureMessage {
    pub kind: String,
    pub data: String,
}

impl ProcedureMessage {
    pub fn new(kind: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: data.into(),
        }
    }

    pub fn agent_event(&self) -> AgentEvent {
        match self.kind.as_str() {
            "ADD" => AgentEvent::Added,
            "UPDATE" => AgentEvent::Updated,
            "DELETE" => AgentEvent::Deleted,
            "PROBLEM" => AgentEvent::Problem,
            "PARAM" => AgentEvent::Parameter,
            _ => AgentEvent::Other,
        }
    }

    pub fn call_event(&self) -> CallEvent {
        match self.kind.as_str() {
            "PREPARE" => CallEvent::Prepared,
            "UPDATE" => CallEvent::Updated,
            "LAST" => CallEvent::LastTimestamp,
            _ => CallEvent::Other,
        }
    }
}

/// Agent refresh messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentEvent {
    Added,
    Updated,
    /// Marked deleted and renamed.
    Deleted,
    Problem,
    /// Parameter used for inserts.
    Parameter,
    Other,
}

/// Call update messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEvent {
    /// Number of couples selected for processing.
    Prepared,
    /// Number of couples updated.
    Updated,
    /// Timestamp stored for the next run.
    LastTimestamp,
    Other,
}
