//! `PostgreSQL` implementation of the store traits.
//!
//! The recording database owns the schema. Each batch is sent as one JSON
//! array together with the DDL that unpacks it into a scratch table; the
//! `axl_data` procedures merge the scratch table into the live tables.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{debug, error, info, warn};

use axl_connector::{LoginUser, UserDeviceLine};

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::{
    AgentEvent, CallEvent, CallMapping, DirectoryStore, MaintenanceStore, ProcedureMessage,
};

const USER_DEVICE_SCRATCH_DDL: &str = "CREATE TABLE axl_data.axl_users_tmp AS \
    SELECT \
    (j.v ->> 'user_pkid')::varchar as user_pkid, \
    (j.v ->> 'device_pkid')::varchar as device_pkid, \
    (j.v ->> 'line_pkid')::varchar as line_pkid, \
    (j.v ->> 'firstname')::varchar as first_name, \
    (j.v ->> 'middlename')::varchar as middle_name, \
    (j.v ->> 'lastname')::varchar as last_name, \
    (j.v ->> 'userid')::varchar as user_id, \
    (j.v ->> 'department')::varchar as department, \
    (j.v ->> 'status')::int as status, \
    (j.v ->> 'islocaluser')::bool as is_local_user, \
    (j.v ->> 'uccx')::bool as has_uccx, \
    (j.v ->> 'directoryuri')::varchar as directory_uri, \
    (j.v ->> 'mailid')::varchar as mail_id, \
    (j.v ->> 'devicename')::varchar as device_name, \
    (j.v ->> 'devicedescrition')::varchar as device_description, \
    (j.v ->> 'dnorpattern')::varchar as line_number, \
    (j.v ->> 'alertingnameascii')::varchar as line_alerting_name, \
    (j.v ->> 'line_description')::varchar as line_description, \
    (j.v ->> 'cluster_name')::varchar as cluster_name \
    FROM json_array_elements($1::json) j(v); ";

const LOGIN_USER_SCRATCH_DDL: &str = "CREATE TABLE axl_data.axl_login_users_tmp AS \
    SELECT \
    (j.v ->> 'user_pkid')::varchar as user_pkid, \
    (j.v ->> 'firstname')::varchar as first_name, \
    (j.v ->> 'middlename')::varchar as middle_name, \
    (j.v ->> 'lastname')::varchar as last_name, \
    (j.v ->> 'userid')::varchar as user_id, \
    (j.v ->> 'department')::varchar as department, \
    (j.v ->> 'status')::int as status, \
    (j.v ->> 'islocaluser')::bool as is_local_user, \
    (j.v ->> 'uccx')::bool as has_uccx, \
    (j.v ->> 'directoryuri')::varchar as directory_uri, \
    (j.v ->> 'mailid')::varchar as mail_id, \
    (j.v ->> 'cluster_name')::varchar as cluster_name \
    FROM json_array_elements($1::json) j(v); ";

const UPDATE_USERS: &str = "SELECT axl_data.axl_update_users($1::varchar, $2::text)";
const UPDATE_LOGIN_USERS: &str = "SELECT axl_data.axl_update_login_users($1::varchar, $2::text)";
const UPDATE_QM: &str = "SELECT * from axl_data.axl_update_qm($1::varchar, $2::varchar)";
const UPDATE_CALLS_BY_DEVICE: &str = "SELECT * from axl_update_couples_by_device($1::int, $2::bool)";
const UPDATE_CALLS_BY_LINE: &str = "SELECT * from axl_update_couples_by_line($1::int, $2::bool)";

/// Store backed by the recording database.
#[derive(Debug, Clone)]
pub struct PgDirectoryStore {
    pool: PgPool,
}

impl PgDirectoryStore {
    /// Open a small connection pool.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        debug!(connection = %config.describe(), "Creating database connection pool");

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .acquire_timeout(config.connect_timeout())
            .connect_with(config.connect_options())
            .await
            .map_err(|e| StoreError::Connection {
                message: format!(
                    "Failed to connect to database at {}:{}",
                    config.host, config.port
                ),
                source: Some(e),
            })?;

        info!(host = %config.host, database = %config.database, "Database connection pool established");
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn load_batch(
        &self,
        procedure: &'static str,
        scratch_ddl: &str,
        json: String,
    ) -> StoreResult<()> {
        sqlx::query(procedure)
            .bind(scratch_ddl)
            .bind(json)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(command = procedure, error = %e, "Process AXL DB data update");
                StoreError::procedure(procedure, e)
            })?;
        info!(command = procedure, "Success update AXL source table");
        Ok(())
    }

    async fn fetch_messages(
        &self,
        procedure: &'static str,
        query: sqlx::query::Query<'_, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> StoreResult<Vec<ProcedureMessage>> {
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::procedure(procedure, e))?;
        rows.iter()
            .map(message_from_row)
            .collect::<Result<_, _>>()
            .map_err(|e| StoreError::procedure(procedure, e))
    }
}

fn message_from_row(row: &PgRow) -> Result<ProcedureMessage, sqlx::Error> {
    let kind: Option<String> = row.try_get(0)?;
    let data: Option<String> = row.try_get(1)?;
    Ok(ProcedureMessage::new(
        kind.unwrap_or_default(),
        data.unwrap_or_default(),
    ))
}

#[async_trait]
impl DirectoryStore for PgDirectoryStore {
    async fn persist_user_device_lines(&self, rows: &[UserDeviceLine]) -> StoreResult<()> {
        let json = serde_json::to_string(rows)?;
        debug!(rows = rows.len(), bytes = json.len(), "Persisting user/device/line batch");
        self.load_batch(UPDATE_USERS, USER_DEVICE_SCRATCH_DDL, json)
            .await
    }

    async fn persist_login_users(&self, rows: &[LoginUser]) -> StoreResult<()> {
        let json = serde_json::to_string(rows)?;
        debug!(rows = rows.len(), bytes = json.len(), "Persisting login-user batch");
        self.load_batch(UPDATE_LOGIN_USERS, LOGIN_USER_SCRATCH_DDL, json)
            .await
    }
}

#[async_trait]
impl MaintenanceStore for PgDirectoryStore {
    async fn refresh_agents(&self, team: &str, role: &str) -> StoreResult<Vec<ProcedureMessage>> {
        debug!(command = UPDATE_QM, team = %team, role = %role, "Process QM DB data update");
        let messages = self
            .fetch_messages(UPDATE_QM, sqlx::query(UPDATE_QM).bind(team).bind(role))
            .await?;
        info!(messages = messages.len(), "Success update QM users");
        log_agent_messages(&messages);
        Ok(messages)
    }

    async fn update_calls(
        &self,
        mapping: CallMapping,
        hours_back: u32,
        set_direction: bool,
    ) -> StoreResult<Vec<ProcedureMessage>> {
        let procedure = match mapping {
            CallMapping::Device => UPDATE_CALLS_BY_DEVICE,
            CallMapping::Line => UPDATE_CALLS_BY_LINE,
        };
        let hours = i32::try_from(hours_back).unwrap_or(i32::MAX);
        debug!(
            command = procedure,
            hours_back = hours,
            set_direction = set_direction,
            "Process DB couple data update"
        );
        let messages = self
            .fetch_messages(
                procedure,
                sqlx::query(procedure).bind(hours).bind(set_direction),
            )
            .await?;
        info!(mapping = mapping.as_str(), "Success update call data");
        log_call_messages(&messages);
        Ok(messages)
    }
}

/// Log agent refresh results at a level matching their meaning.
pub fn log_agent_messages(messages: &[ProcedureMessage]) {
    for m in messages {
        match m.agent_event() {
            AgentEvent::Added => info!(operation = %m.kind, user = %m.data, "Add new user to QM"),
            AgentEvent::Updated => {
                info!(operation = %m.kind, user = %m.data, "Update existing user in QM")
            }
            AgentEvent::Deleted => {
                info!(operation = %m.kind, user = %m.data, "Mark user deleted and rename it")
            }
            AgentEvent::Problem => {
                error!(operation = %m.kind, user = %m.data, "Problem update/insert users")
            }
            AgentEvent::Parameter => {
                info!(operation = %m.kind, parameter = %m.data, "Use parameters for insert")
            }
            AgentEvent::Other => {
                debug!(operation = %m.kind, message = %m.data, "Undefined process message")
            }
        }
    }
}

/// Log call update results.
pub fn log_call_messages(messages: &[ProcedureMessage]) {
    for m in messages {
        match m.call_event() {
            CallEvent::Prepared => {
                info!(process = %m.kind, records = %m.data, "Prepare couples to processing")
            }
            CallEvent::Updated => info!(process = %m.kind, records = %m.data, "Updated couples"),
            CallEvent::LastTimestamp => info!(
                process = %m.kind,
                last_ts = %m.data,
                "Stored last update timestamp from couples"
            ),
            CallEvent::Other => {
                warn!(process = %m.kind, message = %m.data, "Undefined process message")
            }
        }
    }
}
