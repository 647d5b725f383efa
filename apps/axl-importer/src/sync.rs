//! Directory sync and call update runs.

use std::sync::Arc;
use std::time::Instant;

use tokio::process::Command;
use tracing::{debug, error, info, instrument, warn};

use axl_connector::{reconcile, AxlConnector, UserDeviceLine};
use axl_store::{DirectoryStore, MaintenanceStore};

use crate::config::{CacheRefresh, ImporterConfig};
use crate::error::{ImporterError, ImporterResult};

const CACHE_TERMINAL_URL: &str = "localhost:8765";

/// Counters from one directory sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub schema_version: String,
    pub login_users: usize,
    pub user_device_lines: usize,
    pub removed_rows: usize,
    pub ambiguities: usize,
    pub agent_messages: usize,
    pub cache_refresh_attempted: bool,
    pub cache_refreshed: bool,
    /// Steps that failed without ending the run.
    pub errors: Vec<String>,
}

/// Counters from one call update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallUpdateReport {
    pub procedures: usize,
    pub messages: usize,
}

/// Runs imports against one CUCM publisher and one store.
pub struct SyncJob<S> {
    config: Arc<ImporterConfig>,
    store: Arc<S>,
}

impl<S> Clone for SyncJob<S> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> SyncJob<S>
where
    S: DirectoryStore + MaintenanceStore + 'static,
{
    pub fn new(config: Arc<ImporterConfig>, store: Arc<S>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// Import login users and user/device/line associations.
    ///
    /// A fresh AXL session is negotiated on every run. A failing step is
    /// logged and recorded in [`SyncReport::errors`] and the run goes on, so
    /// the cache is still refreshed for whatever was persisted. Only
    /// failures concerning the whole server (transport, credentials,
    /// version) end the run early.
    #[instrument(skip(self), fields(server = %self.config.axl.server))]
    pub async fn run_directory_sync(&self) -> ImporterResult<SyncReport> {
        let started = Instant::now();
        let processing = &self.config.processing;
        let mut report = SyncReport::default();

        let mut connector = AxlConnector::new(self.config.axl_config())?;
        report.schema_version = connector.ensure_negotiated().await.map_err(|e| {
            error!(error = %e, "Problem with AXL connection or schema version not supported");
            e
        })?;

        let mut persisted = false;

        match connector
            .fetch_login_users(&self.config.axl.access_group, processing.coexist_ccx_importer)
            .await
        {
            Ok(users) if users.is_empty() => {
                warn!(access_group = %self.config.axl.access_group, "No login users read from AXL");
            }
            Ok(users) => {
                info!(valid_rows = users.len(), "Prepared login user rows");
                match self.store.persist_login_users(&users).await {
                    Ok(()) => {
                        report.login_users = users.len();
                        persisted = true;
                    }
                    Err(e) => {
                        error!(error = %e, "Cannot update login users");
                        report.errors.push(format!("login users: {e}"));
                    }
                }
            }
            Err(e) if e.is_fatal_for_run() => return Err(e.into()),
            Err(e) => {
                error!(error = %e, code = e.error_code(), "Cannot read login users");
                report.errors.push(format!("login users: {e}"));
            }
        }

        match connector
            .fetch_user_device_lines(&self.config.database.jtapi_users, processing.coexist_ccx_importer)
            .await
        {
            Ok(rows) => persisted |= self.import_user_device_lines(rows, &mut report).await,
            Err(e) if e.is_fatal_for_run() => return Err(e.into()),
            Err(e) => {
                error!(error = %e, code = e.error_code(), "Cannot read user/device/line rows");
                report.errors.push(format!("user/device/line: {e}"));
            }
        }

        if persisted {
            if let Some(cache) = &processing.cache_refresh {
                report.cache_refresh_attempted = true;
                match refresh_cache(cache).await {
                    Ok(()) => report.cache_refreshed = true,
                    Err(e) => {
                        error!(error = %e, "Cache refresh failed");
                        report.errors.push(e.to_string());
                    }
                }
            } else {
                debug!("Cache refresh not configured");
            }
        }

        info!(
            login_users = report.login_users,
            user_device_lines = report.user_device_lines,
            errors = report.errors.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Directory sync finished"
        );
        Ok(report)
    }

    /// Reconcile, persist and refresh QM agents. Returns whether the batch
    /// was persisted.
    async fn import_user_device_lines(
        &self,
        rows: Vec<UserDeviceLine>,
        report: &mut SyncReport,
    ) -> bool {
        let processing = &self.config.processing;
        let reconciliation = reconcile(rows);
        for ambiguity in &reconciliation.ambiguities {
            error!(kind = %ambiguity.kind, name = %ambiguity.name, "{ambiguity}");
        }
        report.removed_rows = reconciliation.removed;
        report.ambiguities = reconciliation.ambiguities.len();
        info!(
            valid_rows = reconciliation.rows.len(),
            removed_rows = reconciliation.removed,
            "Prepared user/device/line rows"
        );

        if reconciliation.rows.is_empty() {
            warn!("No valid user/device/line rows to import");
            return false;
        }

        if let Err(e) = self
            .store
            .persist_user_device_lines(&reconciliation.rows)
            .await
        {
            error!(error = %e, "Cannot update user/device/line rows");
            report.errors.push(format!("user/device/line: {e}"));
            return false;
        }
        report.user_device_lines = reconciliation.rows.len();

        match self
            .store
            .refresh_agents(&processing.default_team_name, &processing.default_role_name)
            .await
        {
            Ok(messages) => report.agent_messages = messages.len(),
            Err(e) => {
                error!(error = %e, code = e.error_code(), "Cannot refresh QM agents");
                report.errors.push(format!("agent refresh: {e}"));
            }
        }
        true
    }

    /// Attach recent recorded calls to users.
    ///
    /// With `both` mapping, the line update is skipped when the device
    /// update fails.
    #[instrument(skip(self), fields(mapping = %self.config.processing.mapping_type.as_str()))]
    pub async fn run_call_update(&self) -> ImporterResult<CallUpdateReport> {
        let processing = &self.config.processing;
        let mut report = CallUpdateReport::default();

        for mapping in processing.mapping_type.call_mappings() {
            let messages = self
                .store
                .update_calls(mapping, processing.hours_back, processing.set_direction)
                .await
                .map_err(|e| {
                    error!(mapping = mapping.as_str(), error = %e, "Call update failed");
                    e
                })?;
            report.procedures += 1;
            report.messages += messages.len();
        }

        debug!(procedures = report.procedures, messages = report.messages, "Call update finished");
        Ok(report)
    }
}

/// `java -jar <xterm> java --url localhost:8765 -i <flush>`
pub fn cache_refresh_command(cache: &CacheRefresh) -> Command {
    let mut command = Command::new("java");
    command
        .arg("-jar")
        .arg(&cache.java_xterm)
        .args(["java", "--url", CACHE_TERMINAL_URL, "-i"])
        .arg(&cache.flush_command);
    command
}

async fn refresh_cache(cache: &CacheRefresh) -> ImporterResult<()> {
    debug!(jar = %cache.java_xterm.display(), "Running cache refresh");
    let output = cache_refresh_command(cache)
        .output()
        .await
        .map_err(|e| ImporterError::CacheRefresh {
            message: format!("cannot start java: {e}"),
            source: Some(e),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    debug!(stdout = %stdout.trim(), stderr = %stderr.trim(), "Cache refresh output");

    if !output.status.success() {
        return Err(ImporterError::CacheRefresh {
            message: format!("command exited with {}", output.status),
            source: None,
        });
    }
    info!("Cache refreshed");
    Ok(())
}
