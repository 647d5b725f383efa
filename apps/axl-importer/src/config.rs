//! Importer configuration loading and validation.

use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use axl_connector::AxlConfig;
use axl_store::{CallMapping, StoreConfig};

use crate::error::ConfigError;

/// Default configuration file when neither flag nor env var is set.
pub const DEFAULT_CONFIG_PATH: &str = "server.yml";

const REDACTED: &str = "***";

static DNS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)*$")
        .expect("valid DNS name regex")
});

static DOTTED_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9.]+$").expect("valid dotted digits regex"));

/// Root importer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImporterConfig {
    pub axl: AxlSection,
    pub database: DatabaseSection,
    #[serde(default)]
    pub log: LogSection,
    #[serde(default)]
    pub processing: ProcessingSection,
}

/// CUCM publisher access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AxlSection {
    pub server: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Access control group whose members may log in to QM.
    pub access_group: String,
    #[serde(default = "default_true")]
    pub ignore_certificate: bool,
    #[serde(default = "default_axl_timeout")]
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_axl_timeout() -> u64 {
    30
}

/// Recording database access.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseSection {
    #[serde(default = "default_db_host")]
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_db_name")]
    pub name: String,
    /// Application users whose controlled devices are recorded.
    pub jtapi_users: Vec<String>,
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_name() -> String {
    "callrec".to_string()
}

/// Logging output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
    /// Daily rolling log file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Suppress console output.
    #[serde(default)]
    pub quiet: bool,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
            file: None,
            quiet: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LogSection {
    /// `EnvFilter` directive for the configured level.
    ///
    /// Accepts full names and the short aliases (`F`, `FAT`, `W`, `WAR`, ...)
    /// case-insensitively; anything else falls back to `info`.
    pub fn filter_directive(&self) -> &'static str {
        match self.level.to_uppercase().as_str() {
            "FAT" | "F" | "FATAL" | "ERR" | "E" | "ERROR" => "error",
            "WAR" | "W" | "WARN" | "WARNING" => "warn",
            "DEB" | "D" | "DEBUG" => "debug",
            "TRC" | "T" | "TRACE" => "trace",
            _ => "info",
        }
    }
}

/// How recorded calls are attached to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MappingType {
    Device,
    Line,
    Both,
}

impl From<String> for MappingType {
    fn from(value: String) -> Self {
        match value.to_lowercase().as_str() {
            "device" => MappingType::Device,
            "line" => MappingType::Line,
            _ => MappingType::Both,
        }
    }
}

impl From<MappingType> for String {
    fn from(value: MappingType) -> Self {
        value.as_str().to_string()
    }
}

impl MappingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingType::Device => "device",
            MappingType::Line => "line",
            MappingType::Both => "both",
        }
    }

    /// Call update procedures to run, in order.
    pub fn call_mappings(&self) -> Vec<CallMapping> {
        match self {
            MappingType::Device => vec![CallMapping::Device],
            MappingType::Line => vec![CallMapping::Line],
            MappingType::Both => vec![CallMapping::Device, CallMapping::Line],
        }
    }
}

/// External command flushing the recorder user cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheRefresh {
    /// Path to the terminal jar.
    pub java_xterm: PathBuf,
    /// Path to the command file executed by the terminal.
    pub flush_command: PathBuf,
}

/// Scheduling and import behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProcessingSection {
    #[serde(default = "default_hours_back")]
    pub hours_back: u32,
    #[serde(default = "default_user_import_hours")]
    pub user_import_hours: Vec<u32>,
    #[serde(default = "default_team_name")]
    pub default_team_name: String,
    #[serde(default = "default_role_name")]
    pub default_role_name: String,
    #[serde(default = "default_update_interval")]
    pub update_interval_minutes: u32,
    #[serde(default = "default_mapping_type")]
    pub mapping_type: MappingType,
    #[serde(default = "default_true")]
    pub set_direction: bool,
    #[serde(default)]
    pub coexist_ccx_importer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_refresh: Option<CacheRefresh>,
}

impl Default for ProcessingSection {
    fn default() -> Self {
        Self {
            hours_back: default_hours_back(),
            user_import_hours: default_user_import_hours(),
            default_team_name: default_team_name(),
            default_role_name: default_role_name(),
            update_interval_minutes: default_update_interval(),
            mapping_type: default_mapping_type(),
            set_direction: true,
            coexist_ccx_importer: false,
            cache_refresh: None,
        }
    }
}

fn default_hours_back() -> u32 {
    48
}

fn default_user_import_hours() -> Vec<u32> {
    vec![4]
}

fn default_team_name() -> String {
    "_CUCM_imported".to_string()
}

fn default_role_name() -> String {
    "Agent".to_string()
}

fn default_update_interval() -> u32 {
    5
}

fn default_mapping_type() -> MappingType {
    MappingType::Both
}

const MAX_HOURS_BACK: u32 = 30 * 24;

impl ImporterConfig {
    /// Load and validate configuration from a file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Read {
                path: path.as_ref().display().to_string(),
                source,
            })?;

        let mut config = Self::parse(&content)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse YAML, falling back to JSON. The YAML error is reported when
    /// both fail.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        match serde_yaml::from_str(content) {
            Ok(config) => Ok(config),
            Err(yaml_err) => serde_json::from_str(content)
                .map_err(|_| ConfigError::Parse(yaml_err.to_string())),
        }
    }

    /// Secrets may be supplied through the environment instead of the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var("AXL_IMPORTER_AXL_PASSWORD") {
            self.axl.password = password;
        }
        if let Ok(password) = std::env::var("AXL_IMPORTER_DB_PASSWORD") {
            self.database.password = password;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_axl()?;
        self.validate_database()?;
        self.validate_processing()
    }

    fn validate_axl(&self) -> Result<(), ConfigError> {
        let axl = &self.axl;
        if axl.server.trim().is_empty() {
            return Err(ConfigError::invalid("axl.server", "not defined"));
        }
        if !is_valid_server(&axl.server) {
            return Err(ConfigError::invalid(
                "axl.server",
                format!("{} is not a valid DNS name or IPv4 address", axl.server),
            ));
        }
        if axl.user.trim().is_empty() {
            return Err(ConfigError::invalid("axl.user", "not defined"));
        }
        if axl.password.is_empty() {
            return Err(ConfigError::invalid("axl.password", "not defined"));
        }
        if axl.access_group.trim().is_empty() {
            return Err(ConfigError::invalid("axl.access_group", "not defined"));
        }
        if axl.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "axl.timeout_secs",
                "must be greater than zero",
            ));
        }
        Ok(())
    }

    fn validate_database(&self) -> Result<(), ConfigError> {
        let db = &self.database;
        if db.host.trim().is_empty() {
            return Err(ConfigError::invalid("database.host", "not defined"));
        }
        if db.port < 1025 {
            return Err(ConfigError::invalid(
                "database.port",
                format!("{} is outside 1025-65535", db.port),
            ));
        }
        if db.user.trim().is_empty() {
            return Err(ConfigError::invalid("database.user", "not defined"));
        }
        if db.jtapi_users.is_empty() {
            return Err(ConfigError::invalid(
                "database.jtapi_users",
                "at least one JTAPI user is required",
            ));
        }
        if db.jtapi_users.iter().any(|u| u.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "database.jtapi_users",
                "empty user name",
            ));
        }
        Ok(())
    }

    fn validate_processing(&self) -> Result<(), ConfigError> {
        let p = &self.processing;
        if !(1..=MAX_HOURS_BACK).contains(&p.hours_back) {
            return Err(ConfigError::invalid(
                "processing.hours_back",
                format!("{} is outside 1-{MAX_HOURS_BACK}", p.hours_back),
            ));
        }

        if p.user_import_hours.is_empty() || p.user_import_hours.len() > 24 {
            return Err(ConfigError::invalid(
                "processing.user_import_hours",
                "expected between 1 and 24 hours",
            ));
        }
        let mut seen = HashSet::new();
        for hour in &p.user_import_hours {
            if *hour > 23 {
                return Err(ConfigError::invalid(
                    "processing.user_import_hours",
                    format!("{hour} is outside 0-23"),
                ));
            }
            if !seen.insert(*hour) {
                return Err(ConfigError::invalid(
                    "processing.user_import_hours",
                    format!("{hour} is listed twice"),
                ));
            }
        }

        if p.default_team_name.trim().is_empty() {
            return Err(ConfigError::invalid(
                "processing.default_team_name",
                "not defined",
            ));
        }
        if p.default_role_name.trim().is_empty() {
            return Err(ConfigError::invalid(
                "processing.default_role_name",
                "not defined",
            ));
        }

        let max_interval = p.hours_back * 30;
        if !(1..=max_interval).contains(&p.update_interval_minutes) {
            return Err(ConfigError::invalid(
                "processing.update_interval_minutes",
                format!(
                    "{} is outside 1-{max_interval}",
                    p.update_interval_minutes
                ),
            ));
        }

        if let Some(cache) = &p.cache_refresh {
            if cache.java_xterm.as_os_str().is_empty() || cache.flush_command.as_os_str().is_empty()
            {
                return Err(ConfigError::invalid(
                    "processing.cache_refresh",
                    "java_xterm and flush_command are both required",
                ));
            }
        }
        Ok(())
    }

    /// Copy with passwords replaced, for `--show` and logs.
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.axl.password.is_empty() {
            config.axl.password = REDACTED.to_string();
        }
        if !config.database.password.is_empty() {
            config.database.password = REDACTED.to_string();
        }
        config
    }

    /// YAML rendering of [`Self::redacted`].
    pub fn show(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(&self.redacted()).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn axl_config(&self) -> AxlConfig {
        let config = AxlConfig::new(&self.axl.server, &self.axl.user, &self.axl.password)
            .with_timeout_secs(self.axl.timeout_secs)
            .with_verify_certificate(!self.axl.ignore_certificate);
        match &self.axl.endpoint {
            Some(endpoint) => config.with_endpoint(endpoint),
            None => config,
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::new(&self.database.user, &self.database.password)
            .with_host(&self.database.host)
            .with_port(self.database.port);
        config.database = self.database.name.clone();
        config
    }
}

/// IPv4 literal or DNS host name.
pub fn is_valid_server(server: &str) -> bool {
    if server.parse::<Ipv4Addr>().is_ok() {
        return true;
    }
    if DOTTED_DIGITS.is_match(server) {
        return false;
    }
    server.len() <= 253 && DNS_NAME.is_match(server)
}
