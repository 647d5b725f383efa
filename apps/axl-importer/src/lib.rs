//! # AXL Importer
//!
//! Scheduled import of Cisco UCM directory data into the call recording
//! database.
//!
//! - [`sync::SyncJob`] runs one directory sync (login users, then
//!   reconciled user/device/line rows, then QM agent refresh) or one call
//!   update.
//! - [`scheduler::Scheduler`] repeats call updates every
//!   `update_interval_minutes` and directory syncs at the configured
//!   import hours.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod scheduler;
pub mod sync;

pub use cli::Cli;
pub use config::ImporterConfig;
pub use error::{ConfigError, ImporterError, ImporterResult};
pub use scheduler::{shutdown_signal, Scheduler};
pub use sync::{CallUpdateReport, SyncJob, SyncReport};
