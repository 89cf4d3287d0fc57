//! # msi-fleet
//!
//! Inventory, filter, install and uninstall Windows Installer packages across
//! a fleet of local and remote hosts.
//!
//! This crate provides the orchestration engine of a fleet package manager.
//! It talks to hosts only through two boundaries supplied by the caller: a
//! [`ManagementChannel`] (WMI or similar) for queries and method calls, and a
//! [`ShareTransport`] for the administrative share used to stage installers.
//!
//! ## Features
//!
//! - `Host` with single-flight, cancellable inventory retrieval
//! - `filter_packages()` include/exclude wildcard filtering over product codes
//! - `Fleet::install()` staging, install and cleanup with progress reporting
//! - `Fleet::uninstall()` batches with a per-host handled list
//! - `ResultTable` classification of Windows Installer result codes
//!
//! ## Example
//!
//! ```rust,no_run
//! use msi_fleet::{Credentials, Fleet, ManagementChannel, ManagerOptions, NetUseTransport};
//! use std::sync::Arc;
//!
//! async fn run(channel: Arc<dyn ManagementChannel>) -> std::io::Result<()> {
//!     let options = ManagerOptions::default();
//!     let transport = Arc::new(NetUseTransport::locate(options.command_timeout)?);
//!     let mut fleet = Fleet::new(channel, transport, options);
//!
//!     fleet.add_local_host();
//!     let _ = fleet.add_host("srv01", Some(Credentials::new(r"CORP\admin", "secret")));
//!     fleet.set_patterns("26A24AE4%", "");
//!
//!     for report in fleet.refresh_all().await {
//!         println!("{}: {} packages", report.host, report.packages);
//!     }
//!     for package in fleet.packages("srv01").unwrap_or_default() {
//!         println!("{} {} {}", package.identifying_code, package.name, package.version);
//!     }
//!     fleet.shutdown().await;
//!     Ok(())
//! }
//! ```

mod channel;
mod error;
mod filter;
mod fleet;
mod host;
mod messages;
mod options;
mod package;
mod progress;
mod result_code;
mod share;
mod startup;

#[cfg(test)]
mod testing;

pub use channel::{ChannelError, Credentials, HostTarget, Location, ManagementChannel, Row, Value};
pub use error::ManagerError;
pub use filter::{
    filter_packages, is_pattern_char, join_codes, matches_pattern, sanitize_pattern,
    sanitize_with_caret, split_codes, PatternSet, DELIMITERS, WILDCARD,
};
pub use fleet::{Fleet, InstallOutcome, UninstallBatch, UninstallRow, UninstallStatus};
pub use host::{
    DroppedRecord, FieldFault, Host, HostSummary, RetrievalReport, RetrievalTicket, NOBODY,
};
pub use messages::{MessageCatalog, MessageKey};
pub use options::{ManagerOptions, ShareOptions};
pub use package::{
    bracketed, is_identifying_code, normalize_identifying_code, AssignmentType, InstallState,
    PackageRecord, IDENTIFYING_CODE_LEN,
};
pub use progress::InstallProgress;
pub use result_code::{
    compare_versions, concatenated_version, ClassifiedResult, ResultCategory, ResultTable,
    SUCCESS, SUCCESS_REBOOT_INITIATED, SUCCESS_REBOOT_REQUIRED,
};
pub use share::{
    stage, test_credentials, MountGuard, NetUseTransport, ShareTransport, StageRequest,
    StagedInstall,
};
pub use startup::{parse_host_list, StartupArgs};
