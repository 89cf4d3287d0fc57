//! Fleet configuration.
//!
//! This module provides [`ManagerOptions`], the explicit configuration object
//! passed to every host of a fleet. It carries timeouts, the administrative
//! share layout used for staging, the result-code table and the message
//! catalog.

use crate::messages::MessageCatalog;
use crate::result_code::ResultTable;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for hosts and fleet operations.
///
/// # Default Behavior
///
/// A torn-down host gives its retrieval task 500 ms to stop before
/// abandoning it. `net use` invocations time out after 30 seconds. Staging
/// goes through `\\host\C$\Windows` into `Temp\MsiManager`.
///
/// # Example
///
/// ```rust
/// use msi_fleet::ManagerOptions;
/// use std::time::Duration;
///
/// let opts = ManagerOptions {
///     retrieval_grace: Duration::from_secs(2),
///     ..Default::default()
/// };
/// assert_eq!(opts.share.unc_root("srv01"), r"\\srv01\C$\Windows");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerOptions {
    /// How long host teardown waits for an in-flight retrieval to stop.
    ///
    /// Default: 500 milliseconds
    #[serde(with = "millis")]
    pub retrieval_grace: Duration,

    /// Timeout for each share mount or unmount command.
    ///
    /// Default: 30 seconds
    #[serde(with = "millis")]
    pub command_timeout: Duration,

    /// Administrative share layout.
    pub share: ShareOptions,

    /// Result-code classification table.
    pub results: ResultTable,

    /// Operator-facing texts.
    pub messages: MessageCatalog,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            retrieval_grace: Duration::from_millis(500),
            command_timeout: Duration::from_secs(30),
            share: ShareOptions::default(),
            results: ResultTable::default(),
            messages: MessageCatalog::default(),
        }
    }
}

/// Where staged files go on the target host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShareOptions {
    /// Administrative share name. Default: `C$`
    pub admin_share: String,
    /// Folder under the share that is mounted. Default: `Windows`
    pub share_root: String,
    /// The mounted folder as seen locally on the target. Default: `C:\Windows`
    pub target_root: String,
    /// Staging folder relative to the mounted folder. Default: `Temp\MsiManager`
    pub staging_dir: String,
}

impl Default for ShareOptions {
    fn default() -> Self {
        Self {
            admin_share: "C$".to_string(),
            share_root: "Windows".to_string(),
            target_root: r"C:\Windows".to_string(),
            staging_dir: r"Temp\MsiManager".to_string(),
        }
    }
}

impl ShareOptions {
    /// UNC path of the mounted folder on a host.
    pub fn unc_root(&self, host: &str) -> String {
        join_windows(&[
            &format!(r"\\{}", host),
            &self.admin_share,
            &self.share_root,
        ])
    }

    /// Staging folder components relative to the mounted folder.
    pub fn staging_components(&self) -> Vec<&str> {
        self.staging_dir
            .split(['\\', '/'])
            .filter(|part| !part.is_empty())
            .collect()
    }

    /// Target-local path of a file staged in `subfolder`.
    pub fn target_path(&self, subfolder: &str, file_name: &str) -> String {
        join_windows(&[&self.target_root, &self.staging_dir, subfolder, file_name])
    }
}

/// Join path parts with backslashes, dropping empty parts and stray separators.
fn join_windows(parts: &[&str]) -> String {
    let mut joined = String::new();
    for part in parts {
        let part = part.trim_end_matches(['\\', '/']);
        let part = if joined.is_empty() {
            part
        } else {
            part.trim_start_matches(['\\', '/'])
        };
        if part.is_empty() {
            continue;
        }
        if !joined.is_empty() {
            joined.push('\\');
        }
        joined.push_str(part);
    }
    joined
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
