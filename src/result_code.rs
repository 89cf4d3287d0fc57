//! Classification of install and uninstall result codes.
//!
//! `Win32_Product.Install` and `Win32_Product.Uninstall` return the exit
//! code of the Windows Installer engine. The [`ResultTable`] maps those codes
//! to a [`ResultCategory`] and a diagnostic message. The default table holds
//! the documented Windows Installer return codes; callers can extend or
//! replace it through [`ManagerOptions`](crate::ManagerOptions).

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// Width each numeric version component is padded to.
const VERSION_COMPONENT_WIDTH: usize = 10;

/// `ERROR_SUCCESS`.
pub const SUCCESS: u32 = 0;
/// `ERROR_SUCCESS_REBOOT_INITIATED`.
pub const SUCCESS_REBOOT_INITIATED: u32 = 1641;
/// `ERROR_SUCCESS_REBOOT_REQUIRED`.
pub const SUCCESS_REBOOT_REQUIRED: u32 = 3010;

/// Windows Installer return codes and their documented meaning.
const WINDOWS_INSTALLER_CODES: &[(u32, &str)] = &[
    (0, "The action completed successfully."),
    (13, "The data is invalid."),
    (87, "One of the parameters was invalid."),
    (120, "This value is returned when a custom action attempts to call a function that cannot be called from custom actions."),
    (1259, "This error code only occurs when using Windows Installer version 2.0 and Windows XP or later: the application is incompatible with this version of Windows."),
    (1601, "The Windows Installer service could not be accessed."),
    (1602, "The user canceled the installation."),
    (1603, "A fatal error occurred during installation."),
    (1604, "Installation suspended, incomplete."),
    (1605, "This action is only valid for products that are currently installed."),
    (1606, "The feature identifier is not registered."),
    (1607, "The component identifier is not registered."),
    (1608, "This is an unknown property."),
    (1609, "The handle is in an invalid state."),
    (1610, "The configuration data for this product is corrupt."),
    (1611, "The component qualifier not present."),
    (1612, "The installation source for this product is not available."),
    (1613, "This installation package cannot be installed by the Windows Installer service. A newer version of the Windows Installer service is required."),
    (1614, "The product is uninstalled."),
    (1615, "The SQL query syntax is invalid or unsupported."),
    (1616, "The record field does not exist."),
    (1618, "Another installation is already in progress. Complete that installation before proceeding with this install."),
    (1619, "This installation package could not be opened. Verify that the package exists and is accessible."),
    (1620, "This installation package could not be opened. Verify that this is a valid Windows Installer package."),
    (1621, "There was an error starting the Windows Installer service user interface."),
    (1622, "There was an error opening installation log file. Verify that the specified log file location exists and is writable."),
    (1623, "This language of this installation package is not supported by your system."),
    (1624, "There was an error applying transforms. Verify that the specified transform paths are valid."),
    (1625, "This installation is forbidden by system policy."),
    (1626, "The function could not be executed."),
    (1627, "The function failed during execution."),
    (1628, "An invalid or unknown table was specified."),
    (1629, "The data supplied is the wrong type."),
    (1630, "Data of this type is not supported."),
    (1631, "The Windows Installer service failed to start."),
    (1632, "The Temp folder is either full or inaccessible."),
    (1633, "This installation package is not supported on this platform."),
    (1634, "Component is not used on this machine."),
    (1635, "This patch package could not be opened. Verify that the patch package exists and is accessible."),
    (1636, "This patch package could not be opened. Verify that this is a valid Windows Installer patch package."),
    (1637, "This patch package cannot be processed by the Windows Installer service."),
    (1638, "Another version of this product is already installed."),
    (1639, "Invalid command line argument."),
    (1640, "The current user is not permitted to perform installations from a client session of a server running the Terminal Server role service."),
    (1641, "The installer has initiated a restart."),
    (1642, "The installer cannot install the upgrade patch because the program being upgraded may be missing or the upgrade patch updates a different version of the program."),
    (1643, "The patch package is not permitted by system policy."),
    (1644, "One or more customizations are not permitted by system policy."),
    (1645, "Windows Installer does not permit installation from a Remote Desktop Connection."),
    (1646, "The patch package is not a removable patch package."),
    (1647, "The patch is not applied to this product."),
    (1648, "No valid sequence could be found for the set of patches."),
    (1649, "Patch removal was disallowed by policy."),
    (1650, "The XML patch data is invalid."),
    (1651, "Administrative user failed to apply patch for a per-user managed or a per-machine application that is in advertised state."),
    (1652, "Windows Installer is not accessible when the computer is in Safe Mode."),
    (1653, "Could not perform a multiple-package transaction because rollback has been disabled."),
    (1654, "The app that you are trying to run is not supported on this version of Windows."),
    (3010, "A restart is required to complete the install. This does not include installs where the ForceReboot action is run."),
];

/// Outcome category of a result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultCategory {
    /// The operation completed.
    Success,
    /// The operation completed; the host must restart to finish.
    SuccessPendingRestart,
    /// The operation failed.
    Failure,
}

impl ResultCategory {
    /// True for both success categories.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success | Self::SuccessPendingRestart)
    }
}

/// A result code together with its category and diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedResult {
    pub code: u32,
    pub category: ResultCategory,
    pub message: String,
}

impl ClassifiedResult {
    pub fn is_success(&self) -> bool {
        self.category.is_success()
    }
}

/// Lookup table from result codes to categories and messages.
///
/// # Example
///
/// ```rust
/// use msi_fleet::{ResultCategory, ResultTable};
///
/// let table = ResultTable::default();
/// assert_eq!(table.classify(0), ResultCategory::Success);
/// assert_eq!(table.classify(3010), ResultCategory::SuccessPendingRestart);
/// assert_eq!(table.classify(1603), ResultCategory::Failure);
/// println!("{}", table.message(1603));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    /// Codes meaning plain success.
    pub success: BTreeSet<u32>,
    /// Codes meaning success with a restart pending.
    pub pending_restart: BTreeSet<u32>,
    /// Diagnostic message per code.
    pub messages: BTreeMap<u32, String>,
}

impl Default for ResultTable {
    fn default() -> Self {
        Self::windows_installer()
    }
}

impl ResultTable {
    /// Table of documented Windows Installer return codes.
    pub fn windows_installer() -> Self {
        Self {
            success: BTreeSet::from([SUCCESS]),
            pending_restart: BTreeSet::from([SUCCESS_REBOOT_INITIATED, SUCCESS_REBOOT_REQUIRED]),
            messages: WINDOWS_INSTALLER_CODES
                .iter()
                .map(|(code, message)| (*code, message.to_string()))
                .collect(),
        }
    }

    /// Category of a result code. Codes outside both success sets fail.
    pub fn classify(&self, code: u32) -> ResultCategory {
        if self.success.contains(&code) {
            ResultCategory::Success
        } else if self.pending_restart.contains(&code) {
            ResultCategory::SuccessPendingRestart
        } else {
            ResultCategory::Failure
        }
    }

    pub fn is_success(&self, code: u32) -> bool {
        self.classify(code).is_success()
    }

    pub fn is_restart_pending(&self, code: u32) -> bool {
        self.classify(code) == ResultCategory::SuccessPendingRestart
    }

    /// Diagnostic message for a code; unknown codes get a generic message.
    pub fn message(&self, code: u32) -> String {
        self.messages
            .get(&code)
            .cloned()
            .unwrap_or_else(|| format!("Unknown result code {}.", code))
    }

    /// Classify a code and attach its message.
    pub fn describe(&self, code: u32) -> ClassifiedResult {
        ClassifiedResult {
            code,
            category: self.classify(code),
            message: self.message(code),
        }
    }
}

/// Normalize a dotted version string into a key that sorts correctly as text.
///
/// Each numeric component is left-padded with zeros; other components are
/// kept verbatim.
///
/// ```rust
/// use msi_fleet::concatenated_version;
///
/// assert!(concatenated_version("1.9") < concatenated_version("1.10"));
/// ```
pub fn concatenated_version(version: &str) -> String {
    version
        .trim()
        .split('.')
        .map(|component| {
            let component = component.trim();
            if !component.is_empty() && component.chars().all(|c| c.is_ascii_digit()) {
                let digits = component.trim_start_matches('0');
                format!("{:0>width$}", digits, width = VERSION_COMPONENT_WIDTH)
            } else {
                component.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Compare two version strings component-wise.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    concatenated_version(a).cmp(&concatenated_version(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_codes() {
        let table = ResultTable::default();
        assert_eq!(table.classify(SUCCESS), ResultCategory::Success);
        assert!(table.is_success(SUCCESS));
        assert!(!table.is_restart_pending(SUCCESS));
    }

    #[test]
    fn test_pending_restart_codes() {
        let table = ResultTable::default();
        for code in [SUCCESS_REBOOT_INITIATED, SUCCESS_REBOOT_REQUIRED] {
            assert_eq!(table.classify(code), ResultCategory::SuccessPendingRestart);
            assert!(table.is_success(code));
            assert!(table.is_restart_pending(code));
        }
    }

    #[test]
    fn test_failure_codes() {
        let table = ResultTable::default();
        for code in [1602, 1603, 1605, 1618, 1619, 1638, 1639, 42, u32::MAX] {
            assert_eq!(table.classify(code), ResultCategory::Failure, "code {}", code);
        }
    }

    #[test]
    fn test_messages() {
        let table = ResultTable::default();
        assert!(table.message(1603).contains("fatal error"));
        assert!(table.message(1618).contains("Another installation"));
        assert_eq!(table.message(99999), "Unknown result code 99999.");
    }

    #[test]
    fn test_every_category_code_has_a_message() {
        let table = ResultTable::default();
        for code in table.success.iter().chain(table.pending_restart.iter()) {
            assert!(table.messages.contains_key(code), "code {}", code);
        }
    }

    #[test]
    fn test_describe() {
        let table = ResultTable::default();
        let result = table.describe(3010);
        assert_eq!(result.code, 3010);
        assert!(result.is_success());
        assert!(result.message.contains("restart"));
    }

    #[test]
    fn test_custom_table() {
        let mut table = ResultTable::default();
        table.pending_restart.insert(3011);
        table.messages.insert(3011, "Restart the service.".into());
        assert_eq!(table.classify(3011), ResultCategory::SuccessPendingRestart);
        assert_eq!(table.message(3011), "Restart the service.");
    }

    #[test]
    fn test_version_ordering() {
        assert_eq!(compare_versions("1.9", "1.10"), Ordering::Less);
        assert_eq!(compare_versions("1.10", "1.9"), Ordering::Greater);
        assert_eq!(compare_versions("8.0.2510.8", "8.0.2510.8"), Ordering::Equal);
        assert_eq!(compare_versions("2.0", "10.0"), Ordering::Less);
        assert_eq!(compare_versions("1.02", "1.2"), Ordering::Equal);
        assert_eq!(compare_versions("1.2", "1.2.1"), Ordering::Less);
    }

    #[test]
    fn test_concatenated_version_format() {
        assert_eq!(concatenated_version("1.10"), "0000000001.0000000010");
        assert_eq!(concatenated_version("1.beta"), "0000000001.beta");
        assert_eq!(concatenated_version(""), "");
    }

    #[test]
    fn test_table_serde_round_trip() {
        let table = ResultTable::default();
        let json = serde_json::to_string(&table).unwrap();
        let back: ResultTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
