//! Package records discovered on a host.

use chrono::NaiveDate;
use regex::Regex;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use strum::IntoEnumIterator;

/// Length of an unbraced, hyphenated GUID.
pub const IDENTIFYING_CODE_LEN: usize = 36;

/// Who the package was installed for.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter,
)]
pub enum AssignmentType {
    /// Per-user installation (raw value `0`).
    User,
    /// Per-machine installation (raw value `1`).
    Computer,
    /// Any other raw value, or missing.
    #[default]
    Unknown,
}

impl AssignmentType {
    /// Raw value reported by the channel, `None` for [`AssignmentType::Unknown`].
    pub fn raw(&self) -> Option<&'static str> {
        match self {
            Self::User => Some("0"),
            Self::Computer => Some("1"),
            Self::Unknown => None,
        }
    }

    /// Map a raw channel value. Unrecognized values become `Unknown`.
    ///
    /// ```rust
    /// use msi_fleet::AssignmentType;
    ///
    /// assert_eq!(AssignmentType::from_raw("1"), AssignmentType::Computer);
    /// assert_eq!(AssignmentType::from_raw("7"), AssignmentType::Unknown);
    /// ```
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim();
        Self::iter()
            .find(|kind| kind.raw() == Some(raw))
            .unwrap_or(Self::Unknown)
    }
}

/// Installation state of a package as reported by Windows Installer.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::EnumIter,
)]
pub enum InstallState {
    /// Configuration data is corrupt (`-6`).
    BadConfiguration,
    /// Invalid function argument (`-2`).
    InvalidArgument,
    /// The product is neither advertised nor installed (`-1`).
    UnknownPackage,
    /// Advertised but not installed (`1`).
    Advertised,
    /// Installed for a different user (`2`).
    Absent,
    /// Installed for the current user (`5`).
    Installed,
    /// Any other raw value, or missing.
    #[default]
    Unknown,
}

impl InstallState {
    /// Raw value reported by the channel, `None` for [`InstallState::Unknown`].
    pub fn raw(&self) -> Option<&'static str> {
        match self {
            Self::BadConfiguration => Some("-6"),
            Self::InvalidArgument => Some("-2"),
            Self::UnknownPackage => Some("-1"),
            Self::Advertised => Some("1"),
            Self::Absent => Some("2"),
            Self::Installed => Some("5"),
            Self::Unknown => None,
        }
    }

    /// Map a raw channel value. Unrecognized values become `Unknown`.
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim();
        Self::iter()
            .find(|state| state.raw() == Some(raw))
            .unwrap_or(Self::Unknown)
    }

    /// Human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::BadConfiguration => "Bad configuration",
            Self::InvalidArgument => "Invalid argument",
            Self::UnknownPackage => "Unknown package",
            Self::Advertised => "Advertised",
            Self::Absent => "Absent",
            Self::Installed => "Installed",
            Self::Unknown => "Unknown",
        }
    }
}

/// One installed package discovered on a host.
///
/// Records are built in full during a retrieval pass and never patched
/// afterwards; the next pass replaces them. Optional descriptive fields are
/// empty strings when the host did not report them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageRecord {
    /// Product code, unbraced (`26A24AE4-039D-4CA4-87B4-2F86418065F0`).
    pub identifying_code: String,
    pub name: String,
    /// Product version as reported (`major.minor.build`, possibly more parts).
    pub version: String,
    pub caption: String,
    pub description: String,
    pub help_link: String,
    pub install_location: String,
    pub install_source: String,
    /// Product language identifier.
    pub language: String,
    /// Path of the cached package in the installer cache.
    pub local_package: String,
    pub package_cache: String,
    pub package_code: String,
    pub package_name: String,
    pub product_id: String,
    pub registered_owner: String,
    /// Applied transforms.
    pub transforms: String,
    pub url_info_about: String,
    pub url_update_info: String,
    pub vendor: String,
    /// Raw install date, `yyyyMMdd`.
    pub install_date: String,
    pub assignment_type: AssignmentType,
    pub install_state: InstallState,
}

impl PackageRecord {
    /// Create a record with its identifying fields; descriptive fields are empty.
    pub fn new(
        identifying_code: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            identifying_code: identifying_code.into(),
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Whether this record has the given identifying code (ASCII case ignored).
    pub fn has_code(&self, code: &str) -> bool {
        self.identifying_code.eq_ignore_ascii_case(code)
    }

    /// Parsed install date, when the raw value is a valid `yyyyMMdd` date.
    pub fn install_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.install_date.trim(), "%Y%m%d").ok()
    }

    /// Install date rendered as `dd/MM/yyyy`, empty when unparsable.
    ///
    /// ```rust
    /// use msi_fleet::PackageRecord;
    ///
    /// let mut record = PackageRecord::new("26A24AE4-039D-4CA4-87B4-2F86418065F0", "Java", "8.0.2510.8");
    /// record.install_date = "20200427".to_string();
    /// assert_eq!(record.formatted_install_date(), "27/04/2020");
    /// ```
    pub fn formatted_install_date(&self) -> String {
        self.install_date()
            .map(|date| date.format("%d/%m/%Y").to_string())
            .unwrap_or_default()
    }

    /// First `major.minor.patch` triple found in the version string.
    ///
    /// Windows Installer versions are `major.minor.build`, which maps onto
    /// a semantic version; a fourth component is ignored.
    pub fn semantic_version(&self) -> Option<Version> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let re = PATTERN
            .get_or_init(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("valid version pattern"));
        let caps = re.captures(&self.version)?;
        let major = caps.get(1)?.as_str().parse().ok()?;
        let minor = caps.get(2)?.as_str().parse().ok()?;
        let patch = caps.get(3)?.as_str().parse().ok()?;
        Some(Version::new(major, minor, patch))
    }
}

/// Whether `code` is an unbraced hyphenated GUID.
pub fn is_identifying_code(code: &str) -> bool {
    code.len() == IDENTIFYING_CODE_LEN
        && code.char_indices().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

/// Strip the curly braces the channel puts around product codes.
///
/// Returns `None` when what is left is not a 36-character GUID.
///
/// ```rust
/// use msi_fleet::normalize_identifying_code;
///
/// assert_eq!(
///     normalize_identifying_code("{26A24AE4-039D-4CA4-87B4-2F86418065F0}").as_deref(),
///     Some("26A24AE4-039D-4CA4-87B4-2F86418065F0")
/// );
/// assert_eq!(normalize_identifying_code("{not-a-guid}"), None);
/// ```
pub fn normalize_identifying_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let inner = trimmed.strip_prefix('{').unwrap_or(trimmed);
    let inner = inner.strip_suffix('}').unwrap_or(inner);
    is_identifying_code(inner).then(|| inner.to_string())
}

/// Brace-qualify a code for use in channel query syntax.
pub fn bracketed(code: &str) -> String {
    format!("{{{}}}", code)
}
