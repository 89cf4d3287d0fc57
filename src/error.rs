//! Error types for fleet operations.
//!
//! This module defines the errors that host queries, staging, install and
//! uninstall can raise. Each variant names the host it happened on and
//! offers an actionable fix suggestion through [`ManagerError::fix_suggestion`].

use crate::channel::ChannelError;
use thiserror::Error;

/// Errors that can occur while managing packages on a host.
///
/// Retrieval never raises these to the caller; a failed retrieval stores
/// its error on the host instead (see [`Host::last_error`](crate::Host::last_error)).
/// Install, uninstall and staging return them directly.
///
/// # Example
///
/// ```rust
/// use msi_fleet::ManagerError;
///
/// fn report(error: &ManagerError) {
///     eprintln!("Operation failed: {}", error);
///     eprintln!("To fix: {}", error.fix_suggestion());
/// }
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ManagerError {
    /// The credentials were rejected by the management channel or the share.
    #[error("Access denied on {host}: {message}")]
    Authorization {
        /// Host that rejected the credentials.
        host: String,
        /// Description returned by the transport.
        message: String,
    },

    /// The host could not be reached at the transport level.
    #[error("Cannot reach {host}: {message}")]
    Connectivity {
        /// Host that could not be reached.
        host: String,
        /// Description returned by the transport.
        message: String,
    },

    /// Copying the installer or its auxiliary files to the host failed.
    ///
    /// Raised before any install was attempted, so the package state on the
    /// host is unchanged.
    #[error("Could not copy installation files to {host}: {source}")]
    Staging {
        /// Host the files were being copied to.
        host: String,
        /// Underlying mount or I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The package to uninstall is not present on the host.
    #[error("Package {code} is not installed on {host}")]
    NotFound {
        /// Host that was queried.
        host: String,
        /// Identifying code that was looked up (unbraced).
        code: String,
    },

    /// Any other management channel fault.
    #[error("Management channel fault on {host}: {message}")]
    Channel {
        /// Host the channel was talking to.
        host: String,
        /// Message carried by the channel fault.
        message: String,
    },

    /// The caller's request was rejected before contacting the host.
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with the request.
        message: String,
    },
}

impl ManagerError {
    /// Attach a host name to a channel fault.
    pub(crate) fn from_channel(host: &str, error: ChannelError) -> Self {
        let host = host.to_string();
        match error {
            ChannelError::AccessDenied(message) => Self::Authorization { host, message },
            ChannelError::Unreachable(message) => Self::Connectivity { host, message },
            ChannelError::Fault(message) => Self::Channel { host, message },
        }
    }

    /// Host the error is about, when it concerns a specific host.
    pub fn host(&self) -> Option<&str> {
        match self {
            Self::Authorization { host, .. }
            | Self::Connectivity { host, .. }
            | Self::Staging { host, .. }
            | Self::NotFound { host, .. }
            | Self::Channel { host, .. } => Some(host),
            Self::InvalidRequest { .. } => None,
        }
    }

    /// Whether this error means the supplied credentials were refused.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization { .. })
    }

    /// Get an actionable suggestion for fixing this error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use msi_fleet::ManagerError;
    ///
    /// let error = ManagerError::NotFound {
    ///     host: "srv01".to_string(),
    ///     code: "26A24AE4-039D-4CA4-87B4-2F86418065F0".to_string(),
    /// };
    /// assert!(error.fix_suggestion().contains("Refresh"));
    /// ```
    pub fn fix_suggestion(&self) -> &'static str {
        match self {
            Self::Authorization { .. } => {
                "Check the username and password; the account needs administrative rights on the host"
            }
            Self::Connectivity { .. } => {
                "Check that the host is powered on, resolvable and not blocked by a firewall"
            }
            Self::Staging { .. } => {
                "Check that the administrative share is reachable and has enough free space"
            }
            Self::NotFound { .. } => {
                "Refresh the host's package list; the package may already be gone"
            }
            Self::Channel { .. } => "See the channel message for details and retry the operation",
            Self::InvalidRequest { .. } => "Correct the installer path and auxiliary file list",
        }
    }
}
