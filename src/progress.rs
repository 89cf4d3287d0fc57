//! Progress reporting for install operations.
//!
//! This module provides [`InstallProgress`], the discrete stages of an
//! install that [`Fleet::install`](crate::Fleet::install) reports through a
//! callback.

use crate::messages::{MessageCatalog, MessageKey};

/// Progress stages during a package install on one host.
///
/// # Example
///
/// ```rust
/// use msi_fleet::{InstallProgress, MessageCatalog};
///
/// let catalog = MessageCatalog::default();
/// let on_progress = |progress: InstallProgress| {
///     println!("[{}] {}", progress.host(), progress.status_text(&catalog));
/// };
/// on_progress(InstallProgress::Copying { host: "srv01".into() });
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallProgress {
    /// Copying the installer and auxiliary files to the host.
    Copying {
        /// Host being installed to.
        host: String,
    },

    /// The installer is running on the host.
    Installing {
        /// Host being installed to.
        host: String,
    },

    /// Removing the staged files.
    DeletingTemporaryFiles {
        /// Host being installed to.
        host: String,
    },

    /// The install finished, whatever its result.
    Completed {
        /// Host that was installed to.
        host: String,
    },
}

impl InstallProgress {
    /// Host the stage refers to.
    pub fn host(&self) -> &str {
        match self {
            Self::Copying { host }
            | Self::Installing { host }
            | Self::DeletingTemporaryFiles { host }
            | Self::Completed { host } => host,
        }
    }

    /// Operator-facing text for the stage, taken from the catalog.
    ///
    /// ```rust
    /// use msi_fleet::{InstallProgress, MessageCatalog};
    ///
    /// let progress = InstallProgress::Installing { host: "srv01".into() };
    /// assert_eq!(progress.status_text(&MessageCatalog::default()), "Installing...");
    /// ```
    pub fn status_text(&self, catalog: &MessageCatalog) -> String {
        let key = match self {
            Self::Copying { .. } => MessageKey::Copying,
            Self::Installing { .. } => MessageKey::Installing,
            Self::DeletingTemporaryFiles { .. } => MessageKey::DeletingTemporaryFiles,
            Self::Completed { .. } => MessageKey::Completed,
        };
        catalog.get(key).into_owned()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}
