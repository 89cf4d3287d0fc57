//! Operator-facing message catalog.
//!
//! Status and result texts are looked up in a [`MessageCatalog`] carried by
//! [`ManagerOptions`](crate::ManagerOptions), so a front end can supply
//! translated strings without any process-wide state.

use crate::result_code::{ClassifiedResult, ResultCategory};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

/// Identifies one operator-facing text.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::EnumIter,
)]
pub enum MessageKey {
    Success,
    SuccessPendingRestart,
    Failed,
    InProgress,
    Copying,
    Installing,
    DeletingTemporaryFiles,
    Completed,
    CopyFailed,
}

impl MessageKey {
    /// Built-in English text.
    pub fn default_text(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::SuccessPendingRestart => "Success (restart pending)",
            Self::Failed => "Failed",
            Self::InProgress => "In progress",
            Self::Copying => "Copying files to the target host...",
            Self::Installing => "Installing...",
            Self::DeletingTemporaryFiles => "Deleting temporary files...",
            Self::Completed => "Completed",
            Self::CopyFailed => "Could not copy installation files: ",
        }
    }
}

/// Texts keyed by [`MessageKey`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageCatalog {
    entries: BTreeMap<MessageKey, String>,
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self {
            entries: MessageKey::iter()
                .map(|key| (key, key.default_text().to_string()))
                .collect(),
        }
    }
}

impl MessageCatalog {
    /// Replace the text of one key.
    pub fn with(mut self, key: MessageKey, text: impl Into<String>) -> Self {
        self.entries.insert(key, text.into());
        self
    }

    /// Text for a key. A catalog missing the key yields a visible placeholder.
    pub fn get(&self, key: MessageKey) -> Cow<'_, str> {
        match self.entries.get(&key) {
            Some(text) if !text.is_empty() => Cow::Borrowed(text.as_str()),
            _ => Cow::Owned(format!("Missing_Localized_String_For({:?})", key)),
        }
    }

    /// One-line rendering of a classified result.
    ///
    /// ```rust
    /// use msi_fleet::{MessageCatalog, ResultTable};
    ///
    /// let catalog = MessageCatalog::default();
    /// let table = ResultTable::default();
    /// assert_eq!(catalog.render_result(&table.describe(0)), "Success");
    /// assert!(catalog.render_result(&table.describe(1603)).starts_with("Failed(1603) : "));
    /// ```
    pub fn render_result(&self, result: &ClassifiedResult) -> String {
        match result.category {
            ResultCategory::Success => self.get(MessageKey::Success).into_owned(),
            ResultCategory::SuccessPendingRestart => {
                self.get(MessageKey::SuccessPendingRestart).into_owned()
            }
            ResultCategory::Failure => format!(
                "{}({}) : {}",
                self.get(MessageKey::Failed),
                result.code,
                result.message
            ),
        }
    }
}
