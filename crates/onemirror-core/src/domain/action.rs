//! Sync actions emitted by the reconciliation engine
//!
//! A [`SyncAction`] tells the local mirror what happened to one remote item.
//! Actions are immutable once produced. Entries that cannot be resolved are
//! not dropped; they surface as [`ActionKind::Error`] carrying a
//! [`ResolveError`].

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use thiserror::Error;

use super::entry::RawEntry;
use super::newtypes::{Fingerprint, RemoteId};
use crate::ports::download::DownloadHandle;

/// What happened to the item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ActionKind {
    /// First sighting of an item with no matching content elsewhere
    Add,
    /// Known item, same name
    Change,
    /// Known item under a new name
    #[serde(rename_all = "camelCase")]
    Move { old_name: String },
    /// First sighting of an item whose content matches a tracked item
    Copy { from: String },
    /// Item deleted remotely
    Remove,
    /// Entry could not be resolved
    Error { error: ResolveError },
}

impl ActionKind {
    /// Short lowercase label, as used on the wire
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Change => "change",
            Self::Move { .. } => "move",
            Self::Copy { .. } => "copy",
            Self::Remove => "remove",
            Self::Error { .. } => "error",
        }
    }
}

/// Kind of item an action refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    File,
    Folder,
    Unknown,
}

/// One classified change, ready for the local mirror
#[derive(Debug, Clone, Serialize)]
pub struct SyncAction {
    /// Classification, plus `oldName`/`from`/`error` where applicable
    #[serde(flatten)]
    pub kind: ActionKind,
    /// Remote item ID, always equal to the input entry's ID
    pub id: RemoteId,
    /// File, folder, or unknown for error actions
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Resolved path relative to the mirror root
    pub name: String,
    /// Remote modification time
    pub modified: Option<DateTime<Utc>>,
    /// Normalized content fingerprint (files only)
    pub hash: Option<Fingerprint>,
    /// Lazy download capability, present when the entry exposed a download URL
    #[serde(serialize_with = "serialize_download")]
    pub download: Option<DownloadHandle>,
}

impl SyncAction {
    /// The previous name of a moved item
    #[must_use]
    pub fn old_name(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Move { old_name } => Some(old_name),
            _ => None,
        }
    }

    /// The name of the tracked item a copy was detected from
    #[must_use]
    pub fn copied_from(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Copy { from } => Some(from),
            _ => None,
        }
    }

    /// The resolution error of an error action
    #[must_use]
    pub fn error(&self) -> Option<&ResolveError> {
        match &self.kind {
            ActionKind::Error { error } => Some(error),
            _ => None,
        }
    }

    /// True for error actions
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self.kind, ActionKind::Error { .. })
    }
}

fn serialize_download<S: Serializer>(
    download: &Option<DownloadHandle>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_bool(download.is_some())
}

// ============================================================================
// Resolution errors
// ============================================================================

/// Why an entry could not be classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveReason {
    /// No parent path and no tracked record to take the name from
    MissingName,
    /// No file, folder, remoteItem or package facet
    UnknownType,
}

impl std::fmt::Display for ResolveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => f.write_str("Missing name"),
            Self::UnknownType => f.write_str("Unknown type"),
        }
    }
}

/// Structured error for an entry that could not be classified
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("Unable to resolve {filename} ({id}): {reason}")]
pub struct ResolveError {
    /// ID of the offending entry
    pub id: RemoteId,
    /// Synthesized filename for logs and diagnostics
    pub filename: String,
    /// What went wrong
    pub reason: ResolveReason,
}

impl ResolveError {
    /// Build an error for `entry`
    ///
    /// `filename` is the resolved name when there is one, otherwise the
    /// entry's raw name, otherwise its ID.
    #[must_use]
    pub fn new(entry: &RawEntry, resolved_name: &str, reason: ResolveReason) -> Self {
        let filename = if !resolved_name.is_empty() {
            resolved_name.to_string()
        } else if !entry.name.is_empty() {
            entry.name.clone()
        } else {
            entry.id.to_string()
        };

        Self {
            id: entry.id.clone(),
            filename,
            reason,
        }
    }
}
