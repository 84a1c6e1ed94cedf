//! Raw change-feed entries
//!
//! [`RawEntry`] mirrors the subset of the Graph `driveItem` resource that the
//! reconciliation engine reads. Facets (`file`, `folder`, `remoteItem`,
//! `package`, `deleted`) are modelled as optional fields because Graph signals
//! an item's shape purely by which facets are present. [`RawEntry::kind`]
//! turns that into an explicit [`EntryKind`] once per entry.
//!
//! See: <https://learn.microsoft.com/en-us/graph/api/resources/driveitem>

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{DriveId, Fingerprint, RemoteId};

/// One change-feed record, read-only input to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry {
    /// Unique identifier of the item within its drive
    pub id: RemoteId,

    /// Name of the item (filename or folder name)
    #[serde(default)]
    pub name: String,

    /// Reference to the parent folder (absent on most deletions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_reference: Option<ParentReference>,

    /// File facet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileFacet>,

    /// Folder facet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<serde_json::Value>,

    /// Remote item facet (shared/linked folder added to this drive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_item: Option<RemoteItem>,

    /// Package facet (OneNote notebooks and similar)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package: Option<serde_json::Value>,

    /// Deleted facet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<serde_json::Value>,

    /// Last modified timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date_time: Option<DateTime<Utc>>,

    /// Short-lived pre-authenticated download URL (files only)
    #[serde(
        rename = "@microsoft.graph.downloadUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub download_url: Option<String>,
}

/// Parent reference information for a drive item
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentReference {
    /// Drive containing the parent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive_id: Option<DriveId>,

    /// Percent-encoded parent path, e.g. `/drive/root:/Documents`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// File facet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileFacet {
    /// Content hashes computed by the service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashes: Option<Hashes>,
}

/// Hash values for a file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hashes {
    /// SHA-1 of the content, upper-case hex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha1_hash: Option<String>,
}

/// Remote item facet pointing at an item that lives in another drive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteItem {
    /// Item ID inside the owning drive
    pub id: RemoteId,

    /// Name inside the owning drive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Parent inside the owning drive; carries the owning drive ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_reference: Option<ParentReference>,
}

/// Decoded shape of an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// A file, with its normalized fingerprint when the service reported one
    File { fingerprint: Option<Fingerprint> },
    /// A folder, a shared/linked folder or a package
    Folder,
    /// No recognizable facet
    Unresolved,
}

impl RawEntry {
    /// Decode which kind of item this entry describes
    ///
    /// The `file` facet wins over any other facet; `folder`, `remoteItem` and
    /// `package` all map to [`EntryKind::Folder`].
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        if let Some(file) = &self.file {
            let fingerprint = file
                .hashes
                .as_ref()
                .and_then(|h| h.sha1_hash.as_deref())
                .and_then(|h| Fingerprint::new(h).ok());
            EntryKind::File { fingerprint }
        } else if self.folder.is_some() || self.remote_item.is_some() || self.package.is_some() {
            EntryKind::Folder
        } else {
            EntryKind::Unresolved
        }
    }

    /// True when the deleted facet is present
    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.deleted.is_some()
    }

    /// True when the entry links to an item in another drive
    #[must_use]
    pub fn is_remote_link(&self) -> bool {
        self.remote_item.is_some()
    }

    /// The raw `parentReference.path`, if any
    #[must_use]
    pub fn parent_path(&self) -> Option<&str> {
        self.parent_reference.as_ref()?.path.as_deref()
    }

    /// The drive the entry lives in, if reported
    #[must_use]
    pub fn drive_id(&self) -> Option<&DriveId> {
        self.parent_reference.as_ref()?.drive_id.as_ref()
    }
}

impl RemoteItem {
    /// The drive owning the linked item, if reported
    #[must_use]
    pub fn drive_id(&self) -> Option<&DriveId> {
        self.parent_reference.as_ref()?.drive_id.as_ref()
    }
}
