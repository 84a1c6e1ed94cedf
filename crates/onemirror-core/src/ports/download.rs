//! Download port (driven/secondary port)
//!
//! The engine never downloads content itself. For entries that expose a
//! download URL it attaches a [`DownloadHandle`]: a capability bound to the
//! credential, item and drive that calls the [`DownloadResolver`] only when
//! the consumer awaits [`DownloadHandle::fetch`].

use std::fmt;
use std::sync::Arc;

use crate::domain::newtypes::{Credential, DriveId, RemoteId};

/// Port trait for resolving an item's content
#[async_trait::async_trait]
pub trait DownloadResolver: Send + Sync {
    /// Downloads the content of one item
    ///
    /// # Arguments
    /// * `credential` - Credential to authenticate the request with
    /// * `item_id` - The item to download
    /// * `drive_id` - Drive that owns the item; `None` means the user's drive
    ///
    /// # Returns
    /// The file contents as a byte vector
    async fn resolve(
        &self,
        credential: &Credential,
        item_id: &RemoteId,
        drive_id: Option<&DriveId>,
    ) -> anyhow::Result<Vec<u8>>;
}

/// Lazily-invokable download capability
///
/// Constructing or cloning a handle performs no I/O.
#[derive(Clone)]
pub struct DownloadHandle {
    resolver: Arc<dyn DownloadResolver>,
    credential: Credential,
    item_id: RemoteId,
    drive_id: Option<DriveId>,
}

impl DownloadHandle {
    /// Creates a handle bound to `(credential, item_id, drive_id)`
    pub fn new(
        resolver: Arc<dyn DownloadResolver>,
        credential: Credential,
        item_id: RemoteId,
        drive_id: Option<DriveId>,
    ) -> Self {
        Self {
            resolver,
            credential,
            item_id,
            drive_id,
        }
    }

    /// The item this handle downloads
    pub fn item_id(&self) -> &RemoteId {
        &self.item_id
    }

    /// The drive this handle downloads from
    pub fn drive_id(&self) -> Option<&DriveId> {
        self.drive_id.as_ref()
    }

    /// Performs the download
    pub async fn fetch(&self) -> anyhow::Result<Vec<u8>> {
        self.resolver
            .resolve(&self.credential, &self.item_id, self.drive_id.as_ref())
            .await
    }
}

impl fmt::Debug for DownloadHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadHandle")
            .field("item_id", &self.item_id)
            .field("drive_id", &self.drive_id)
            .finish_non_exhaustive()
    }
}
