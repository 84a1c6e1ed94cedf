//! Item metadata port (driven/secondary port)
//!
//! Used by the namespace resolver to load the full record of a shared folder
//! before opening its nested feed. The returned record has the same shape as
//! a change-feed entry.

use crate::domain::entry::RawEntry;
use crate::domain::newtypes::{Credential, DriveId, RemoteId};

/// Port trait for single-item metadata lookups
#[async_trait::async_trait]
pub trait ItemMetadataFetcher: Send + Sync {
    /// Retrieves the metadata record of one item
    ///
    /// # Arguments
    /// * `credential` - Credential to authenticate the request with
    /// * `drive_id` - Drive that owns the item
    /// * `item_id` - The item to look up
    ///
    /// # Returns
    /// The item's metadata, shaped like a change-feed entry
    async fn fetch(
        &self,
        credential: &Credential,
        drive_id: &DriveId,
        item_id: &RemoteId,
    ) -> anyhow::Result<RawEntry>;
}
