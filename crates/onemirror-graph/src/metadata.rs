//! Single-item metadata lookups
//!
//! Makes `GET /drives/{drive-id}/items/{item-id}` and decodes the body as a
//! [`RawEntry`], the same shape the delta feed yields.

use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use onemirror_core::domain::{Credential, DriveId, RawEntry, RemoteId};
use onemirror_core::ports::ItemMetadataFetcher;

use crate::client::GraphClient;

/// [`ItemMetadataFetcher`] backed by the Graph items endpoint
#[derive(Debug, Clone)]
pub struct GraphMetadataFetcher {
    client: Arc<GraphClient>,
}

impl GraphMetadataFetcher {
    /// Creates a fetcher using `client`
    pub fn new(client: Arc<GraphClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ItemMetadataFetcher for GraphMetadataFetcher {
    async fn fetch(
        &self,
        credential: &Credential,
        drive_id: &DriveId,
        item_id: &RemoteId,
    ) -> anyhow::Result<RawEntry> {
        let url = self
            .client
            .url(&format!("/drives/{drive_id}/items/{item_id}"));
        debug!(drive_id = %drive_id, item_id = %item_id, "Fetching item metadata");

        let entry: RawEntry = self
            .client
            .get_json(&url, credential)
            .await
            .with_context(|| format!("Failed to fetch metadata for {drive_id}/{item_id}"))?;

        Ok(entry)
    }
}
