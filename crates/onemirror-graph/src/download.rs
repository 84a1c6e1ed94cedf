//! Content downloads
//!
//! Makes `GET /drives/{drive-id}/items/{item-id}/content`, or
//! `GET /me/drive/items/{item-id}/content` when no drive is known. The Graph
//! API answers with a redirect to a pre-authenticated URL, which reqwest
//! follows by default.

use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use onemirror_core::domain::{Credential, DriveId, RemoteId};
use onemirror_core::ports::DownloadResolver;

use crate::client::GraphClient;

/// [`DownloadResolver`] backed by the Graph content endpoint
#[derive(Debug, Clone)]
pub struct GraphDownloadResolver {
    client: Arc<GraphClient>,
}

impl GraphDownloadResolver {
    /// Creates a resolver using `client`
    pub fn new(client: Arc<GraphClient>) -> Self {
        Self { client }
    }
}

/// Returns the content URL path for an item
pub fn content_path(item_id: &RemoteId, drive_id: Option<&DriveId>) -> String {
    match drive_id {
        Some(drive) => format!("/drives/{drive}/items/{item_id}/content"),
        None => format!("/me/drive/items/{item_id}/content"),
    }
}

#[async_trait::async_trait]
impl DownloadResolver for GraphDownloadResolver {
    async fn resolve(
        &self,
        credential: &Credential,
        item_id: &RemoteId,
        drive_id: Option<&DriveId>,
    ) -> anyhow::Result<Vec<u8>> {
        let url = self.client.url(&content_path(item_id, drive_id));
        debug!(item_id = %item_id, "Downloading file");

        let response = self
            .client
            .get(&url, credential)
            .await
            .with_context(|| format!("Download request failed for {item_id}"))?;

        let bytes = response
            .bytes()
            .await
            .context("Failed to read download response body")?;

        debug!(item_id = %item_id, bytes = bytes.len(), "Downloaded file");
        Ok(bytes.to_vec())
    }
}
