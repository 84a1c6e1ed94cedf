//! Microsoft Graph Delta API as a change feed
//!
//! Implements [`ChangeFeedSource`] on top of the delta query pattern.
//!
//! ## Delta Query Flow
//!
//! 1. **Initial sync**: query the root delta URL with no token; every item
//!    under the root is returned
//! 2. **Follow pages**: each page's `@odata.nextLink` is followed
//!    immediately until a page carries `@odata.deltaLink`
//! 3. **Poll**: once caught up, wait `poll_interval` and query the delta
//!    link; the service only returns what changed since
//! 4. **Expired cursor**: a `410 Gone` restarts the feed from the root URL
//!
//! The feed never ends on its own. It ends when its cancellation token fires
//! or after yielding a single `Err` for a request that failed.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures_util::stream::{self, StreamExt};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use onemirror_core::domain::{Credential, RawEntry};
use onemirror_core::ports::{ChangeFeed, ChangeFeedSource, FeedRoot};

use crate::client::GraphClient;
use crate::GraphError;

/// Path for the main drive's delta endpoint
const MAIN_DELTA_PATH: &str = "/me/drive/root/delta";

/// Default wait between polls once a feed has caught up
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// Microsoft Graph API response types
// ============================================================================

/// Raw response from the Microsoft Graph delta API
///
/// See: <https://learn.microsoft.com/en-us/graph/api/driveitem-delta>
#[derive(Debug, Deserialize)]
struct GraphDeltaResponse {
    /// Array of changed drive items, decoded one at a time by the feed
    #[serde(default)]
    value: Vec<serde_json::Value>,

    /// URL for the next page of results (present when more pages exist)
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,

    /// URL to poll for later changes (present only on the last page)
    #[serde(rename = "@odata.deltaLink")]
    delta_link: Option<String>,
}

/// Returns the delta URL path for a feed root
pub fn delta_path(root: &FeedRoot) -> String {
    match (&root.drive_id, &root.item_id) {
        (None, None) => MAIN_DELTA_PATH.to_string(),
        (Some(drive), None) => format!("/drives/{drive}/root/delta"),
        (None, Some(item)) => format!("/me/drive/items/{item}/delta"),
        (Some(drive), Some(item)) => format!("/drives/{drive}/items/{item}/delta"),
    }
}

// ============================================================================
// GraphChangeFeed
// ============================================================================

/// Change feed source backed by Graph delta queries
#[derive(Debug, Clone)]
pub struct GraphChangeFeed {
    client: Arc<GraphClient>,
    poll_interval: Duration,
}

impl GraphChangeFeed {
    /// Creates a feed source using `client`
    pub fn new(client: Arc<GraphClient>) -> Self {
        Self {
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the wait between polls once a feed has caught up
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// The configured poll interval
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl ChangeFeedSource for GraphChangeFeed {
    fn open(&self, credential: &Credential, root: FeedRoot, cancel: CancellationToken) -> ChangeFeed {
        let start_url = self.client.url(&delta_path(&root));
        debug!(root = %root, url = %start_url, "Opening delta feed");

        let state = FeedState {
            client: Arc::clone(&self.client),
            credential: credential.clone(),
            root,
            cancel,
            poll_interval: self.poll_interval,
            start_url,
            cursor: Cursor::Start,
            buffer: VecDeque::new(),
            finished: false,
        };

        stream::unfold(state, FeedState::next).boxed()
    }
}

/// Where the next request goes
#[derive(Debug, Clone)]
enum Cursor {
    /// The root delta URL, no token
    Start,
    /// A `nextLink`, fetched immediately
    Page(String),
    /// A `deltaLink`, fetched after the poll interval
    Poll(String),
}

struct FeedState {
    client: Arc<GraphClient>,
    credential: Credential,
    root: FeedRoot,
    cancel: CancellationToken,
    poll_interval: Duration,
    start_url: String,
    cursor: Cursor,
    buffer: VecDeque<RawEntry>,
    finished: bool,
}

impl FeedState {
    async fn next(mut self) -> Option<(anyhow::Result<RawEntry>, Self)> {
        loop {
            if self.finished || self.cancel.is_cancelled() {
                return None;
            }

            if let Some(entry) = self.buffer.pop_front() {
                return Some((Ok(entry), self));
            }

            let (url, wait) = match &self.cursor {
                Cursor::Start => (self.start_url.clone(), false),
                Cursor::Page(url) => (url.clone(), false),
                Cursor::Poll(url) => (url.clone(), true),
            };

            if wait {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return None,
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }

            let page = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                page = self
                    .client
                    .get_json::<GraphDeltaResponse>(&url, &self.credential) => page,
            };

            match page {
                Ok(page) => {
                    if let Err(e) = self.accept(page) {
                        self.finished = true;
                        return Some((Err(e), self));
                    }
                }
                Err(GraphError::DeltaExpired) => {
                    info!(root = %self.root, "Delta token expired, restarting from root");
                    self.cursor = Cursor::Start;
                }
                Err(e) => {
                    warn!(root = %self.root, error = %e, "Delta request failed");
                    self.finished = true;
                    let err = anyhow::Error::new(e)
                        .context(format!("Delta query failed for {}", self.root));
                    return Some((Err(err), self));
                }
            }
        }
    }

    fn accept(&mut self, page: GraphDeltaResponse) -> anyhow::Result<()> {
        debug!(
            root = %self.root,
            items = page.value.len(),
            has_next = page.next_link.is_some(),
            has_delta = page.delta_link.is_some(),
            "Received delta page"
        );

        for value in page.value {
            match serde_json::from_value::<RawEntry>(value) {
                Ok(entry) => self.buffer.push_back(entry),
                Err(e) => warn!(root = %self.root, error = %e, "Skipping malformed delta item"),
            }
        }
        self.cursor = match (page.next_link, page.delta_link) {
            (Some(next), _) => Cursor::Page(next),
            (None, Some(delta)) => Cursor::Poll(delta),
            (None, None) => {
                return Err(GraphError::InvalidResponse(
                    "delta page carried neither nextLink nor deltaLink".to_string(),
                ))
                .context(format!("Delta query failed for {}", self.root));
            }
        };
        Ok(())
    }
}
