//! Shared-folder namespaces
//!
//! A folder shared with the user shows up in the main feed as a link entry
//! carrying a `remoteItem` facet. Its contents never appear in the main feed;
//! they have to be followed through a second feed rooted at the linked item
//! in the owner's drive. The [`NamespaceResolver`] spots first-sight links,
//! reserves a subscription for them synchronously, then spawns a worker that
//! loads the linked item's metadata and forwards its nested feed into the
//! engine, every entry tagged with the resulting [`Namespace`].
//!
//! ```text
//! main feed ──► observe(link) ──► reserve(id, token) ──► spawn worker
//!                                                          │
//!                                     fetch metadata ◄─────┘
//!                                            │
//!                                  open nested feed ──► FeedMessage::Entry{namespace}
//! ```

use std::sync::Arc;

use anyhow::{anyhow, Context};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use onemirror_core::domain::{Credential, RawEntry, RelativePath};
use onemirror_core::ports::{ChangeFeedSource, FeedRoot, ItemMetadataFetcher};

use crate::engine::FeedMessage;
use crate::state::ReconciliationState;
use crate::EngineError;

// ============================================================================
// Namespace
// ============================================================================

/// Identity and path context of a shared folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespace {
    /// Display name, taken from the link entry in the main drive
    name: String,
    /// The linked folder's own path inside its owning drive
    prefix: Option<RelativePath>,
}

impl Namespace {
    /// Builds a namespace from the link entry and the linked folder's metadata
    pub fn new(link: &RawEntry, root: &RawEntry) -> Self {
        let prefix = root
            .parent_path()
            .map(|path| RelativePath::from_parent_reference(path).child(&root.name));
        Self {
            name: link.name.clone(),
            prefix,
        }
    }

    /// The name nested entries are placed under
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves a nested entry's parent fragment to a mirror path
    ///
    /// The linked folder's own location in the owner's drive is removed
    /// once, when the fragment starts with it, and the remainder is placed
    /// under the namespace name. A fragment that is itself a leading part
    /// of that location, such as the parent of the linked folder, is
    /// consumed entirely.
    pub fn resolve_parent(&self, fragment: &RelativePath) -> RelativePath {
        let relative = match &self.prefix {
            Some(prefix) if prefix.starts_with(fragment) => RelativePath::root(),
            Some(prefix) => fragment
                .strip_prefix(prefix)
                .unwrap_or_else(|| fragment.clone()),
            None => fragment.clone(),
        };
        RelativePath::from_names([self.name.as_str()]).join(&relative)
    }
}

// ============================================================================
// NamespaceResolver
// ============================================================================

/// Detects shared-folder links and opens their nested feeds
pub struct NamespaceResolver {
    feeds: Arc<dyn ChangeFeedSource>,
    fetcher: Arc<dyn ItemMetadataFetcher>,
    credential: Credential,
    /// Parent of every subscription token
    root: CancellationToken,
    tx: mpsc::Sender<FeedMessage>,
}

impl NamespaceResolver {
    pub(crate) fn new(
        feeds: Arc<dyn ChangeFeedSource>,
        fetcher: Arc<dyn ItemMetadataFetcher>,
        credential: Credential,
        root: CancellationToken,
        tx: mpsc::Sender<FeedMessage>,
    ) -> Self {
        Self {
            feeds,
            fetcher,
            credential,
            root,
            tx,
        }
    }

    /// Examines one entry before it is classified
    ///
    /// A deleted entry whose id holds a subscription cancels it. A live,
    /// untagged link entry with no subscription yet reserves one in `state`
    /// right away and spawns the worker that follows it; entries already
    /// tagged with a namespace never open further ones.
    pub fn observe(
        &self,
        state: &mut ReconciliationState,
        entry: &RawEntry,
        namespace: Option<&Namespace>,
    ) {
        if entry.is_deleted() {
            if state.cancel_subscription(&entry.id) {
                info!(id = %entry.id, name = %entry.name, "Shared folder removed, closing nested feed");
            }
            return;
        }

        if namespace.is_some() || !entry.is_remote_link() || state.has_subscription(&entry.id) {
            return;
        }

        let token = self.root.child_token();
        state.reserve_subscription(entry.id.clone(), token.clone());
        debug!(id = %entry.id, name = %entry.name, "Reserved shared folder subscription");

        tokio::spawn(run_subscription(
            Arc::clone(&self.feeds),
            Arc::clone(&self.fetcher),
            self.credential.clone(),
            entry.clone(),
            token,
            self.tx.clone(),
        ));
    }
}

/// Loads the linked folder and opens the nested feed for it
async fn open_namespace(
    fetcher: &dyn ItemMetadataFetcher,
    credential: &Credential,
    link: &RawEntry,
) -> anyhow::Result<(Namespace, FeedRoot)> {
    let remote = link
        .remote_item
        .as_ref()
        .ok_or_else(|| anyhow!("entry has no remoteItem facet"))?;
    let drive_id = remote
        .drive_id()
        .ok_or_else(|| anyhow!("remote item {} does not name its drive", remote.id))?;

    let root = fetcher
        .fetch(credential, drive_id, &remote.id)
        .await
        .with_context(|| format!("Failed to fetch metadata for {drive_id}/{}", remote.id))?;

    Ok((
        Namespace::new(link, &root),
        FeedRoot::item(drive_id.clone(), remote.id.clone()),
    ))
}

/// Worker for one shared folder
///
/// Stops as soon as `token` is cancelled. Failures are reported to the
/// engine together with the token so it can release the reservation.
async fn run_subscription(
    feeds: Arc<dyn ChangeFeedSource>,
    fetcher: Arc<dyn ItemMetadataFetcher>,
    credential: Credential,
    link: RawEntry,
    token: CancellationToken,
    tx: mpsc::Sender<FeedMessage>,
) {
    let opened = tokio::select! {
        biased;
        _ = token.cancelled() => return,
        opened = open_namespace(fetcher.as_ref(), &credential, &link) => opened,
    };

    let (namespace, root) = match opened {
        Ok(opened) => opened,
        Err(source) => {
            warn!(id = %link.id, error = %source, "Unable to open shared folder");
            let failure = FeedMessage::Failed {
                subscription: Some((link.id.clone(), token.clone())),
                error: EngineError::Namespace {
                    id: link.id.clone(),
                    source,
                },
            };
            let _ = tx.send(failure).await;
            return;
        }
    };

    let namespace = Arc::new(namespace);
    info!(
        id = %link.id,
        namespace = %namespace.name(),
        root = %root,
        "Following shared folder"
    );

    let mut feed = feeds.open(&credential, root, token.clone());
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = feed.next() => next,
        };

        let message = match next {
            Some(Ok(entry)) => FeedMessage::Entry {
                entry,
                namespace: Some(Arc::clone(&namespace)),
                subscription: Some(token.clone()),
            },
            Some(Err(source)) => {
                warn!(namespace = %namespace.name(), error = %source, "Nested feed failed");
                let failure = FeedMessage::Failed {
                    subscription: Some((link.id.clone(), token.clone())),
                    error: EngineError::Feed {
                        namespace: Some(namespace.name().to_string()),
                        source,
                    },
                };
                let _ = tx.send(failure).await;
                break;
            }
            None => {
                debug!(namespace = %namespace.name(), "Nested feed ended");
                break;
            }
        };

        let sent = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            sent = tx.send(message) => sent,
        };
        if sent.is_err() {
            break;
        }
    }

    debug!(namespace = %namespace.name(), "Shared folder worker stopped");
}
