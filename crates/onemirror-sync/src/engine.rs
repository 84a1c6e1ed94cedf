//! Delta reconciliation engine
//!
//! The [`DeltaEngine`] wires the ports together into one pipeline:
//!
//! ```text
//! main feed task ──┐
//!                  ├──► mpsc ──► consumer ──► observe ──► classify ──► ActionStream
//! nested worker ───┘                 ▲            │
//! nested worker ───┘                 │      spawn worker
//!                                    └──── ReconciliationState (owned)
//! ```
//!
//! Every feed, main or nested, runs in its own task and forwards entries into
//! a shared channel. A single consumer task owns the [`ReconciliationState`],
//! so classification and namespace bookkeeping never race. Entries from one
//! feed keep their order; entries from different feeds interleave as they
//! arrive.
//!
//! ## Shutdown
//!
//! All feeds hang off one root [`CancellationToken`]. The pipeline stops when
//! the main feed ends or fails, when [`ActionStream`] is dropped, or when
//! [`ActionStream::cancel`] is called; stopping cancels the root token and
//! with it every nested subscription.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, trace, warn};

use onemirror_core::config::EngineConfig;
use onemirror_core::domain::{Credential, RawEntry, RemoteId, SyncAction};
use onemirror_core::ports::{ChangeFeedSource, DownloadResolver, FeedRoot, ItemMetadataFetcher};

use crate::classifier::Classifier;
use crate::namespace::{Namespace, NamespaceResolver};
use crate::state::ReconciliationState;
use crate::EngineError;

/// Default capacity of the fan-in channel and of the action stream
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Item type of an [`ActionStream`]
pub type ActionResult = Result<SyncAction, EngineError>;

// ============================================================================
// Feed messages
// ============================================================================

/// What feed tasks send to the consumer
#[derive(Debug)]
pub(crate) enum FeedMessage {
    /// An entry to classify
    Entry {
        entry: RawEntry,
        /// Set for entries of a shared folder
        namespace: Option<Arc<Namespace>>,
        /// Token of the subscription the entry came from
        subscription: Option<CancellationToken>,
    },
    /// A feed stopped with an error
    Failed {
        /// Link id and token of a nested subscription; `None` for the main feed
        subscription: Option<(RemoteId, CancellationToken)>,
        error: EngineError,
    },
    /// The main feed ended
    Ended,
}

// ============================================================================
// DeltaEngine
// ============================================================================

/// Builds and starts reconciliation pipelines
pub struct DeltaEngine {
    feeds: Arc<dyn ChangeFeedSource>,
    fetcher: Arc<dyn ItemMetadataFetcher>,
    downloads: Arc<dyn DownloadResolver>,
    channel_capacity: usize,
}

impl DeltaEngine {
    /// Creates an engine over the given ports
    pub fn new(
        feeds: Arc<dyn ChangeFeedSource>,
        fetcher: Arc<dyn ItemMetadataFetcher>,
        downloads: Arc<dyn DownloadResolver>,
    ) -> Self {
        Self {
            feeds,
            fetcher,
            downloads,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Applies the `engine` configuration section
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.channel_capacity = config.channel_capacity.max(1);
        self
    }

    /// Sets the capacity of the internal channels
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Starts a pipeline with an empty state
    ///
    /// Must be called from within a Tokio runtime. The main feed is opened
    /// immediately; actions are delivered through the returned stream.
    pub fn start(&self, credential: Credential) -> ActionStream {
        self.start_with_state(credential, ReconciliationState::new())
    }

    /// Starts a pipeline classifying against an existing state
    pub fn start_with_state(
        &self,
        credential: Credential,
        state: ReconciliationState,
    ) -> ActionStream {
        let root = CancellationToken::new();
        let (feed_tx, feed_rx) = mpsc::channel(self.channel_capacity);
        let (action_tx, action_rx) = mpsc::channel(self.channel_capacity);

        info!("Starting reconciliation pipeline");

        tokio::spawn(run_main_feed(
            Arc::clone(&self.feeds),
            credential.clone(),
            root.clone(),
            feed_tx.clone(),
        ));

        let consumer = Consumer {
            state,
            resolver: NamespaceResolver::new(
                Arc::clone(&self.feeds),
                Arc::clone(&self.fetcher),
                credential.clone(),
                root.clone(),
                feed_tx,
            ),
            classifier: Classifier::new(credential, Arc::clone(&self.downloads)),
            root: root.clone(),
        };
        let task = tokio::spawn(consumer.run(feed_rx, action_tx));

        ActionStream {
            rx: action_rx,
            cancel: root.clone(),
            _guard: root.drop_guard(),
            task,
        }
    }
}

/// Forwards the main feed into the consumer channel
async fn run_main_feed(
    feeds: Arc<dyn ChangeFeedSource>,
    credential: Credential,
    cancel: CancellationToken,
    tx: mpsc::Sender<FeedMessage>,
) {
    let mut feed = feeds.open(&credential, FeedRoot::main(), cancel.clone());
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = feed.next() => next,
        };

        let message = match next {
            Some(Ok(entry)) => FeedMessage::Entry {
                entry,
                namespace: None,
                subscription: None,
            },
            Some(Err(source)) => FeedMessage::Failed {
                subscription: None,
                error: EngineError::Feed {
                    namespace: None,
                    source,
                },
            },
            None => FeedMessage::Ended,
        };
        let last = !matches!(message, FeedMessage::Entry { .. });

        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            sent = tx.send(message) => sent,
        };
        if sent.is_err() || last {
            return;
        }
    }
}

// ============================================================================
// Consumer
// ============================================================================

/// The single task that owns the state
struct Consumer {
    state: ReconciliationState,
    resolver: NamespaceResolver,
    classifier: Classifier,
    root: CancellationToken,
}

impl Consumer {
    async fn run(
        mut self,
        mut rx: mpsc::Receiver<FeedMessage>,
        tx: mpsc::Sender<ActionResult>,
    ) -> ReconciliationState {
        loop {
            let message = tokio::select! {
                biased;
                _ = self.root.cancelled() => break,
                message = rx.recv() => message,
            };
            let Some(message) = message else { break };

            let (output, stop) = match message {
                FeedMessage::Entry {
                    entry,
                    namespace,
                    subscription,
                } => {
                    if subscription.as_ref().is_some_and(CancellationToken::is_cancelled) {
                        trace!(id = %entry.id, "Dropping entry from closed shared folder");
                        continue;
                    }
                    (Ok(self.process(&entry, namespace.as_deref())), false)
                }
                FeedMessage::Failed {
                    subscription: Some((id, token)),
                    error,
                } => {
                    if token.is_cancelled() {
                        continue;
                    }
                    token.cancel();
                    self.state.cancel_subscription(&id);
                    (Err(error), false)
                }
                FeedMessage::Failed {
                    subscription: None,
                    error,
                } => {
                    warn!(error = %error, "Main feed failed, stopping pipeline");
                    (Err(error), true)
                }
                FeedMessage::Ended => {
                    info!("Main feed ended, stopping pipeline");
                    break;
                }
            };

            if tx.send(output).await.is_err() {
                debug!("Action stream dropped, stopping pipeline");
                break;
            }
            if stop {
                break;
            }
        }

        self.root.cancel();
        debug!(
            tracked = self.state.tracked_len(),
            subscriptions = self.state.subscription_count(),
            "Pipeline stopped"
        );
        self.state
    }

    fn process(&mut self, entry: &RawEntry, namespace: Option<&Namespace>) -> SyncAction {
        self.resolver.observe(&mut self.state, entry, namespace);
        self.classifier.classify(&mut self.state, entry, namespace)
    }
}

// ============================================================================
// ActionStream
// ============================================================================

/// Ordered stream of actions produced by a running pipeline
///
/// Yields `Ok` for every classified entry, including error actions, and
/// `Err` for feed or shared-folder failures. Ends once the pipeline stops.
/// Dropping the stream stops the pipeline.
pub struct ActionStream {
    rx: mpsc::Receiver<ActionResult>,
    cancel: CancellationToken,
    _guard: DropGuard,
    task: JoinHandle<ReconciliationState>,
}

impl ActionStream {
    /// Stops the pipeline; actions already buffered can still be drained
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stops the pipeline and returns the final state
    ///
    /// Returns `None` if the consumer task panicked.
    pub async fn shutdown(self) -> Option<ReconciliationState> {
        let ActionStream {
            rx,
            cancel,
            _guard: guard,
            task,
        } = self;
        cancel.cancel();
        drop(guard);
        drop(rx);
        task.await.ok()
    }
}

impl Stream for ActionStream {
    type Item = ActionResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
