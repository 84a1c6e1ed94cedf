//! Shared fakes for pipeline tests
//!
//! [`ScriptedFeeds`] hands out feeds whose entries the test pushes through
//! unbounded channels; [`FakeFetcher`] serves metadata from a map and can
//! hold every call at a gate; [`FakeDownloads`] counts invocations.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use futures_util::stream::{self, StreamExt};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use onemirror_core::domain::{Credential, DriveId, RawEntry, RemoteId, SyncAction};
use onemirror_core::ports::{
    ChangeFeed, ChangeFeedSource, DownloadResolver, FeedRoot, ItemMetadataFetcher,
};
use onemirror_sync::{ActionResult, ActionStream, DeltaEngine};

/// Upper bound for any single wait in these tests
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

pub type FeedSender = mpsc::UnboundedSender<anyhow::Result<RawEntry>>;

// ============================================================================
// Fake ports
// ============================================================================

/// Change feeds scripted by the test
#[derive(Default)]
pub struct ScriptedFeeds {
    scripts: Mutex<HashMap<FeedRoot, VecDeque<mpsc::UnboundedReceiver<anyhow::Result<RawEntry>>>>>,
    opened: Mutex<Vec<FeedRoot>>,
}

impl ScriptedFeeds {
    /// Queues a feed for the next `open` of `root` and returns its sender
    pub fn script(&self, root: FeedRoot) -> FeedSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.scripts
            .lock()
            .unwrap()
            .entry(root)
            .or_default()
            .push_back(rx);
        tx
    }

    /// How many times `root` has been opened
    pub fn opened(&self, root: &FeedRoot) -> usize {
        self.opened.lock().unwrap().iter().filter(|r| *r == root).count()
    }
}

impl ChangeFeedSource for ScriptedFeeds {
    fn open(&self, _credential: &Credential, root: FeedRoot, cancel: CancellationToken) -> ChangeFeed {
        self.opened.lock().unwrap().push(root.clone());
        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&root)
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(rx) => stream::unfold((rx, cancel), |(mut rx, cancel)| async move {
                let item = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    item = rx.recv() => item,
                };
                item.map(|item| (item, (rx, cancel)))
            })
            .boxed(),
            None => stream::unfold(cancel, |cancel| async move {
                cancel.cancelled().await;
                None::<(anyhow::Result<RawEntry>, CancellationToken)>
            })
            .boxed(),
        }
    }
}

/// Metadata served from a map, optionally held at a gate
pub struct FakeFetcher {
    items: Mutex<HashMap<RemoteId, RawEntry>>,
    gate: Semaphore,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn open() -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            gate: Semaphore::new(Semaphore::MAX_PERMITS),
            calls: AtomicUsize::new(0),
        }
    }

    /// Every fetch waits until [`FakeFetcher::release`] is called
    pub fn gated() -> Self {
        Self {
            gate: Semaphore::new(0),
            ..Self::open()
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(1_000);
    }

    pub fn insert(&self, entry: RawEntry) {
        self.items.lock().unwrap().insert(entry.id.clone(), entry);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ItemMetadataFetcher for FakeFetcher {
    async fn fetch(
        &self,
        _credential: &Credential,
        drive_id: &DriveId,
        item_id: &RemoteId,
    ) -> anyhow::Result<RawEntry> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let _permit = self.gate.acquire().await?;
        self.items
            .lock()
            .unwrap()
            .get(item_id)
            .cloned()
            .ok_or_else(|| anyhow!("item {drive_id}/{item_id} not found"))
    }
}

/// Download resolver counting its invocations
#[derive(Default)]
pub struct FakeDownloads {
    calls: AtomicUsize,
}

impl FakeDownloads {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DownloadResolver for FakeDownloads {
    async fn resolve(
        &self,
        credential: &Credential,
        item_id: &RemoteId,
        drive_id: Option<&DriveId>,
    ) -> anyhow::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!(
            "{}|{}|{}",
            credential.expose(),
            item_id,
            drive_id.map(DriveId::as_str).unwrap_or("-")
        )
        .into_bytes())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub feeds: Arc<ScriptedFeeds>,
    pub fetcher: Arc<FakeFetcher>,
    pub downloads: Arc<FakeDownloads>,
    pub main: FeedSender,
    pub stream: ActionStream,
}

impl Harness {
    pub fn start() -> Self {
        Self::with_fetcher(FakeFetcher::open())
    }

    /// Starts an engine; nested feeds must be scripted through
    /// [`ScriptedFeeds::script`]
    /// before the link entry that opens them is sent
    pub fn with_fetcher(fetcher: FakeFetcher) -> Self {
        let feeds = Arc::new(ScriptedFeeds::default());
        let fetcher = Arc::new(fetcher);
        let downloads = Arc::new(FakeDownloads::default());
        let main = feeds.script(FeedRoot::main());

        let engine = DeltaEngine::new(feeds.clone(), fetcher.clone(), downloads.clone())
            .with_channel_capacity(8);
        let stream = engine.start(Credential::new("secret-token").unwrap());

        Self {
            feeds,
            fetcher,
            downloads,
            main,
            stream,
        }
    }

    pub fn send(&self, entry: RawEntry) {
        self.main.send(Ok(entry)).unwrap();
    }

    /// Next item on the action stream
    pub async fn next(&mut self) -> Option<ActionResult> {
        tokio::time::timeout(STEP_TIMEOUT, self.stream.next())
            .await
            .expect("timed out waiting for the action stream")
    }

    /// Next item, which must be a successful action
    pub async fn action(&mut self) -> SyncAction {
        match self.next().await {
            Some(Ok(action)) => action,
            Some(Err(err)) => panic!("expected an action, got error: {err}"),
            None => panic!("expected an action, stream ended"),
        }
    }
}

/// Waits until the receiving side of `tx` is gone
pub async fn wait_closed(tx: &FeedSender) {
    tokio::time::timeout(STEP_TIMEOUT, tx.closed())
        .await
        .expect("feed was not released");
}

// ============================================================================
// Entry builders
// ============================================================================

pub fn id(s: &str) -> RemoteId {
    RemoteId::new(s.to_string()).unwrap()
}

pub fn drive(s: &str) -> DriveId {
    DriveId::new(s.to_string()).unwrap()
}

fn raw(value: serde_json::Value) -> RawEntry {
    serde_json::from_value(value).unwrap()
}

pub fn file(id: &str, parent: &str, name: &str, sha1: &str) -> RawEntry {
    raw(serde_json::json!({
        "id": id,
        "name": name,
        "parentReference": { "driveId": "me", "path": parent },
        "file": { "hashes": { "sha1Hash": sha1 } },
        "lastModifiedDateTime": "2024-05-01T08:30:00Z"
    }))
}

pub fn folder(id: &str, parent: &str, name: &str) -> RawEntry {
    raw(serde_json::json!({
        "id": id,
        "name": name,
        "parentReference": { "driveId": "me", "path": parent },
        "folder": { "childCount": 0 }
    }))
}

pub fn deleted(id: &str) -> RawEntry {
    raw(serde_json::json!({ "id": id, "deleted": { "state": "deleted" }, "folder": {} }))
}

pub fn untyped(id: &str, parent: &str, name: &str) -> RawEntry {
    raw(serde_json::json!({
        "id": id,
        "name": name,
        "parentReference": { "path": parent }
    }))
}

/// A link in the main drive to folder `remote_id` of `owner`
pub fn link(id: &str, name: &str, remote_id: &str, owner: &str) -> RawEntry {
    raw(serde_json::json!({
        "id": id,
        "name": name,
        "parentReference": { "driveId": "me", "path": "/drive/root:" },
        "remoteItem": {
            "id": remote_id,
            "name": name,
            "parentReference": { "driveId": owner }
        }
    }))
}

/// Metadata of a shared folder as its owner's drive reports it
pub fn shared_root(id: &str, name: &str, owner: &str, parent: &str) -> RawEntry {
    raw(serde_json::json!({
        "id": id,
        "name": name,
        "parentReference": { "driveId": owner, "path": parent },
        "folder": { "childCount": 1 }
    }))
}

pub fn nested_root(owner: &str, remote_id: &str) -> FeedRoot {
    FeedRoot::item(drive(owner), id(remote_id))
}
