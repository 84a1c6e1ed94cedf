//! Change feed port (driven/secondary port)
//!
//! A change feed is an ordered, unbounded stream of [`RawEntry`] records for
//! one storage root. The engine opens it once for the main drive and once
//! per discovered shared folder.
//!
//! ## Design Notes
//!
//! - `open` is synchronous and must not perform I/O; all network work happens
//!   while the returned stream is polled.
//! - The stream must end (yield `None`) once the cancellation token fires and
//!   release whatever it holds (connections, timers).
//! - Transport failures are yielded as `Err` items. Retry and backoff are the
//!   implementation's business; an `Err` is treated as fatal for that feed.

use std::fmt::{self, Display, Formatter};

use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::domain::entry::RawEntry;
use crate::domain::newtypes::{Credential, DriveId, RemoteId};

/// The stream type returned by [`ChangeFeedSource::open`]
pub type ChangeFeed = BoxStream<'static, anyhow::Result<RawEntry>>;

/// Which storage root a feed covers
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FeedRoot {
    /// Drive to read from; `None` means the signed-in user's drive
    pub drive_id: Option<DriveId>,
    /// Folder to root the feed at; `None` means the drive root
    pub item_id: Option<RemoteId>,
}

impl FeedRoot {
    /// Root of the signed-in user's own drive
    #[must_use]
    pub fn main() -> Self {
        Self::default()
    }

    /// A folder inside a specific drive
    #[must_use]
    pub fn item(drive_id: DriveId, item_id: RemoteId) -> Self {
        Self {
            drive_id: Some(drive_id),
            item_id: Some(item_id),
        }
    }

    /// True for the main drive root
    #[must_use]
    pub fn is_main(&self) -> bool {
        self.drive_id.is_none() && self.item_id.is_none()
    }
}

impl Display for FeedRoot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match (&self.drive_id, &self.item_id) {
            (None, None) => f.write_str("me/root"),
            (Some(drive), None) => write!(f, "{drive}/root"),
            (None, Some(item)) => write!(f, "me/{item}"),
            (Some(drive), Some(item)) => write!(f, "{drive}/{item}"),
        }
    }
}

/// Port trait for opening change feeds
pub trait ChangeFeedSource: Send + Sync {
    /// Opens a feed for `root`
    ///
    /// May be called any number of times, concurrently, for different roots.
    ///
    /// # Arguments
    /// * `credential` - Credential to authenticate feed requests with
    /// * `root` - Storage root to follow
    /// * `cancel` - Token that stops the feed when cancelled
    fn open(&self, credential: &Credential, root: FeedRoot, cancel: CancellationToken) -> ChangeFeed;
}
