//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits for the collaborators the
//! reconciliation engine depends on but does not implement. Implementations
//! live in adapter crates (`onemirror-graph` for Microsoft Graph) or in
//! tests as in-memory fakes.
//!
//! ## Ports Overview
//!
//! - [`ChangeFeedSource`] - Unbounded, cancellable delta feed for a storage root
//! - [`ItemMetadataFetcher`] - Single-shot metadata lookup for one item
//! - [`DownloadResolver`] - Lazy content download, invoked through a [`DownloadHandle`]

pub mod change_feed;
pub mod download;
pub mod metadata;

pub use change_feed::{ChangeFeed, ChangeFeedSource, FeedRoot};
pub use download::{DownloadHandle, DownloadResolver};
pub use metadata::ItemMetadataFetcher;
