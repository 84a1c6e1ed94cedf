//! onemirror Graph - Microsoft Graph adapters
//!
//! Implements the `onemirror-core` ports against the Microsoft Graph API:
//! - Delta queries as an unbounded, cancellable change feed
//! - Single-item metadata lookups for shared folders
//! - Lazy content downloads
//!
//! ## Modules
//!
//! - [`client`] - Microsoft Graph API HTTP client
//! - [`delta`] - [`delta::GraphChangeFeed`], the delta-query change feed
//! - [`metadata`] - [`metadata::GraphMetadataFetcher`]
//! - [`download`] - [`download::GraphDownloadResolver`]

pub mod client;
pub mod delta;
pub mod download;
pub mod metadata;

use std::time::Duration;
use thiserror::Error;

pub use client::GraphClient;
pub use delta::GraphChangeFeed;
pub use download::GraphDownloadResolver;
pub use metadata::GraphMetadataFetcher;

/// Errors that can occur when communicating with the Microsoft Graph API
#[derive(Debug, Error)]
pub enum GraphError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The delta cursor is no longer valid and the feed must restart
    #[error("Delta token expired (410 Gone)")]
    DeltaExpired,

    /// Rate limit exceeded and the retry budget is spent
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration the service asked us to wait
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}
