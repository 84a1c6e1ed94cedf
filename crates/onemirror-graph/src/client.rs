//! Microsoft Graph API client
//!
//! Provides a typed HTTP client for interacting with the Microsoft Graph API.
//! Handles authentication headers, status mapping, 429 back-off and JSON
//! deserialization. The client holds no credential of its own: every request
//! is authenticated with the [`Credential`] the caller passes in, so one
//! client can serve every feed the engine opens.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use onemirror_core::domain::Credential;
//! use onemirror_graph::client::GraphClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let client = GraphClient::new();
//! let credential = Credential::new("access-token-here")?;
//! let response = client.get(&client.url("/me/drive"), &credential).await?;
//! println!("status: {}", response.status());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use onemirror_core::domain::Credential;

use crate::GraphError;

/// Base URL for Microsoft Graph API v1.0
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Default retry-after duration when header is missing (30 seconds)
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Maximum number of retries for 429 responses
const DEFAULT_MAX_RETRIES: u32 = 5;

// ============================================================================
// GraphClient
// ============================================================================

/// HTTP client for Microsoft Graph API calls
///
/// Wraps `reqwest::Client` with base URL construction, bearer
/// authentication and automatic 429 retry handling.
#[derive(Debug, Clone)]
pub struct GraphClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests, without a trailing slash
    base_url: String,
    /// Retry budget for 429 responses
    max_retries: u32,
}

impl GraphClient {
    /// Creates a new GraphClient pointing at the public Graph endpoint
    pub fn new() -> Self {
        Self::with_base_url(GRAPH_BASE_URL)
    }

    /// Creates a new GraphClient with a custom base URL (useful for testing)
    ///
    /// # Arguments
    /// * `base_url` - Custom base URL for API requests
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Sets how many times a throttled (429) request is retried
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the absolute URL for an API path (e.g. `"/me/drive"`)
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Creates an authenticated request builder for an absolute URL
    ///
    /// Graph hands out absolute `@odata.nextLink` / `@odata.deltaLink` URLs,
    /// so requests are always built from a full URL; use [`GraphClient::url`]
    /// to turn an API path into one.
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `url` - Absolute request URL
    /// * `credential` - Bearer credential for this request
    pub fn request(&self, method: Method, url: &str, credential: &Credential) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(credential.expose())
    }

    /// Sends an authenticated GET with automatic 429 retry
    ///
    /// On HTTP 429 the `Retry-After` header is honoured and the request is
    /// retried up to the configured budget. Any other non-success status is
    /// mapped to a [`GraphError`].
    pub async fn get(&self, url: &str, credential: &Credential) -> Result<Response, GraphError> {
        for attempt in 0..=self.max_retries {
            let response = self.request(Method::GET, url, credential).send().await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                    .unwrap_or(DEFAULT_RETRY_AFTER);

                if attempt >= self.max_retries {
                    warn!(url, attempts = attempt + 1, "429 retry limit exhausted");
                    return Err(GraphError::TooManyRequests { retry_after });
                }

                info!(
                    url,
                    attempt,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Received 429, backing off"
                );
                tokio::time::sleep(retry_after).await;
                continue;
            }

            if attempt > 0 {
                info!(url, attempt, "Request succeeded after retry");
            }

            return match status_error(response.status(), url) {
                Some(err) => Err(err),
                None => Ok(response),
            };
        }

        Err(GraphError::TooManyRequests {
            retry_after: DEFAULT_RETRY_AFTER,
        })
    }

    /// Sends an authenticated GET and deserializes the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        credential: &Credential,
    ) -> Result<T, GraphError> {
        let response = self.get(url, credential).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            debug!(url, error = %e, "Failed to parse Graph response");
            GraphError::InvalidResponse(format!("{url}: {e}"))
        })
    }
}

impl Default for GraphClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a non-success HTTP status to a [`GraphError`]
///
/// Returns `None` for success statuses. 429 is handled by the retry loop
/// and never reaches this function in practice.
fn status_error(status: StatusCode, url: &str) -> Option<GraphError> {
    if status.is_success() {
        return None;
    }
    let detail = format!("{status} for {url}");
    Some(match status {
        StatusCode::UNAUTHORIZED => GraphError::Unauthorized(detail),
        StatusCode::FORBIDDEN => GraphError::Forbidden(detail),
        StatusCode::NOT_FOUND => GraphError::NotFound(detail),
        StatusCode::GONE => GraphError::DeltaExpired,
        StatusCode::TOO_MANY_REQUESTS => GraphError::TooManyRequests {
            retry_after: DEFAULT_RETRY_AFTER,
        },
        s if s.is_server_error() => GraphError::ServerError(detail),
        _ => GraphError::InvalidResponse(detail),
    })
}

/// Parses a `Retry-After` header value
///
/// Accepts either delay-seconds or an HTTP-date. Dates in the past or more
/// than an hour away fall back to `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let now = chrono::Utc::now();
        let target = date.with_timezone(&chrono::Utc);
        if target > now {
            if let Some(secs) = (target - now)
                .num_seconds()
                .try_into()
                .ok()
                .filter(|&s: &u64| s <= 3600)
            {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}
