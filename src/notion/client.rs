//! Client for the undocumented `www.notion.so/api/v3` endpoints.
//!
//! The protocol is inherently serial: the block record supplies the
//! collection and view ids the collection query needs, so the two requests
//! cannot overlap.

use crate::notion::id::{to_dashed_id, IdError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

/// Production API base path.
pub const DEFAULT_BASE_URL: &str = "https://www.notion.so/api/v3";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_PAGE_LIMIT: u32 = 70;

/// Errors from fetching table data out of the remote API.
///
/// Any failure aborts feed generation; there is no partial output.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The configured page id is not a valid identifier.
    #[error(transparent)]
    Id(#[from] IdError),
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// Request exceeded the configured timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body was not the JSON shape the endpoint documents
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    /// A lookup came back empty
    #[error("{0} lookup returned no results")]
    NotFound(&'static str),
}

impl FetchError {
    /// Returns true if this error is transient and the request should be
    /// retried under a non-disabled [`RetryPolicy`].
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Network(_) => true,
            FetchError::HttpStatus(status) => *status >= 500 || *status == 429,
            FetchError::Id(_) | FetchError::Decode(_) | FetchError::NotFound(_) => false,
        }
    }
}

/// Explicit retry policy for transient failures.
///
/// The default is a single attempt — retries stay off unless configured.
/// Delays double per retry starting from `base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::from_secs(1),
        }
    }

    /// Delay before retry number `retry` (1-based): `base_delay * 2^(retry-1)`.
    fn delay_before(&self, retry: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(retry.saturating_sub(1)).min(64)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Connection settings for [`NotionClient`]. The base URL is overridable so
/// tests can point the client at a mock server.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub base_url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub page_limit: u32,
    pub user_locale: String,
    pub user_time_zone: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::disabled(),
            page_limit: DEFAULT_PAGE_LIMIT,
            user_locale: "en".to_string(),
            user_time_zone: "Europe/Prague".to_string(),
        }
    }
}

/// The collection and view a table page points at; everything the
/// collection query needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub collection_id: String,
    pub view_id: String,
}

#[derive(Debug, Deserialize)]
struct RecordValuesResponse {
    #[serde(default)]
    results: Vec<RecordResult>,
}

#[derive(Debug, Deserialize)]
struct RecordResult {
    value: Option<BlockRecord>,
}

#[derive(Debug, Deserialize)]
struct BlockRecord {
    collection_id: Option<String>,
    #[serde(default)]
    view_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct QueryCollectionResponse {
    #[serde(rename = "recordMap")]
    record_map: CollectionSnapshot,
}

/// The record maps a collection query returns, keyed by internal id.
///
/// Entries stay loosely typed (`{"id": {"value": {...}}}` envelopes); the
/// schema resolver and row decoder pull out the parts they model. Map order
/// follows the response (serde_json `preserve_order`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CollectionSnapshot {
    #[serde(default)]
    pub collection_view: serde_json::Map<String, Value>,
    #[serde(default)]
    pub collection: serde_json::Map<String, Value>,
    #[serde(default)]
    pub block: serde_json::Map<String, Value>,
}

/// Client for the two lookups the feed pipeline needs.
#[derive(Debug, Clone)]
pub struct NotionClient {
    http: reqwest::Client,
    options: FetchOptions,
}

impl NotionClient {
    pub fn new(http: reqwest::Client, options: FetchOptions) -> Self {
        Self { http, options }
    }

    /// Resolves a page id to the collection/view pair its block record
    /// points at, via `getRecordValues`.
    ///
    /// # Errors
    ///
    /// [`FetchError::Id`] for a malformed page id, [`FetchError::NotFound`]
    /// when the lookup comes back empty or the block is not a collection
    /// container, plus the transport/decode variants.
    pub async fn resolve_block(&self, page_id: &str) -> Result<TableRef, FetchError> {
        let id = to_dashed_id(page_id)?;
        let body = json!({
            "requests": [{"table": "block", "id": id}]
        });

        let response: RecordValuesResponse = self.post_json("getRecordValues", &body).await?;
        let record = response
            .results
            .into_iter()
            .next()
            .and_then(|r| r.value)
            .ok_or(FetchError::NotFound("block"))?;

        let collection_id = record
            .collection_id
            .ok_or(FetchError::NotFound("collection"))?;
        let view_id = record
            .view_ids
            .into_iter()
            .next()
            .ok_or(FetchError::NotFound("collection view"))?;

        tracing::debug!(page_id = %id, collection_id = %collection_id, "Resolved block record");
        Ok(TableRef {
            collection_id,
            view_id,
        })
    }

    /// Fetches the collection's row data and schema via `queryCollection`.
    pub async fn fetch_collection(
        &self,
        collection_id: &str,
        view_id: &str,
    ) -> Result<CollectionSnapshot, FetchError> {
        // The aggregate/filter/sort block is fixed; the API rejects requests
        // without it.
        let body = json!({
            "collectionId": collection_id,
            "collectionViewId": view_id,
            "query": {
                "aggregate": [{
                    "id": "count",
                    "type": "title",
                    "property": "title",
                    "view_type": "table",
                    "aggregation_type": "count"
                }],
                "filter": [],
                "sort": [],
                "filter_operator": "and"
            },
            "loader": {
                "type": "table",
                "limit": self.options.page_limit,
                "userTimeZone": self.options.user_time_zone,
                "userLocale": self.options.user_locale,
                "loadContentCover": true
            }
        });

        let response: QueryCollectionResponse = self.post_json("queryCollection", &body).await?;
        tracing::debug!(
            collection_id = %collection_id,
            rows = response.record_map.block.len(),
            "Fetched collection snapshot"
        );
        Ok(response.record_map)
    }

    /// POSTs a JSON body and decodes the JSON response, retrying transient
    /// failures per the configured [`RetryPolicy`].
    async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &impl Serialize,
    ) -> Result<T, FetchError> {
        let url = format!("{}/{}", self.options.base_url, endpoint);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.post_once(&url, body).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.options.retry.max_attempts => {
                    let delay = self.options.retry.delay_before(attempt);
                    tracing::warn!(
                        endpoint = endpoint,
                        attempt = attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn post_once<T: DeserializeOwned>(
        &self,
        url: &str,
        body: &impl Serialize,
    ) -> Result<T, FetchError> {
        let timeout = self.options.timeout;
        let response = tokio::time::timeout(timeout, self.http.post(url).json(body).send())
            .await
            .map_err(|_| FetchError::Timeout(timeout))??;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status().as_u16()));
        }

        let text = tokio::time::timeout(timeout, response.text())
            .await
            .map_err(|_| FetchError::Timeout(timeout))??;
        Ok(serde_json::from_str(&text)?)
    }
}
