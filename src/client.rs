//! HTTP client for the documentation backend.
//!
//! `ApiClient` wraps the three read-only endpoints the backend exposes under
//! `/api`. Each call is a single GET with no retry; non-success statuses are
//! turned into a [`ClientError::Status`] carrying the status text.

use std::sync::Arc;
use std::time::Duration;

use miette::Diagnostic;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::debounce::Debouncer;
use crate::model::{Document, DocumentPage, IndexData};

/// Backend origin used when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8090";

// ---------------------------------------------------------------------------
// Client error
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ClientError {
    #[error("request to {url} failed: {message}")]
    #[diagnostic(
        code(docview::client::request),
        help("Is the documentation backend running? Check --base-url or DOCVIEW_BASE_URL.")
    )]
    Request { url: String, message: String },

    #[error("{context}: {status_text}")]
    #[diagnostic(
        code(docview::client::status),
        help("The backend answered with HTTP {status}.")
    )]
    Status {
        context: &'static str,
        status: u16,
        status_text: String,
    },

    #[error("unexpected response from {url}: {message}")]
    #[diagnostic(
        code(docview::client::response),
        help("The backend returned a body that is not the expected JSON. Version mismatch?")
    )]
    Response { url: String, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// Thin async wrapper over the backend's `/api` endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl Default for ApiClient {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ApiClient {
    /// Client for the backend at `base_url` (scheme + host + optional port).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(base_url, reqwest::Client::new())
    }

    /// Reuse an existing `reqwest::Client` (connection pool, timeouts).
    pub fn with_http(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the grouped document index.
    pub async fn get_index(&self) -> ClientResult<IndexData> {
        self.get_json(self.index_url(), "Failed to fetch index").await
    }

    /// Fetch one document by its relative path.
    pub async fn get_document(&self, path: &str) -> ClientResult<DocumentPage> {
        self.get_json(self.document_url(path), "Failed to fetch document")
            .await
    }

    /// Full-text search. A blank query short-circuits to no results.
    pub async fn search(&self, query: &str) -> ClientResult<Vec<Document>> {
        let Some(url) = self.search_url(query) else {
            tracing::debug!("search: blank query, skipping request");
            return Ok(Vec::new());
        };
        self.get_json(url, "Search failed").await
    }

    /// A search-as-you-type wrapper: only the query that settles for `delay`
    /// is sent, and `on_result` receives it together with the outcome.
    ///
    /// Requests run on the ambient tokio runtime.
    pub fn debounced_search<F>(&self, delay: Duration, on_result: F) -> Debouncer<String>
    where
        F: Fn(String, ClientResult<Vec<Document>>) + Send + Sync + 'static,
    {
        let client = self.clone();
        let on_result = Arc::new(on_result);
        Debouncer::new(delay, move |query: String| {
            let client = client.clone();
            let on_result = Arc::clone(&on_result);
            tokio::spawn(async move {
                let result = client.search(&query).await;
                on_result(query, result);
            });
        })
    }

    // -- URL construction --

    fn index_url(&self) -> String {
        format!("{}/api/index", self.base_url)
    }

    /// `path` is encoded as a single component, so `/` becomes `%2F`.
    fn document_url(&self, path: &str) -> String {
        format!("{}/api/doc/{}", self.base_url, urlencoding::encode(path))
    }

    fn search_url(&self, query: &str) -> Option<String> {
        if query.trim().is_empty() {
            return None;
        }
        Some(format!(
            "{}/api/search?q={}",
            self.base_url,
            urlencoding::encode(query)
        ))
    }

    // -- request helper --

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: String,
        context: &'static str,
    ) -> ClientResult<T> {
        tracing::debug!(%url, "GET");
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(%url, error = %e, "request failed");
                ClientError::Request {
                    url: url.clone(),
                    message: e.to_string(),
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%url, status = status.as_u16(), "backend returned an error status");
            return Err(ClientError::Status {
                context,
                status: status.as_u16(),
                status_text: status_text(status),
            });
        }

        resp.json().await.map_err(|e| ClientError::Response {
            url,
            message: format!("failed to parse JSON: {e}"),
        })
    }
}

/// Reason phrase for a status, e.g. `Not Found`, or the bare code if unknown.
fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = ApiClient::new("http://localhost:9000/");
        assert_eq!(client.base_url(), "http://localhost:9000");
        assert_eq!(client.index_url(), "http://localhost:9000/api/index");
    }

    #[test]
    fn document_path_is_encoded_as_one_component() {
        let client = ApiClient::new("http://h");
        assert_eq!(
            client.document_url("guides/getting started.md"),
            "http://h/api/doc/guides%2Fgetting%20started.md"
        );
    }

    #[test]
    fn search_query_is_encoded() {
        let client = ApiClient::new("http://h");
        assert_eq!(
            client.search_url("a&b=c d").as_deref(),
            Some("http://h/api/search?q=a%26b%3Dc%20d")
        );
    }

    #[test]
    fn blank_queries_build_no_url() {
        let client = ApiClient::new("http://h");
        assert!(client.search_url("").is_none());
        assert!(client.search_url("   \t\n").is_none());
    }

    #[tokio::test]
    async fn blank_search_returns_empty_without_network() {
        // Port 9 (discard) is never a backend; a request would error.
        let client = ApiClient::new("http://127.0.0.1:9");
        assert!(client.search("  ").await.unwrap().is_empty());
    }

    #[test]
    fn status_error_message_carries_status_text() {
        let err = ClientError::Status {
            context: "Failed to fetch index",
            status: 404,
            status_text: status_text(StatusCode::NOT_FOUND),
        };
        assert_eq!(err.to_string(), "Failed to fetch index: Not Found");
    }

    #[test]
    fn unknown_status_falls_back_to_code() {
        let code = StatusCode::from_u16(599).unwrap();
        assert_eq!(status_text(code), "599");
    }
}
