//! The "fetch text by URL" transport.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {url}: {reason}")]
    Request { url: String, reason: String },

    #[error("unexpected status {status} fetching {url}")]
    Status { url: String, status: u16 },
}

/// Resolves a URL to its text content. Markup, stylesheets and scripts all
/// go through this one capability.
#[async_trait]
pub trait TextFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTP transport backed by reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a client with the given per-request timeout.
    pub fn new(timeout_ms: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .user_agent("fresco/0.3")
            .build()
            .map_err(|e| FetchError::Request {
                url: String::new(),
                reason: format!("http client: {e}"),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TextFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Request {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        resp.text().await.map_err(|e| FetchError::Request {
            url: url.to_string(),
            reason: format!("read body: {e}"),
        })
    }
}

/// A mock transport for testing.
pub mod mock {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// Serves canned responses from a url → text map, with per-URL failure
    /// injection and hit counting so callers can assert cache behavior.
    #[derive(Default)]
    pub struct StaticFetcher {
        routes: Mutex<HashMap<String, String>>,
        failing: Mutex<HashSet<String>>,
        hits: Mutex<HashMap<String, usize>>,
    }

    impl StaticFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers a URL and its response body.
        pub fn route(&self, url: impl Into<String>, body: impl Into<String>) {
            self.routes.lock().unwrap().insert(url.into(), body.into());
        }

        /// Makes every fetch of this URL fail.
        pub fn fail(&self, url: impl Into<String>) {
            self.failing.lock().unwrap().insert(url.into());
        }

        /// How many times a URL has been fetched.
        pub fn hits(&self, url: &str) -> usize {
            self.hits.lock().unwrap().get(url).copied().unwrap_or(0)
        }
    }

    #[async_trait]
    impl TextFetcher for StaticFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
            *self.hits.lock().unwrap().entry(url.to_string()).or_insert(0) += 1;

            if self.failing.lock().unwrap().contains(url) {
                return Err(FetchError::Request {
                    url: url.to_string(),
                    reason: "injected failure".to_string(),
                });
            }
            self.routes
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
        }
    }
}
