use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use autocat_core::SearchResult;
use thiserror::Error;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Search provider returned {0}")]
    Status(u16),
    #[error("Search timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Provider(String),
}

/// A web search backend. Results come back in relevance order.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError>;
}

/// Bounded, failure-tolerant payee lookup on top of a [`SearchProvider`].
pub struct EnrichmentLookup<P> {
    provider: P,
    timeout: Duration,
}

impl<P: SearchProvider> EnrichmentLookup<P> {
    pub fn new(provider: P, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// At most `limit` results in provider order. Provider errors and
    /// timeouts are logged and produce an empty list.
    pub async fn search(&self, query: &str, limit: usize) -> Vec<SearchResult> {
        let outcome = tokio::time::timeout(self.timeout, self.provider.search(query))
            .await
            .unwrap_or(Err(SearchError::Timeout(self.timeout)));

        match outcome {
            Ok(mut results) => {
                results.truncate(limit);
                results
            }
            Err(e) => {
                error!(query, error = %e, "Search error");
                info!("Continuing without search results.");
                Vec::new()
            }
        }
    }
}

// ── Mock provider (always available, used for tests) ──────────────────────────

/// Serves a fixed result list, or fails every call.
pub struct MockSearch {
    outcome: Result<Vec<SearchResult>, String>,
    queries: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            outcome: Ok(results),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries
            .lock()
            .map(|q| q.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SearchProvider for MockSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>, SearchError> {
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query.to_string());
        }
        self.outcome.clone().map_err(SearchError::Provider)
    }
}
