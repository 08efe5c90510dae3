//! Web search collaborator backed by the Serper.dev API.
//!
//! Maps a query string to an ordered list of organic results and applies
//! a quality filter that drops blacklisted domains and empty entries.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::SearchError;

const DEFAULT_BASE_URL: &str = "https://google.serper.dev";

/// Domains excluded from scraping: video and social platforms rarely
/// yield extractable research text.
const BLACKLIST_DOMAINS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "pinterest.com",
    "instagram.com",
    "facebook.com",
    "twitter.com",
    "tiktok.com",
    "reddit.com",
];

/// A single organic search result.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchResult {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub position: u32,
}

/// Search collaborator seam. The control loop only depends on this trait;
/// tests drive it with scripted results.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Return up to `num_results` ranked results for a query.
    async fn search(&self, query: &str, num_results: usize)
        -> Result<Vec<SearchResult>, SearchError>;
}

/// Serper.dev search client.
pub struct SerperClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SearchResult>,
}

impl SerperClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API host. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl SearchProvider for SerperClient {
    async fn search(
        &self,
        query: &str,
        num_results: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        debug!(query = %query, "Requesting web search");

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .json(&json!({ "q": query, "num": num_results }))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SerperResponse = serde_json::from_str(&body)?;
        info!(query = %query, count = parsed.organic.len(), "Search completed");
        Ok(parsed.organic)
    }
}

/// Drop results whose link contains a blacklisted domain substring or
/// whose title/snippet is empty. Order is preserved.
pub fn filter_quality_results(results: Vec<SearchResult>) -> Vec<SearchResult> {
    results
        .into_iter()
        .filter(|r| {
            let url = r.link.to_lowercase();
            if BLACKLIST_DOMAINS.iter().any(|domain| url.contains(domain)) {
                return false;
            }
            !r.title.is_empty() && !r.snippet.is_empty()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn result(title: &str, link: &str, snippet: &str) -> SearchResult {
        SearchResult {
            title: title.to_string(),
            link: link.to_string(),
            snippet: snippet.to_string(),
            position: 0,
        }
    }

    #[test]
    fn filter_drops_blacklisted_domains() {
        let results = vec![
            result("Video", "https://www.youtube.com/watch?v=1", "A video"),
            result("Article", "https://example.com/a", "An article"),
            result("Thread", "https://old.reddit.com/r/rust", "A thread"),
        ];

        let filtered = filter_quality_results(results);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].link, "https://example.com/a");
    }

    #[test]
    fn filter_drops_missing_title_or_snippet() {
        let results = vec![
            result("", "https://example.com/a", "snippet"),
            result("Title", "https://example.com/b", ""),
            result("Kept", "https://example.com/c", "snippet"),
        ];

        let filtered = filter_quality_results(results);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "Kept");
    }

    #[test]
    fn filter_preserves_order() {
        let results = vec![
            result("First", "https://a.example.com", "s"),
            result("Second", "https://b.example.com", "s"),
        ];

        let filtered = filter_quality_results(results);
        assert_eq!(filtered[0].title, "First");
        assert_eq!(filtered[1].title, "Second");
    }

    #[tokio::test]
    async fn serper_client_parses_organic_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(header("X-API-KEY", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "organic": [
                    {"title": "Solid-state batteries", "link": "https://example.com",
                     "snippet": "An overview", "position": 1}
                ]
            })))
            .mount(&server)
            .await;

        let client = SerperClient::new("test-key").with_base_url(server.uri());
        let results = client.search("solid-state batteries", 10).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Solid-state batteries");
        assert_eq!(results[0].position, 1);
    }

    #[tokio::test]
    async fn serper_client_surfaces_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(403).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = SerperClient::new("wrong").with_base_url(server.uri());
        let err = client.search("anything", 10).await.unwrap_err();
        assert!(matches!(err, SearchError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn serper_client_tolerates_missing_organic_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let client = SerperClient::new("test-key").with_base_url(server.uri());
        let results = client.search("anything", 10).await.unwrap();
        assert!(results.is_empty());
    }
}
