//! Page-scraping collaborator backed by the Browserless.io `/content`
//! endpoint.
//!
//! Scraping never returns an error to the caller: every fault is folded
//! into the outcome's status so that one bad URL degrades gracefully
//! instead of aborting the batch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://chrome.browserless.io";

/// Pages shorter than this after text extraction are treated as blocked
/// or empty rather than stored.
const MIN_CONTENT_CHARS: usize = 200;

/// Cap on stored page text.
const MAX_CONTENT_CHARS: usize = 20_000;

/// Classification of a scrape attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    /// Page fetched and enough text extracted.
    Success,
    /// Page fetched but the extracted text was too short to be useful.
    Minimal,
    /// Non-200 response or a transport fault.
    Error,
    /// The fetch timed out.
    Timeout,
}

/// Result of scraping one URL.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeOutcome {
    pub content: String,
    pub title: String,
    pub url: String,
    pub scraped_at: DateTime<Utc>,
    pub status: ScrapeStatus,
}

impl ScrapeOutcome {
    fn failed(url: &str, status: ScrapeStatus, message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            title: "Error".to_string(),
            url: url.to_string(),
            scraped_at: Utc::now(),
            status,
        }
    }
}

/// Scrape collaborator seam, mockable in tests.
#[async_trait]
pub trait PageScraper: Send + Sync {
    /// Fetch rendered page text. The objective describes what the caller
    /// is researching and is only a hint for downstream summarization.
    async fn scrape(&self, url: &str, objective: &str) -> ScrapeOutcome;
}

/// Browserless.io scraping client.
pub struct BrowserlessClient {
    client: Client,
    api_key: String,
    base_url: String,
    title_re: Regex,
}

impl BrowserlessClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(45))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            // Infallible: the pattern is a compile-time constant.
            title_re: Regex::new(r"(?is)<title[^>]*>(.*?)</title>")
                .unwrap_or_else(|_| Regex::new("$^").unwrap()),
        }
    }

    /// Point the client at a different API host. Used by tests.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn extract_title(&self, html: &str, url: &str) -> String {
        self.title_re
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| url.to_string())
    }

    fn classify(&self, url: &str, html: &str) -> ScrapeOutcome {
        let title = self.extract_title(html, url);
        let text = html_to_text(html);

        if text.chars().count() < MIN_CONTENT_CHARS {
            return ScrapeOutcome {
                content: "Error: Content too short or blocked.".to_string(),
                title,
                url: url.to_string(),
                scraped_at: Utc::now(),
                status: ScrapeStatus::Minimal,
            };
        }

        ScrapeOutcome {
            content: truncate_chars(&text, MAX_CONTENT_CHARS),
            title,
            url: url.to_string(),
            scraped_at: Utc::now(),
            status: ScrapeStatus::Success,
        }
    }
}

#[async_trait]
impl PageScraper for BrowserlessClient {
    async fn scrape(&self, url: &str, objective: &str) -> ScrapeOutcome {
        debug!(url = %url, objective = %objective, "Scraping page");

        let payload = json!({
            "url": url,
            "rejectRequestPattern": [
                ".jpg", ".jpeg", ".png", ".gif", ".svg", ".css",
                ".mp4", ".woff", ".woff2", ".ico", ".webp",
                "google-analytics", "doubleclick", "googletagmanager"
            ],
            "gotoOptions": {
                "timeout": 15000,
                "waitUntil": "domcontentloaded"
            }
        });

        let request = self
            .client
            .post(format!("{}/content?token={}", self.base_url, self.api_key))
            .json(&payload)
            .send()
            .await;

        let response = match request {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(url = %url, "Scrape timed out");
                return ScrapeOutcome::failed(url, ScrapeStatus::Timeout, "Error: Scrape timed out.");
            }
            Err(e) => {
                // Never echo the raw error: it can contain the token URL.
                warn!(url = %url, error = %redact(&e.to_string(), &self.api_key), "Scrape failed");
                return ScrapeOutcome::failed(
                    url,
                    ScrapeStatus::Error,
                    "Error: Technical issue scraping website.",
                );
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "Scrape returned non-success status");
            return ScrapeOutcome::failed(
                url,
                ScrapeStatus::Error,
                format!("Error: Scrape failed with status {}", status.as_u16()),
            );
        }

        match response.text().await {
            Ok(html) => self.classify(url, &html),
            Err(e) => {
                warn!(url = %url, error = %redact(&e.to_string(), &self.api_key), "Scrape body read failed");
                ScrapeOutcome::failed(
                    url,
                    ScrapeStatus::Error,
                    "Error: Technical issue scraping website.",
                )
            }
        }
    }
}

/// Reduce rendered HTML to plain text.
fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), 120).trim().to_string()
}

/// Character-boundary-safe prefix truncation.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

fn redact(message: &str, secret: &str) -> String {
    if secret.is_empty() {
        message.to_string()
    } else {
        message.replace(secret, "REDACTED_KEY")
    }
}
