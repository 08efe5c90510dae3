//! Configuration loaded from environment variables.
//!
//! A `.env` file is honoured for local development. API keys are required
//! for the production collaborators; everything else has a sensible
//! default that can be overridden.

use anyhow::{Context, Result};
use std::env;

/// Runtime configuration for the research agent.
#[derive(Debug, Clone)]
pub struct Config {
    /// Mistral API key (chat completions and embeddings).
    pub mistral_api_key: String,

    /// Serper.dev API key for web search.
    pub serper_api_key: String,

    /// Browserless.io API key for page scraping.
    pub browserless_api_key: String,

    /// Chat model used for planning, writing and reviewing.
    pub model: String,

    /// Embedding model backing the knowledge store.
    pub embed_model: String,

    /// Maximum review-triggered retries before forced termination.
    pub max_loops: u32,

    /// Results requested from the search API per query.
    pub search_results: usize,

    /// URLs selected for scraping per research iteration.
    pub max_scrape_urls: usize,

    /// Chunk size for splitting scraped text.
    pub chunk_size: usize,

    /// Overlap between adjacent chunks.
    pub chunk_overlap: usize,

    /// Bind address for the HTTP ingress.
    pub host: String,

    /// Bind port for the HTTP ingress.
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mistral_api_key: String::new(),
            serper_api_key: String::new(),
            browserless_api_key: String::new(),
            model: "mistral-small-latest".to_string(),
            embed_model: "mistral-embed".to_string(),
            max_loops: 3,
            search_results: 10,
            max_scrape_urls: 5,
            chunk_size: 1000,
            chunk_overlap: 200,
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

impl Config {
    /// Load configuration from the environment, honouring a `.env` file.
    pub fn from_env() -> Result<Self> {
        // Silently ignore a missing .env file.
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Ok(val) = env::var("MISTRAL_API_KEY") {
            config.mistral_api_key = val;
        }
        if let Ok(val) = env::var("SERP_API_KEY") {
            config.serper_api_key = val;
        }
        if let Ok(val) = env::var("BROWSERLESS_API_KEY") {
            config.browserless_api_key = val;
        }
        if let Ok(val) = env::var("RESEARCH_MODEL") {
            config.model = val;
        }
        if let Ok(val) = env::var("RESEARCH_EMBED_MODEL") {
            config.embed_model = val;
        }
        if let Ok(val) = env::var("RESEARCH_MAX_LOOPS") {
            config.max_loops = val
                .parse()
                .context("RESEARCH_MAX_LOOPS must be a positive integer")?;
        }
        if let Ok(val) = env::var("RESEARCH_HOST") {
            config.host = val;
        }
        if let Ok(val) = env::var("RESEARCH_PORT") {
            config.port = val
                .parse()
                .context("RESEARCH_PORT must be a valid TCP port")?;
        }

        Ok(config)
    }

    /// Validate the configuration before the agent starts.
    ///
    /// Failing fast here beats a confusing collaborator error mid-run.
    pub fn validate(&self) -> Result<()> {
        if self.mistral_api_key.is_empty() {
            anyhow::bail!("MISTRAL_API_KEY is not set");
        }
        if self.serper_api_key.is_empty() {
            anyhow::bail!("SERP_API_KEY is not set");
        }
        if self.browserless_api_key.is_empty() {
            anyhow::bail!("BROWSERLESS_API_KEY is not set");
        }
        if self.max_loops == 0 {
            anyhow::bail!("RESEARCH_MAX_LOOPS must be at least 1");
        }
        if self.max_scrape_urls == 0 {
            anyhow::bail!("max_scrape_urls must be at least 1");
        }
        if self.chunk_overlap >= self.chunk_size {
            anyhow::bail!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap,
                self.chunk_size
            );
        }
        Ok(())
    }
}
