//! deep-research-agent: an iterative web research agent.
//!
//! Given a natural-language query the agent plans sub-topics, searches
//! the web, scrapes pages into a semantically queryable knowledge store,
//! synthesizes a cited report, and reviews its own draft, looping back
//! into research until the reviewer is satisfied or the loop budget runs
//! out. The accumulated store also serves follow-up Q&A after the run.

pub mod agent;
pub mod config;
pub mod error;
pub mod llm;
pub mod prompts;
pub mod qa;
pub mod scrape;
pub mod search;
pub mod server;
pub mod splitter;
pub mod state;
pub mod store;

pub use agent::{ResearchAgent, RunMetadata, RunOutcome};
pub use config::Config;
pub use qa::{Answer, ResearchQa};
pub use store::{Document, DocumentMetadata, KnowledgeStore};
