//! Error types for the research agent.
//!
//! The taxonomy mirrors how failures are recovered: search and scrape
//! faults are absorbed at the call site and degrade to empty results or
//! error-tagged outcomes, while model faults during planning, writing or
//! reviewing propagate and terminate the run with a failed outcome.

use thiserror::Error;

/// Failures talking to the language-model collaborator.
///
/// These are the only collaborator faults that abort a run: the loop
/// cannot make progress without a planner, writer or reviewer.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("model request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model response missing content")]
    EmptyResponse,

    #[error("failed to parse model response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failures talking to the search collaborator.
///
/// Always recovered locally: a failed search step degrades to an empty
/// result list and the loop continues.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("search API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to parse search response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Run-level errors surfaced to the caller as a failed `RunOutcome`.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("configuration error: {0}")]
    Config(String),
}
