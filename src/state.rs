//! Research run state and the explicit stage machine.
//!
//! One `ResearchState` is created per run, mutated in place by each
//! stage, and discarded once the outcome has been extracted. The `Stage`
//! enum plus the driver in `agent.rs` replace the implicit loop of a
//! shared mutable record wandering through callbacks: every transition is
//! spelled out in one place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::search::SearchResult;
use crate::store::Document;

/// Stages of the research cycle.
///
/// `Plan` runs once; `Review` either loops back to `Research` or reaches
/// `End`. Termination is guaranteed because `loop_count` strictly
/// increases on every non-complete review and is capped by `max_loops`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Plan,
    Research,
    Scrape,
    Write,
    Review,
    End,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End)
    }
}

/// Reviewer verdict on a report draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Complete,
    NeedMoreResearch,
    SourcesInsufficient,
}

impl ReviewDecision {
    /// Parse a free-text reviewer response into a verdict. Total: every
    /// input maps to a variant, with `NeedMoreResearch` as the fallback
    /// so an unparseable review retries rather than terminates.
    ///
    /// Labels are checked in priority order; a bare `COMPLETE` is only
    /// accepted as a standalone word not preceded by `NOT`, so responses
    /// like "NOT COMPLETE" or "INCOMPLETE" do not end the run.
    pub fn parse(response: &str) -> Self {
        let upper = response.to_uppercase();

        if upper.contains("NEED_MORE_RESEARCH") {
            return Self::NeedMoreResearch;
        }
        if upper.contains("SOURCES_INSUFFICIENT") {
            return Self::SourcesInsufficient;
        }
        if contains_affirmative_complete(&upper) {
            return Self::Complete;
        }
        Self::NeedMoreResearch
    }
}

/// Word-bounded `COMPLETE` that is not negated by a preceding `NOT`.
fn contains_affirmative_complete(upper: &str) -> bool {
    let bytes = upper.as_bytes();
    let mut search_from = 0;

    while let Some(offset) = upper[search_from..].find("COMPLETE") {
        let start = search_from + offset;
        let end = start + "COMPLETE".len();
        search_from = start + 1;

        let bounded_left = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let bounded_right = end == upper.len() || !bytes[end].is_ascii_alphanumeric();
        if !bounded_left || !bounded_right {
            continue;
        }

        let negated = upper[..start].trim_end().ends_with("NOT");
        if !negated {
            return true;
        }
    }
    false
}

/// The single mutable record threaded through the loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchState {
    /// Original user request; immutable after creation.
    pub query: String,

    /// Sub-topics produced once by planning; indexed, never re-ordered.
    pub sub_topics: Vec<String>,

    /// Cursor into `sub_topics`; `== sub_topics.len()` signals that the
    /// run is done with this pass (termination sentinel).
    pub sub_topic_cursor: usize,

    /// Most recent filtered search hits; overwritten each research step.
    pub search_results: Vec<SearchResult>,

    /// URLs selected for scraping this iteration.
    pub current_urls: Vec<String>,

    /// Append-only collection of stored chunks across the whole run.
    pub accumulated_documents: Vec<Document>,

    /// In-progress report text.
    pub report_draft: String,

    /// Finalized report; empty until review accepts (or the budget
    /// forces acceptance).
    pub report: String,

    /// Review-triggered retry counter.
    pub loop_count: u32,

    /// Retry ceiling; the loop is force-ended at the ceiling regardless
    /// of quality.
    pub max_loops: u32,

    /// Monotonic observability counters.
    pub urls_scraped: u32,
    pub search_queries_made: u32,

    /// Identity and provenance, immutable.
    pub session_id: String,
    pub start_time: DateTime<Utc>,
}

impl ResearchState {
    pub fn new(query: impl Into<String>, session_id: impl Into<String>, max_loops: u32) -> Self {
        Self {
            query: query.into(),
            sub_topics: Vec::new(),
            sub_topic_cursor: 0,
            search_results: Vec::new(),
            current_urls: Vec::new(),
            accumulated_documents: Vec::new(),
            report_draft: String::new(),
            report: String::new(),
            loop_count: 0,
            max_loops,
            urls_scraped: 0,
            search_queries_made: 0,
            session_id: session_id.into(),
            start_time: Utc::now(),
        }
    }

    /// The sub-topic under the cursor, if any remain this pass.
    pub fn current_sub_topic(&self) -> Option<&str> {
        self.sub_topics.get(self.sub_topic_cursor).map(|s| s.as_str())
    }

    /// Whether the cursor has reached the exhaustion sentinel.
    pub fn sub_topics_exhausted(&self) -> bool {
        self.sub_topic_cursor >= self.sub_topics.len()
    }

    /// Set the cursor to the termination sentinel.
    pub fn mark_exhausted(&mut self) {
        self.sub_topic_cursor = self.sub_topics.len();
    }

    /// Whether this review cycle is the last the budget allows.
    pub fn budget_exhausted(&self) -> bool {
        self.loop_count + 1 >= self.max_loops
    }

    /// Advance the cursor for another research pass, wrapping to the
    /// first sub-topic once the list is exhausted. Counts against the
    /// global loop budget.
    pub fn advance_for_retry(&mut self) {
        self.sub_topic_cursor += 1;
        self.loop_count += 1;
        if self.sub_topic_cursor >= self.sub_topics.len() {
            self.sub_topic_cursor = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_state_starts_clean() {
        let state = ResearchState::new("query", "session-1", 3);
        assert_eq!(state.query, "query");
        assert_eq!(state.sub_topic_cursor, 0);
        assert_eq!(state.loop_count, 0);
        assert_eq!(state.max_loops, 3);
        assert!(state.report.is_empty());
        assert!(state.accumulated_documents.is_empty());
    }

    #[test]
    fn cursor_wraps_on_retry() {
        let mut state = ResearchState::new("q", "s", 3);
        state.sub_topics = vec!["a".to_string(), "b".to_string()];

        state.advance_for_retry();
        assert_eq!(state.sub_topic_cursor, 1);
        assert_eq!(state.loop_count, 1);

        state.advance_for_retry();
        assert_eq!(state.sub_topic_cursor, 0); // wrapped
        assert_eq!(state.loop_count, 2);
    }

    #[test]
    fn exhaustion_sentinel() {
        let mut state = ResearchState::new("q", "s", 3);
        state.sub_topics = vec!["a".to_string()];
        assert!(!state.sub_topics_exhausted());

        state.mark_exhausted();
        assert!(state.sub_topics_exhausted());
        assert!(state.current_sub_topic().is_none());
    }

    #[test]
    fn budget_exhaustion_at_ceiling_minus_one() {
        let mut state = ResearchState::new("q", "s", 3);
        assert!(!state.budget_exhausted());
        state.loop_count = 1;
        assert!(!state.budget_exhausted());
        state.loop_count = 2;
        assert!(state.budget_exhausted());
    }

    #[test]
    fn budget_of_one_is_exhausted_immediately() {
        let state = ResearchState::new("q", "s", 1);
        assert!(state.budget_exhausted());
    }

    #[test]
    fn review_decision_canonical_labels() {
        assert_eq!(ReviewDecision::parse("COMPLETE"), ReviewDecision::Complete);
        assert_eq!(
            ReviewDecision::parse("NEED_MORE_RESEARCH"),
            ReviewDecision::NeedMoreResearch
        );
        assert_eq!(
            ReviewDecision::parse("SOURCES_INSUFFICIENT"),
            ReviewDecision::SourcesInsufficient
        );
    }

    #[test]
    fn review_decision_is_case_insensitive_and_tolerant_of_prose() {
        assert_eq!(
            ReviewDecision::parse("The report is complete."),
            ReviewDecision::Complete
        );
        assert_eq!(
            ReviewDecision::parse("\"COMPLETE\"\n"),
            ReviewDecision::Complete
        );
    }

    #[test]
    fn negated_complete_does_not_terminate() {
        assert_eq!(
            ReviewDecision::parse("NOT COMPLETE"),
            ReviewDecision::NeedMoreResearch
        );
        assert_eq!(
            ReviewDecision::parse("The report is not complete yet"),
            ReviewDecision::NeedMoreResearch
        );
        assert_eq!(
            ReviewDecision::parse("INCOMPLETE"),
            ReviewDecision::NeedMoreResearch
        );
    }

    #[test]
    fn explicit_label_wins_over_stray_complete() {
        assert_eq!(
            ReviewDecision::parse("NEED_MORE_RESEARCH: sections feel complete but thin"),
            ReviewDecision::NeedMoreResearch
        );
    }

    #[test]
    fn unrecognized_review_falls_back_to_retry() {
        assert_eq!(
            ReviewDecision::parse("I am not sure about this one"),
            ReviewDecision::NeedMoreResearch
        );
        assert_eq!(ReviewDecision::parse(""), ReviewDecision::NeedMoreResearch);
    }
}
