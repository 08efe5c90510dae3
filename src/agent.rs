//! The research agent: an explicit state machine driving the
//! plan → research → scrape → write → review cycle.
//!
//! Collaborator faults are handled at the narrowest scope that can
//! recover them: a failed search degrades to an empty result list, a
//! failed scrape skips one URL, a rejected store batch skips one page.
//! Model faults in PLAN/WRITE/REVIEW propagate and fail the run; the
//! driver converts them into a failed `RunOutcome` rather than a panic.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::AgentError;
use crate::llm::CompletionModel;
use crate::prompts;
use crate::scrape::{PageScraper, ScrapeStatus};
use crate::search::{filter_quality_results, SearchProvider};
use crate::splitter::TextSplitter;
use crate::state::{ResearchState, ReviewDecision, Stage};
use crate::store::{Document, DocumentMetadata, KnowledgeStore};

/// Appended to the report when the loop budget forces termination.
const LIMITED_SOURCES_DISCLAIMER: &str =
    "\n\n*Note: Research was limited due to source availability.*";

/// Snippet budget per source in the writer prompt.
const SOURCE_SNIPPET_CHARS: usize = 500;

/// Cap on sources handed to the writer.
const MAX_WRITE_SOURCES: usize = 10;

/// Run metadata handed to the reporting layer alongside the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub urls_scraped: u32,
    #[serde(rename = "search_queries")]
    pub search_queries_made: u32,
    pub loop_count: u32,
    pub documents_count: usize,
    pub session_id: String,
}

impl RunMetadata {
    fn from_state(state: &ResearchState) -> Self {
        Self {
            urls_scraped: state.urls_scraped,
            search_queries_made: state.search_queries_made,
            loop_count: state.loop_count,
            documents_count: state.accumulated_documents.len(),
            session_id: state.session_id.clone(),
        }
    }
}

/// Final result of a research run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub success: bool,
    pub report: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: RunMetadata,
}

/// The research control loop over its four collaborators.
pub struct ResearchAgent {
    llm: Arc<dyn CompletionModel>,
    search: Arc<dyn SearchProvider>,
    scraper: Arc<dyn PageScraper>,
    store: Arc<KnowledgeStore>,
    splitter: TextSplitter,
    max_loops: u32,
    search_results: usize,
    max_scrape_urls: usize,
}

impl ResearchAgent {
    pub fn new(
        llm: Arc<dyn CompletionModel>,
        search: Arc<dyn SearchProvider>,
        scraper: Arc<dyn PageScraper>,
        store: Arc<KnowledgeStore>,
        config: &Config,
    ) -> Self {
        Self {
            llm,
            search,
            scraper,
            store,
            splitter: TextSplitter::new(config.chunk_size, config.chunk_overlap),
            max_loops: config.max_loops,
            search_results: config.search_results,
            max_scrape_urls: config.max_scrape_urls,
        }
    }

    /// The knowledge store this agent writes into.
    pub fn store(&self) -> &Arc<KnowledgeStore> {
        &self.store
    }

    /// Execute one full research run. Never panics and never raises: a
    /// run-level fault is reported through the outcome.
    pub async fn run(&self, query: &str, session_id: &str) -> RunOutcome {
        info!(query = %query, session_id = %session_id, "Starting research run");

        let mut state = ResearchState::new(query, session_id, self.max_loops);
        match self.drive(&mut state).await {
            Ok(()) => {
                info!(
                    session_id = %session_id,
                    urls_scraped = state.urls_scraped,
                    loop_count = state.loop_count,
                    documents = state.accumulated_documents.len(),
                    "Research run completed"
                );
                RunOutcome {
                    success: true,
                    report: state.report.clone(),
                    error: None,
                    metadata: RunMetadata::from_state(&state),
                }
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Research run failed");
                RunOutcome {
                    success: false,
                    report: format!("Error occurred during research: {e}"),
                    error: Some(e.to_string()),
                    metadata: RunMetadata::from_state(&state),
                }
            }
        }
    }

    /// Drive the stage machine until a terminal stage.
    async fn drive(&self, state: &mut ResearchState) -> Result<(), AgentError> {
        let mut stage = Stage::Plan;
        while !stage.is_terminal() {
            debug!(stage = ?stage, loop_count = state.loop_count, "Entering stage");
            stage = match stage {
                Stage::Plan => {
                    self.plan(state).await?;
                    Stage::Research
                }
                Stage::Research => {
                    self.research(state).await;
                    Stage::Scrape
                }
                Stage::Scrape => {
                    self.scrape(state).await;
                    Stage::Write
                }
                Stage::Write => {
                    self.write(state).await?;
                    Stage::Review
                }
                Stage::Review => self.review(state).await?,
                Stage::End => Stage::End,
            };
        }
        Ok(())
    }

    /// PLAN: decompose the query into sub-topics. Malformed model output
    /// degrades to a single sub-topic equal to the query itself.
    async fn plan(&self, state: &mut ResearchState) -> Result<(), AgentError> {
        let response = self
            .llm
            .complete(prompts::PLANNER_SYSTEM, &format!("Query: {}", state.query))
            .await?;

        state.sub_topics = parse_sub_topics(&response, &state.query);
        state.sub_topic_cursor = 0;
        info!(sub_topics = ?state.sub_topics, "Plan created");
        Ok(())
    }

    /// RESEARCH: search the current sub-topic and select URLs to scrape.
    /// A search collaborator fault degrades to an empty result list.
    async fn research(&self, state: &mut ResearchState) {
        let Some(topic) = state.current_sub_topic() else {
            debug!("Sub-topics exhausted, research step is a no-op");
            return;
        };

        // Bias retries toward different results.
        let topic = if state.loop_count > 0 {
            format!("{topic} - additional research needed")
        } else {
            topic.to_string()
        };
        let search_query = format!("{} : {}", state.query, topic);
        info!(search_query = %search_query, "Searching");

        let raw_results = match self.search.search(&search_query, self.search_results).await {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Search failed, continuing with no results");
                Vec::new()
            }
        };

        let filtered = filter_quality_results(raw_results);
        info!(count = filtered.len(), "Quality URLs found");

        state.current_urls = filtered
            .iter()
            .take(self.max_scrape_urls)
            .map(|r| r.link.clone())
            .collect();
        state.search_results = filtered;
        state.search_queries_made += 1;
    }

    /// SCRAPE: fetch each selected URL sequentially; only successful
    /// outcomes are chunked and committed to the knowledge store. One
    /// URL's failure never aborts the batch.
    async fn scrape(&self, state: &mut ResearchState) {
        let objective = state
            .current_sub_topic()
            .unwrap_or(&state.query)
            .to_string();
        let urls = state.current_urls.clone();
        info!(count = urls.len(), "Scraping selected URLs");

        for url in urls {
            let outcome = self.scraper.scrape(&url, &objective).await;

            if outcome.status != ScrapeStatus::Success {
                warn!(url = %url, status = ?outcome.status, "Skipping URL");
                continue;
            }

            let documents: Vec<Document> = self
                .splitter
                .split(&outcome.content)
                .into_iter()
                .enumerate()
                .map(|(chunk_index, content)| Document {
                    content,
                    metadata: DocumentMetadata {
                        source: url.clone(),
                        title: outcome.title.clone(),
                        scraped_at: outcome.scraped_at,
                        chunk_index,
                    },
                })
                .collect();

            if documents.is_empty() {
                warn!(url = %url, "Scrape produced no chunks");
                continue;
            }

            if self.store.add(documents.clone()).await {
                info!(url = %url, chunks = documents.len(), "Chunks added to knowledge store");
                state.urls_scraped += 1;
                state.accumulated_documents.extend(documents);
            } else {
                warn!(url = %url, "Knowledge store rejected batch");
            }
        }
    }

    /// WRITE: synthesize a cited report draft from the chunks most
    /// similar to the original query. Must work on an empty source set.
    async fn write(&self, state: &mut ResearchState) -> Result<(), AgentError> {
        let k = MAX_WRITE_SOURCES.min(state.accumulated_documents.len());
        let relevant = self.store.similarity_search(&state.query, k).await;

        let mut sources_text = String::new();
        for doc in &relevant {
            sources_text.push_str(&format!(
                "Source: {} ({})\nContent: {}\n---\n",
                doc.metadata.title,
                doc.metadata.source,
                truncate_chars(&doc.content, SOURCE_SNIPPET_CHARS)
            ));
        }

        let draft = self
            .llm
            .complete(
                prompts::WRITER_SYSTEM,
                &prompts::writer_user(&state.query, &sources_text),
            )
            .await?;

        info!(chars = draft.len(), sources = relevant.len(), "Report draft created");
        state.report_draft = draft;
        Ok(())
    }

    /// REVIEW: classify the draft and either terminate or loop back.
    async fn review(&self, state: &mut ResearchState) -> Result<Stage, AgentError> {
        let response = self
            .llm
            .complete(
                prompts::REVIEWER_SYSTEM,
                &prompts::reviewer_user(&state.report_draft),
            )
            .await?;

        let decision = ReviewDecision::parse(&response);
        info!(decision = ?decision, loop_count = state.loop_count, "Review decision");

        match decision {
            ReviewDecision::Complete => {
                state.report = state.report_draft.clone();
                state.mark_exhausted();
                Ok(Stage::End)
            }
            _ if state.budget_exhausted() => {
                warn!("Loop budget exhausted, forcing completion");
                state.report = format!("{}{}", state.report_draft, LIMITED_SOURCES_DISCLAIMER);
                state.mark_exhausted();
                Ok(Stage::End)
            }
            _ => {
                state.advance_for_retry();
                Ok(Stage::Research)
            }
        }
    }
}

/// Parse the planner's response into a sub-topic list, tolerating
/// markdown code fences. Anything unusable falls back to the query.
fn parse_sub_topics(response: &str, query: &str) -> Vec<String> {
    let cleaned = strip_code_fences(response.trim());
    match serde_json::from_str::<Vec<String>>(cleaned) {
        Ok(topics) if !topics.is_empty() => topics,
        _ => {
            warn!("Planner response was not a JSON array, falling back to the query");
            vec![query.to_string()]
        }
    }
}

fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
