//! HTTP ingress: a thin axum layer over the research agent.
//!
//! `POST /research` runs one full research session (the knowledge store
//! is cleared at the start of each session); `POST /question` answers
//! follow-ups against whatever the last session collected. Run-level
//! faults are payload, not transport, errors: a failed run still returns
//! HTTP 200 with `success: false`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::agent::{ResearchAgent, RunOutcome};
use crate::config::Config;
use crate::qa::{Answer, ResearchQa};

/// Shared handler state.
pub struct AppState {
    pub agent: Arc<ResearchAgent>,
    pub qa: Arc<ResearchQa>,
}

#[derive(Debug, Deserialize)]
pub struct ResearchRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/research", post(research))
        .route("/question", post(question))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, config: &Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "Research agent listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let documents = state.agent.store().count().await;
    Json(json!({ "status": "ok", "documents": documents }))
}

async fn research(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ResearchRequest>,
) -> Result<Json<RunOutcome>, (StatusCode, Json<Value>)> {
    let query = request.query.trim();
    if query.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "query must not be empty" })),
        ));
    }

    // Each request is a fresh session over a clean store.
    state.agent.store().clear().await;
    let session_id = Uuid::new_v4().to_string();

    Ok(Json(state.agent.run(query, &session_id).await))
}

async fn question(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<Answer>, (StatusCode, Json<Value>)> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "question must not be empty" })),
        ));
    }

    match state.qa.answer_question(question).await {
        Ok(answer) => Ok(Json(answer)),
        Err(e) => Err((
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{LlmError, SearchError};
    use crate::llm::{CompletionModel, Embedder};
    use crate::scrape::{PageScraper, ScrapeOutcome, ScrapeStatus};
    use crate::search::{SearchProvider, SearchResult};
    use crate::store::KnowledgeStore;
    use async_trait::async_trait;
    use chrono::Utc;

    struct ScriptedModel;

    #[async_trait]
    impl CompletionModel for ScriptedModel {
        async fn complete(&self, system: &str, _user: &str) -> Result<String, LlmError> {
            if system.contains("planning expert") {
                Ok(r#"["only topic"]"#.to_string())
            } else if system.contains("quality reviewer") {
                Ok("COMPLETE".to_string())
            } else {
                Ok("A short report.".to_string())
            }
        }
    }

    struct NoResults;

    #[async_trait]
    impl SearchProvider for NoResults {
        async fn search(
            &self,
            _query: &str,
            _num_results: usize,
        ) -> Result<Vec<SearchResult>, SearchError> {
            Ok(vec![])
        }
    }

    struct NeverScrapes;

    #[async_trait]
    impl PageScraper for NeverScrapes {
        async fn scrape(&self, url: &str, _objective: &str) -> ScrapeOutcome {
            ScrapeOutcome {
                content: String::new(),
                title: "Error".to_string(),
                url: url.to_string(),
                scraped_at: Utc::now(),
                status: ScrapeStatus::Error,
            }
        }
    }

    struct UnitEmbedder;

    #[async_trait]
    impl Embedder for UnitEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(texts.iter().map(|_| vec![1.0]).collect())
        }
    }

    fn app_state() -> Arc<AppState> {
        let llm: Arc<dyn CompletionModel> = Arc::new(ScriptedModel);
        let store = Arc::new(KnowledgeStore::new(Arc::new(UnitEmbedder)));
        let agent = Arc::new(ResearchAgent::new(
            llm.clone(),
            Arc::new(NoResults),
            Arc::new(NeverScrapes),
            store.clone(),
            &Config::default(),
        ));
        let qa = Arc::new(ResearchQa::new(llm, store));
        Arc::new(AppState { agent, qa })
    }

    #[tokio::test]
    async fn research_endpoint_returns_outcome() {
        let state = app_state();
        let response = research(
            State(state),
            Json(ResearchRequest {
                query: "solid-state batteries".to_string(),
            }),
        )
        .await
        .unwrap();

        assert!(response.0.success);
        assert_eq!(response.0.report, "A short report.");
        assert!(!response.0.metadata.session_id.is_empty());
    }

    #[tokio::test]
    async fn empty_query_is_rejected() {
        let state = app_state();
        let err = research(
            State(state),
            Json(ResearchRequest {
                query: "   ".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn question_endpoint_answers_on_cold_store() {
        let state = app_state();
        let answer = question(
            State(state),
            Json(QuestionRequest {
                question: "what did we learn?".to_string(),
            }),
        )
        .await
        .unwrap();

        assert!(answer.0.answer.contains("No research data"));
    }
}
