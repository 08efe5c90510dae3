//! Follow-up Q&A over the accumulated research.
//!
//! Serves questions against whatever the knowledge store currently
//! holds; tolerates a cold store by answering without a model call.

use std::sync::Arc;
use tracing::info;

use crate::error::AgentError;
use crate::llm::CompletionModel;
use crate::prompts;
use crate::store::KnowledgeStore;

/// Chunk excerpt budget in the Q&A context.
const CONTEXT_SNIPPET_CHARS: usize = 300;

/// Chunks retrieved per question.
const QA_RESULTS: usize = 5;

/// An answer with the sources it drew from.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Answer {
    pub answer: String,
    pub sources: Vec<String>,
}

/// Answers questions against a populated knowledge store.
pub struct ResearchQa {
    llm: Arc<dyn CompletionModel>,
    store: Arc<KnowledgeStore>,
}

impl ResearchQa {
    pub fn new(llm: Arc<dyn CompletionModel>, store: Arc<KnowledgeStore>) -> Self {
        Self { llm, store }
    }

    /// Answer a question from collected research. A cold or unhelpful
    /// store yields a canned answer; model faults propagate.
    pub async fn answer_question(&self, question: &str) -> Result<Answer, AgentError> {
        if self.store.count().await == 0 {
            return Ok(Answer {
                answer: "No research data found. Run a research query first, then ask \
                         questions about the findings."
                    .to_string(),
                sources: vec![],
            });
        }

        let relevant = self.store.similarity_search(question, QA_RESULTS).await;
        if relevant.is_empty() {
            return Ok(Answer {
                answer: "No relevant information found. Try rephrasing the question or ask \
                         about specific aspects of the research."
                    .to_string(),
                sources: vec![],
            });
        }

        let mut context_parts = Vec::new();
        let mut sources: Vec<String> = Vec::new();
        for (i, doc) in relevant.iter().enumerate() {
            let excerpt = excerpt(&doc.content, CONTEXT_SNIPPET_CHARS);
            context_parts.push(format!(
                "Source {}: {}\n{}",
                i + 1,
                doc.metadata.title,
                excerpt
            ));

            let source = format!("{} ({})", doc.metadata.title, doc.metadata.source);
            if !sources.contains(&source) {
                sources.push(source);
            }
        }
        let context = context_parts.join("\n\n---\n\n");

        info!(chunks = relevant.len(), "Answering follow-up question");
        let answer = self
            .llm
            .complete(&prompts::qa_system(&context), &prompts::qa_user(question))
            .await?;

        Ok(Answer { answer, sources })
    }
}

fn excerpt(content: &str, max_chars: usize) -> String {
    if content.chars().count() <= max_chars {
        return content.to_string();
    }
    let cut: String = content.chars().take(max_chars).collect();
    format!("{cut}...")
}
