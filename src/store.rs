//! Incremental knowledge store: append-only accumulation of scraped text
//! chunks, queryable by embedding similarity.
//!
//! The store is constructed explicitly and shared by `Arc` between the
//! research loop, the Q&A path and the HTTP handlers; the `RwLock` is the
//! reader/writer discipline that sharing requires. It must tolerate being
//! queried before anything has been added: a cold or faulted store
//! degrades to empty results and boolean failure, never an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::llm::Embedder;

/// Provenance attached to every stored chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub source: String,
    pub title: String,
    pub scraped_at: DateTime<Utc>,
    pub chunk_index: usize,
}

/// One stored text chunk with its provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub metadata: DocumentMetadata,
}

struct StoredDocument {
    document: Document,
    embedding: Vec<f32>,
}

/// Append-only, similarity-searchable document store.
pub struct KnowledgeStore {
    embedder: Arc<dyn Embedder>,
    documents: RwLock<Vec<StoredDocument>>,
}

impl KnowledgeStore {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Embed and append a batch of documents.
    ///
    /// Returns `false` instead of raising on any fault (empty batch,
    /// embedder failure, batch/embedding length mismatch).
    pub async fn add(&self, documents: Vec<Document>) -> bool {
        if documents.is_empty() {
            return false;
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = match self.embedder.embed_batch(&texts).await {
            Ok(embeddings) => embeddings,
            Err(e) => {
                warn!(error = %e, "Embedding failed, batch not stored");
                return false;
            }
        };

        if embeddings.len() != documents.len() {
            warn!(
                expected = documents.len(),
                got = embeddings.len(),
                "Embedding count mismatch, batch not stored"
            );
            return false;
        }

        let mut guard = self.documents.write().await;
        let added = documents.len();
        guard.extend(
            documents
                .into_iter()
                .zip(embeddings)
                .map(|(document, embedding)| StoredDocument {
                    document,
                    embedding,
                }),
        );
        info!(added, total = guard.len(), "Documents added to knowledge store");
        true
    }

    /// Return up to `k` documents ranked by cosine similarity to `query`.
    ///
    /// An empty store, `k == 0` or an embedder fault all yield an empty
    /// vec so callers can run against a cold store.
    pub async fn similarity_search(&self, query: &str, k: usize) -> Vec<Document> {
        if k == 0 {
            return vec![];
        }

        let guard = self.documents.read().await;
        if guard.is_empty() {
            debug!("Knowledge store is empty, skipping search");
            return vec![];
        }

        let query_embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "Query embedding failed, returning no results");
                return vec![];
            }
        };

        let mut scored: Vec<(f32, &StoredDocument)> = guard
            .iter()
            .map(|stored| (cosine_similarity(&query_embedding, &stored.embedding), stored))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        scored
            .into_iter()
            .take(k)
            .map(|(_, stored)| stored.document.clone())
            .collect()
    }

    /// Destructively reset the store. Idempotent.
    pub async fn clear(&self) {
        let mut guard = self.documents.write().await;
        if !guard.is_empty() {
            info!(removed = guard.len(), "Knowledge store cleared");
        }
        guard.clear();
    }

    /// Number of stored chunks.
    pub async fn count(&self) -> usize {
        self.documents.read().await.len()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use async_trait::async_trait;

    /// Deterministic local embedder: character histogram folded into a
    /// small fixed dimension. Similar texts land close together.
    struct HistogramEmbedder;

    #[async_trait]
    impl Embedder for HistogramEmbedder {
        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Ok(texts
                .iter()
                .map(|text| {
                    let mut v = vec![0.0f32; 16];
                    for c in text.chars() {
                        v[(c as usize) % 16] += 1.0;
                    }
                    v
                })
                .collect())
        }
    }

    struct FailingEmbedder;

    #[async_trait]
    impl Embedder for FailingEmbedder {
        async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            Err(LlmError::EmptyResponse)
        }
    }

    fn doc(content: &str) -> Document {
        Document {
            content: content.to_string(),
            metadata: DocumentMetadata {
                source: "https://example.com".to_string(),
                title: "Example".to_string(),
                scraped_at: Utc::now(),
                chunk_index: 0,
            },
        }
    }

    fn store() -> KnowledgeStore {
        KnowledgeStore::new(Arc::new(HistogramEmbedder))
    }

    #[tokio::test]
    async fn search_on_empty_store_returns_empty() {
        let store = store();
        assert!(store.similarity_search("anything", 5).await.is_empty());
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn add_then_count_and_search() {
        let store = store();
        assert!(store.add(vec![doc("aaaa aaaa"), doc("zzzz zzzz")]).await);
        assert_eq!(store.count().await, 2);

        let results = store.similarity_search("aaa", 1).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "aaaa aaaa");
    }

    #[tokio::test]
    async fn search_caps_at_k() {
        let store = store();
        store.add(vec![doc("one"), doc("two"), doc("three")]).await;
        assert_eq!(store.similarity_search("one", 2).await.len(), 2);
        assert!(store.similarity_search("one", 0).await.is_empty());
    }

    #[tokio::test]
    async fn empty_batch_reports_failure() {
        let store = store();
        assert!(!store.add(vec![]).await);
        assert_eq!(store.count().await, 0);
    }

    #[tokio::test]
    async fn embedder_fault_degrades_to_false_and_empty() {
        let store = KnowledgeStore::new(Arc::new(FailingEmbedder));
        assert!(!store.add(vec![doc("content")]).await);
        assert_eq!(store.count().await, 0);
        assert!(store.similarity_search("anything", 5).await.is_empty());
    }

    #[tokio::test]
    async fn clear_is_idempotent() {
        let store = store();
        store.add(vec![doc("content")]).await;
        store.clear().await;
        assert_eq!(store.count().await, 0);
        store.clear().await;
        assert_eq!(store.count().await, 0);
    }

    #[test]
    fn cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]), 1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }
}
