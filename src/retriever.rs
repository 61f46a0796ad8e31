//! # Retriever
//!
//! Turns a free-text query into grounding context for the generator.
//!
//! Retrieval is advisory. If the query cannot be embedded, or the search itself
//! fails, the failure is logged and the caller gets no context instead of an error;
//! generation goes ahead without memories.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::embeddings::EmbeddingProvider;
use crate::index::SharedIndex;

pub const DEFAULT_TOP_K: usize = 3;

/// A recalled fragment with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct Recollection {
    pub position: usize,
    pub score: f32,
    pub text: String,
}

/// Read side of the shared memory.
#[derive(Clone)]
pub struct Retriever {
    index: SharedIndex,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Retriever {
    pub fn new(index: SharedIndex, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    /// Up to `top_k` fragment texts for `query`, best first.
    ///
    /// Returns an empty list on any failure.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<String> {
        self.recall(query, top_k)
            .await
            .into_iter()
            .map(|r| r.text)
            .collect()
    }

    /// Same as [`retrieve`](Self::retrieve) but keeps positions and scores.
    pub async fn recall(&self, query: &str, top_k: usize) -> Vec<Recollection> {
        // Embed before locking so slow providers never stall writers.
        let embedding = match self.embedder.embed(query).await {
            Ok(embedding) => embedding,
            Err(err) => {
                warn!("Error retrieving documents: {}", err);
                return Vec::new();
            }
        };

        let index = self.index.read().await;
        match index.search(&embedding, top_k) {
            Ok(hits) => {
                debug!(top_k, hits = hits.len(), "Retrieved memories");
                hits.into_iter()
                    .map(|(hit, fragment)| Recollection {
                        position: hit.position,
                        score: hit.score,
                        text: fragment.to_string(),
                    })
                    .collect()
            }
            Err(err) => {
                warn!("Error retrieving documents: {}", err);
                Vec::new()
            }
        }
    }
}
