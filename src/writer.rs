//! # Memory writer
//!
//! Grows the shared memory with each finished exchange. The exchange is rendered with
//! [`format_exchange`], embedded outside any lock, and only then appended under the
//! write lock so the fragment and its vector land at the same position in one step.

use std::sync::Arc;
use tracing::info;

use crate::embeddings::EmbeddingProvider;
use crate::error::MemoryError;
use crate::index::SharedIndex;
use crate::knowledge_base::Fragment;

/// Render an exchange as the fragment that will be recalled later.
pub fn format_exchange(query: &str, answer: &str) -> Fragment {
    Fragment::new(format!("remember our chat-- User:{query}\nMarin:{answer}"))
}

/// Write side of the shared memory.
#[derive(Clone)]
pub struct MemoryWriter {
    index: SharedIndex,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl MemoryWriter {
    pub fn new(index: SharedIndex, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { index, embedder }
    }

    /// Remember one exchange.
    ///
    /// # Returns
    /// The position the new fragment was stored at.
    ///
    /// # Errors
    /// - [`MemoryError::Embedding`]: nothing was appended.
    /// - [`MemoryError::VectorStore`]: the vector did not fit; the text append was undone.
    pub async fn remember(&self, query: &str, answer: &str) -> Result<usize, MemoryError> {
        let fragment = format_exchange(query, answer);
        let vector = self.embedder.embed(fragment.as_str()).await?;

        let mut index = self.index.write().await;
        let position = index.append(fragment, vector)?;
        info!(position, size = index.len(), "recorded data");
        Ok(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::testing::{FailingEmbedder, FixedEmbedder, KeywordEmbedder};
    use crate::index::MemoryIndex;
    use crate::retriever::Retriever;

    async fn seeded(embedder: &KeywordEmbedder) -> SharedIndex {
        let fragments: Vec<Fragment> = vec!["Hello there!".into(), "I love cosplay.".into()];
        MemoryIndex::bootstrap(fragments, embedder)
            .await
            .unwrap()
            .into_shared()
    }

    #[test]
    fn test_format_exchange() {
        assert_eq!(
            format_exchange("What's your name?", "I'm Marin!").as_str(),
            "remember our chat-- User:What's your name?\nMarin:I'm Marin!"
        );
    }

    #[tokio::test]
    async fn test_remember_then_retrieve() {
        let embedder = Arc::new(KeywordEmbedder::marin());
        let index = seeded(&embedder).await;
        let writer = MemoryWriter::new(index.clone(), embedder.clone());
        let retriever = Retriever::new(index.clone(), embedder);

        let position = writer.remember("What's your name?", "I'm Marin!").await.unwrap();
        assert_eq!(position, 2);
        {
            let guard = index.read().await;
            assert_eq!(guard.knowledge().len(), 3);
            assert_eq!(guard.vectors().len(), 3);
        }

        let docs = retriever.retrieve("name", 1).await;
        assert_eq!(
            docs,
            vec!["remember our chat-- User:What's your name?\nMarin:I'm Marin!".to_string()]
        );
    }

    #[tokio::test]
    async fn test_remember_embedding_failure_appends_nothing() {
        let keyword = KeywordEmbedder::marin();
        let index = seeded(&keyword).await;
        let writer = MemoryWriter::new(index.clone(), Arc::new(FailingEmbedder { dims: 8 }));

        let err = writer.remember("hi", "hello").await.unwrap_err();
        assert!(matches!(err, MemoryError::Embedding(_)));

        let guard = index.read().await;
        assert_eq!(guard.knowledge().len(), 2);
        assert_eq!(guard.vectors().len(), 2);
    }

    #[tokio::test]
    async fn test_remember_nan_embedding_keeps_search_clean() {
        let keyword = KeywordEmbedder::marin();
        let index = seeded(&keyword).await;
        let mut values = vec![0.0; 8];
        values[0] = f32::NAN;
        let writer = MemoryWriter::new(index.clone(), Arc::new(FixedEmbedder { values }));

        let err = writer.remember("hello?", "hi").await.unwrap_err();
        assert!(matches!(err, MemoryError::Embedding(_)));
        assert_eq!(index.read().await.len(), 2);

        let retriever = Retriever::new(index, Arc::new(keyword));
        assert_eq!(retriever.retrieve("hello", 1).await, vec!["Hello there!".to_string()]);
    }

    #[tokio::test]
    async fn test_remember_dimension_mismatch_rolls_back() {
        let keyword = KeywordEmbedder::marin();
        let index = seeded(&keyword).await;
        let writer = MemoryWriter::new(index.clone(), Arc::new(KeywordEmbedder::new(&["name"])));

        let err = writer.remember("name?", "Marin").await.unwrap_err();
        assert!(matches!(err, MemoryError::VectorStore(_)));

        let guard = index.read().await;
        assert_eq!(guard.knowledge().len(), 2);
        assert_eq!(guard.vectors().len(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_remember_keeps_alignment() {
        let embedder = Arc::new(KeywordEmbedder::marin());
        let index = seeded(&embedder).await;
        let writer = MemoryWriter::new(index.clone(), embedder.clone());
        let retriever = Retriever::new(index.clone(), embedder);

        let mut handles = Vec::new();
        for i in 0..32 {
            let writer = writer.clone();
            let retriever = retriever.clone();
            let index = index.clone();
            handles.push(tokio::spawn(async move {
                writer
                    .remember(&format!("question {i} about cosplay"), "sewing games")
                    .await
                    .unwrap();
                let hits = retriever.recall("cosplay", 3).await;
                let guard = index.read().await;
                assert_eq!(guard.knowledge().len(), guard.vectors().len());
                assert!(hits.iter().all(|h| h.position < guard.len()));
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let guard = index.read().await;
        assert_eq!(guard.len(), 34);
        assert_eq!(guard.vectors().len(), 34);
    }
}
