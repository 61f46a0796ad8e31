//! # Memory index
//!
//! [`MemoryIndex`] owns the [`KnowledgeBase`] and the [`VectorStore`] together so the
//! two can only grow in lockstep: fragment `i` always pairs with vector `i`, and
//! `knowledge.len() == vectors.len()` holds between any two calls.
//!
//! The index is shared between request handlers as a [`SharedIndex`]
//! (`Arc<tokio::sync::RwLock<MemoryIndex>>`). Searches take the read lock, the paired
//! append takes the write lock. Nothing awaits while a guard is held, so a request that
//! is dropped mid-flight cannot leave a half-applied append behind.
//!
//! ## Bulk build
//! [`build_index`] embeds the seed fragments in order at startup. Any embedding failure
//! there is fatal: without vectors there is nothing to search.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::embeddings::EmbeddingProvider;
use crate::error::{MemoryError, VectorStoreError};
use crate::knowledge_base::{Fragment, KnowledgeBase};
use crate::vector_store::{ScoredPosition, Vector, VectorStore};

pub type SharedIndex = Arc<RwLock<MemoryIndex>>;

/// Index-aligned fragments and vectors.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    knowledge: KnowledgeBase,
    vectors: VectorStore,
}

impl MemoryIndex {
    /// An empty index for vectors of `dimension`.
    pub fn empty(dimension: usize) -> Self {
        Self {
            knowledge: KnowledgeBase::default(),
            vectors: VectorStore::with_dimension(dimension),
        }
    }

    /// Load-time construction: embed every fragment, then pair them up.
    ///
    /// # Errors
    /// Any [`MemoryError`] from [`build_index`].
    pub async fn bootstrap(
        fragments: Vec<Fragment>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self, MemoryError> {
        let vectors = build_index(&fragments, embedder).await?;
        Ok(Self {
            knowledge: KnowledgeBase::new(fragments),
            vectors,
        })
    }

    pub fn into_shared(self) -> SharedIndex {
        Arc::new(RwLock::new(self))
    }

    /// Append one fragment and its vector at the same new position.
    ///
    /// The text goes in first. If the vector is rejected the text append is undone,
    /// so on error the index is exactly as it was.
    ///
    /// # Errors
    /// [`VectorStoreError::DimensionMismatch`] if `vector` does not fit the store.
    pub fn append(&mut self, fragment: Fragment, vector: Vector) -> Result<usize, VectorStoreError> {
        let position = self.knowledge.append(fragment);
        match self.vectors.append(vector) {
            Ok(vector_position) => {
                debug_assert_eq!(position, vector_position);
                Ok(position)
            }
            Err(err) => {
                self.knowledge.truncate(position);
                Err(err)
            }
        }
    }

    /// Top-`k` fragments for `query`, best first.
    pub fn search(
        &self,
        query: &Vector,
        k: usize,
    ) -> Result<Vec<(ScoredPosition, &Fragment)>, VectorStoreError> {
        let hits = self.vectors.search(query, k)?;
        Ok(hits
            .into_iter()
            .filter_map(|hit| self.knowledge.get(hit.position).map(|f| (hit, f)))
            .collect())
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.knowledge.len(), self.vectors.len());
        self.knowledge.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn vectors(&self) -> &VectorStore {
        &self.vectors
    }
}

/// Embed `fragments` in order and build the initial vector store.
///
/// The store's dimension is the provider's, so an empty seed still yields a usable
/// (empty) store.
///
/// # Errors
/// - [`MemoryError::Embedding`] on the first fragment that fails to embed.
/// - [`MemoryError::VectorStore`] if the provider returns a vector of the wrong width.
pub async fn build_index(
    fragments: &[Fragment],
    embedder: &dyn EmbeddingProvider,
) -> Result<VectorStore, MemoryError> {
    info!(
        fragments = fragments.len(),
        model = embedder.model_name(),
        "Building memory index"
    );

    let progress = ProgressBar::new(fragments.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} embedding {pos}/{len} {wide_bar}") {
        progress.set_style(style);
    }

    let mut vectors = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let vector = embedder.embed(fragment.as_str()).await?;
        vectors.push(vector);
        progress.inc(1);
    }
    progress.finish_and_clear();

    let store = VectorStore::build_with_dimension(vectors, embedder.dimensions())?;
    debug!(dimension = ?store.dimension(), size = store.len(), "Memory index built");
    Ok(store)
}
