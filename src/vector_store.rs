//! # VectorStore
//!
//! In-memory embedding store for Marin's memory.
//!
//! The store is a flat, append-only list of L2-normalized vectors. Queries are
//! answered by an exhaustive inner-product scan, which for normalized vectors is
//! cosine similarity. There is no approximate index: every stored vector is
//! scored on every search, so results are exact and deterministic.
//!
//! ## Responsibilities
//! - **Normalization**: [`Vector::new`] normalizes on creation, whatever the provider returned.
//! - **Dimension guard**: the first vector fixes the dimension, mismatches are rejected.
//! - **Search**: top-k by descending score, ties broken by ascending position.
//!
//! Positions are ordinals (`0..len`). They line up with the fragment positions of the
//! [`KnowledgeBase`](crate::knowledge_base::KnowledgeBase) held next to the store in a
//! [`MemoryIndex`](crate::index::MemoryIndex).
//!
//! ## Quick Example
//! ```rust
//! use marin_memory::vector_store::{Vector, VectorStore};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut store = VectorStore::build(vec![
//!     Vector::new(vec![1.0, 0.0]),
//!     Vector::new(vec![0.0, 1.0]),
//! ])?;
//! let pos = store.append(Vector::new(vec![1.0, 1.0]))?;
//! assert_eq!(pos, 2);
//!
//! let hits = store.search(&Vector::new(vec![1.0, 0.1]), 1)?;
//! assert_eq!(hits[0].position, 0);
//! # Ok(()) }
//! ```

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::VectorStoreError;

/// A dense, L2-normalized embedding.
///
/// Immutable once created. A zero vector is kept as-is since it has no direction;
/// it scores `0.0` against everything. Deserializing goes through [`Vector::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<f32>", into = "Vec<f32>")]
pub struct Vector(Vec<f32>);

impl Vector {
    /// Normalize `values` to unit length and wrap them.
    pub fn new(mut values: Vec<f32>) -> Self {
        let norm = values.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 && norm.is_finite() {
            values.iter_mut().for_each(|v| *v /= norm);
        }
        Self(values)
    }

    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Inner product. Callers guarantee equal length.
    pub fn dot(&self, other: &Vector) -> f32 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    /// True when every component is a finite number.
    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

impl From<Vec<f32>> for Vector {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl From<Vector> for Vec<f32> {
    fn from(vector: Vector) -> Self {
        vector.0
    }
}

/// One search hit: a store position and its similarity to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredPosition {
    pub position: usize,
    pub score: f32,
}

/// Search output, best first, at most `k` long.
pub type QueryResult = Vec<ScoredPosition>;

/// Append-only flat vector index.
#[derive(Debug, Clone, Default)]
pub struct VectorStore {
    vectors: Vec<Vector>,
    /// `None` until fixed, either by the first vector or by [`VectorStore::with_dimension`].
    dimension: Option<usize>,
}

impl VectorStore {
    /// An empty store whose dimension will be fixed by the first append.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store with a dimension known up front (e.g. the embedding model's output size).
    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            vectors: Vec::new(),
            dimension: Some(dimension),
        }
    }

    /// Construct a store from an initial batch, preserving order.
    ///
    /// # Errors
    /// [`VectorStoreError::DimensionMismatch`] if any vector differs in length from the first.
    pub fn build(vectors: Vec<Vector>) -> Result<Self, VectorStoreError> {
        let mut store = Self::new();
        store.extend(vectors)?;
        Ok(store)
    }

    /// Like [`VectorStore::build`], but every vector must match `dimension`.
    pub fn build_with_dimension(
        vectors: Vec<Vector>,
        dimension: usize,
    ) -> Result<Self, VectorStoreError> {
        let mut store = Self::with_dimension(dimension);
        store.extend(vectors)?;
        Ok(store)
    }

    fn extend(&mut self, vectors: Vec<Vector>) -> Result<(), VectorStoreError> {
        if let Some(first) = vectors.first() {
            let expected = self.dimension.unwrap_or(first.dimension());
            if let Some(bad) = vectors.iter().find(|v| v.dimension() != expected) {
                return Err(VectorStoreError::DimensionMismatch {
                    expected,
                    actual: bad.dimension(),
                });
            }
            self.dimension = Some(expected);
        }
        self.vectors.extend(vectors);
        Ok(())
    }

    /// Add one vector at the end.
    ///
    /// # Returns
    /// The new vector's position, which is the store size before the call.
    ///
    /// # Errors
    /// [`VectorStoreError::DimensionMismatch`] if `vector` does not match the fixed dimension.
    /// The store is unchanged in that case.
    pub fn append(&mut self, vector: Vector) -> Result<usize, VectorStoreError> {
        let actual = vector.dimension();
        match self.dimension {
            Some(expected) if expected != actual => {
                return Err(VectorStoreError::DimensionMismatch { expected, actual });
            }
            Some(_) => {}
            None => self.dimension = Some(actual),
        }
        let position = self.vectors.len();
        self.vectors.push(vector);
        Ok(position)
    }

    /// Exhaustive top-`k` search by inner product.
    ///
    /// Results are sorted by descending score. Equal scores come back in ascending
    /// position order, so the earliest-inserted vector wins a tie. An empty store (or
    /// `k == 0`) yields an empty result; `k` larger than the store yields every entry.
    ///
    /// # Errors
    /// [`VectorStoreError::DimensionMismatch`] if the store holds vectors and `query`
    /// has a different length.
    pub fn search(&self, query: &Vector, k: usize) -> Result<QueryResult, VectorStoreError> {
        if self.vectors.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if let Some(expected) = self.dimension {
            if query.dimension() != expected {
                return Err(VectorStoreError::DimensionMismatch {
                    expected,
                    actual: query.dimension(),
                });
            }
        }

        let mut scored: Vec<ScoredPosition> = self
            .vectors
            .par_iter()
            .enumerate()
            .map(|(position, v)| ScoredPosition {
                position,
                score: query.dot(v),
            })
            .collect();

        scored.sort_by(rank);
        scored.truncate(k);
        Ok(scored)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn get(&self, position: usize) -> Option<&Vector> {
        self.vectors.get(position)
    }
}

// Descending score, then ascending position.
fn rank(a: &ScoredPosition, b: &ScoredPosition) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.position.cmp(&b.position))
}
