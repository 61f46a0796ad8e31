//! # Knowledge base
//!
//! The ordered list of text fragments Marin can recall. Fragment `i` corresponds to
//! vector `i` in the [`VectorStore`](crate::vector_store::VectorStore); keeping that
//! alignment is the job of [`MemoryIndex`](crate::index::MemoryIndex), since the
//! knowledge base alone cannot know about the vectors.
//!
//! ## Seed file
//! The knowledge base is seeded from a JSON document holding the fragments under
//! `dialogues`:
//!
//! ```json
//! { "dialogues": ["Hello there!", "I love cosplay."] }
//! ```

use serde::{Deserialize, Serialize};
use std::{fmt, fs, path::Path};
use tracing::info;

use crate::error::LoadError;

/// One stored unit of retrievable text. Identified only by its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fragment(String);

impl Fragment {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// On-disk shape of the seed knowledge base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedFile {
    pub dialogues: Vec<Fragment>,
}

/// Append-only, ordered fragment list.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    fragments: Vec<Fragment>,
}

impl KnowledgeBase {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }

    /// Parse the seed file at `path`.
    ///
    /// # Errors
    /// - [`LoadError::Io`] if the file cannot be read.
    /// - [`LoadError::Malformed`] if it is not a JSON object with a `dialogues` list of strings.
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<Fragment>, LoadError> {
        let path = path.as_ref();
        info!("Loading knowledge base: {}", path.display());

        let content = fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let seed: SeedFile =
            serde_json::from_str(&content).map_err(|source| LoadError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        info!(fragments = seed.dialogues.len(), "Knowledge base loaded");
        Ok(seed.dialogues)
    }

    /// Add a fragment at the end and return its position.
    pub fn append(&mut self, fragment: Fragment) -> usize {
        let position = self.fragments.len();
        self.fragments.push(fragment);
        position
    }

    /// Drop everything from `len` on. Only used to undo an append that could not be paired.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.fragments.truncate(len);
    }

    pub fn get(&self, position: usize) -> Option<&Fragment> {
        self.fragments.get(position)
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }
}
