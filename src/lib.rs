//! # Marin Memory (library root)
//!
//! Retrieval-augmented memory for the Marin companion chatbot:
//! - Dense embeddings of short dialogue fragments (`embeddings`).
//! - An append-only flat vector store with exact inner-product search (`vector_store`).
//! - The seed knowledge base, index-aligned with the store (`knowledge_base`, `index`).
//! - Retrieval of grounding context and growth of memory after each exchange
//!   (`retriever`, `writer`).
//! - Prompt rendering and the generation round trip (`template`, `generator`, `pipeline`).
//! - Configuration and CLI parsing (`config`, `commands`).
//!
//! ## Lifecycle
//! The knowledge base is loaded and embedded once at startup into a
//! [`MemoryIndex`](index::MemoryIndex). Each request then retrieves from it and, once
//! answered, appends its own exchange. Nothing is written to disk; memories live as long
//! as the process.
//!
//! ```no_run
//! use std::sync::Arc;
//! use marin_memory::{
//!     config::MarinConfig, index::MemoryIndex, knowledge_base::KnowledgeBase,
//!     retriever::Retriever, writer::MemoryWriter,
//! };
//!
//! # #[tokio::main] async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MarinConfig::default();
//! let embedder = config.embedding_provider()?;
//! let fragments = KnowledgeBase::load("MARIN_knowledge_base.json")?;
//! let index = MemoryIndex::bootstrap(fragments, embedder.as_ref()).await?.into_shared();
//!
//! let retriever = Retriever::new(index.clone(), Arc::clone(&embedder));
//! let writer = MemoryWriter::new(index, embedder);
//! let context = retriever.retrieve("Tell me about cosplay", 3).await;
//! writer.remember("Tell me about cosplay", "Yatta!").await?;
//! # let _ = context; Ok(()) }
//! ```

use directories::ProjectDirs;
use std::error::Error;

pub mod commands;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod generator;
pub mod index;
pub mod knowledge_base;
pub mod pipeline;
pub mod retriever;
pub mod template;
pub mod vector_store;
pub mod writer;

/// Return the per-platform configuration directory used by Marin.
///
/// This uses [`directories::ProjectDirs`] with the application triple
/// `("com", "marin", "marin")`. The directory is **not** created here.
///
/// # Errors
/// Returns an error if the platform configuration directory cannot be determined.
pub fn config_dir() -> Result<std::path::PathBuf, Box<dyn Error>> {
    let proj_dirs =
        ProjectDirs::from("com", "marin", "marin").ok_or("Unable to determine config directory")?;
    Ok(proj_dirs.config_dir().to_path_buf())
}

/// Fragments written by `marin init` as the starting knowledge base.
pub fn default_seed() -> Vec<knowledge_base::Fragment> {
    [
        "Hello there! I'm Marin Kitagawa, nice to meet you!",
        "I love cosplay. Dressing up as my favorite characters makes me so happy!",
        "My favorite series is Slippery Girls Fleeting Lilies, it's so kawaii!",
        "Gojo-kun makes the most beautiful costumes, he's super talented with sewing.",
        "I'm not great at sewing myself, but I always give it my all!",
    ]
    .into_iter()
    .map(Into::into)
    .collect()
}
