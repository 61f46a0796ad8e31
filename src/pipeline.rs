//! # Generation pipeline
//!
//! One request, end to end:
//!
//! ```text
//! query ─► retrieve(top_k) ─► join("\n") or "No relevant data found."
//!       ─► template.render ─► generator.complete ─► remember(query, answer) ─► response
//! ```
//!
//! Only an empty query is refused. Everything downstream degrades instead: retrieval
//! failures give an empty context, generator failures give an apology line (and nothing
//! is remembered), and a failed `remember` is logged while the answer still goes out.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::error::PipelineError;
use crate::generator::Generator;
use crate::retriever::Retriever;
use crate::template::{NO_CONTEXT, PersonaTemplate};
use crate::writer::MemoryWriter;

pub const EMPTY_COMPLETION_REPLY: &str = "Oops! I couldn't generate a response. Try again!";
pub const GENERATION_FAILED_REPLY: &str = "Oops! Sorry I forgot what you asked. Can you repeat?";

/// Body of a generation request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateRequest {
    pub query: String,
}

/// Body of a generation response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateResponse {
    pub response: String,
}

pub struct Pipeline {
    retriever: Retriever,
    writer: MemoryWriter,
    generator: Arc<dyn Generator>,
    template: PersonaTemplate,
    top_k: usize,
}

impl Pipeline {
    pub fn new(
        retriever: Retriever,
        writer: MemoryWriter,
        generator: Arc<dyn Generator>,
        template: PersonaTemplate,
        top_k: usize,
    ) -> Self {
        Self {
            retriever,
            writer,
            generator,
            template,
            top_k,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer one request and remember the exchange.
    ///
    /// # Errors
    /// [`PipelineError::EmptyQuery`] if the query is the empty string. Whitespace-only
    /// queries are answered like any other.
    pub async fn generate(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, PipelineError> {
        let query = request.query;
        if query.is_empty() {
            return Err(PipelineError::EmptyQuery);
        }

        let docs = self.retriever.retrieve(&query, self.top_k).await;
        let context = if docs.is_empty() {
            NO_CONTEXT.to_string()
        } else {
            docs.join("\n")
        };
        debug!("Context for AI: {}", context);

        let prompt = self.template.render(&context, &query);
        let answer = match self.generator.complete(&prompt).await {
            Ok(answer) if answer.is_empty() => EMPTY_COMPLETION_REPLY.to_string(),
            Ok(answer) => answer,
            Err(err) => {
                error!("Error in AI response generation: {}", err);
                return Ok(GenerateResponse {
                    response: GENERATION_FAILED_REPLY.to_string(),
                });
            }
        };
        info!("AI Response: {}", answer);

        if let Err(err) = self.writer.remember(&query, &answer).await {
            error!("Failed to remember exchange: {}", err);
        }

        Ok(GenerateResponse { response: answer })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::EmbeddingProvider;
    use crate::embeddings::testing::{FailingEmbedder, KeywordEmbedder};
    use crate::generator::testing::RecordingGenerator;
    use crate::index::{MemoryIndex, SharedIndex};
    use crate::knowledge_base::Fragment;

    async fn seeded(embedder: &KeywordEmbedder) -> SharedIndex {
        let fragments: Vec<Fragment> = vec!["Hello there!".into(), "I love cosplay.".into()];
        MemoryIndex::bootstrap(fragments, embedder)
            .await
            .unwrap()
            .into_shared()
    }

    fn pipeline(
        index: SharedIndex,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<RecordingGenerator>,
    ) -> Pipeline {
        Pipeline::new(
            Retriever::new(index.clone(), embedder.clone()),
            MemoryWriter::new(index, embedder),
            generator,
            PersonaTemplate::marin(),
            1,
        )
    }

    fn request(query: &str) -> GenerateRequest {
        GenerateRequest {
            query: query.to_string(),
        }
    }

    #[tokio::test]
    async fn test_generate_grounds_and_remembers() {
        let embedder = Arc::new(KeywordEmbedder::marin());
        let index = seeded(&embedder).await;
        let generator = Arc::new(RecordingGenerator::answering("Yatta! Let's sew costumes!"));
        let pipeline = pipeline(index.clone(), embedder, generator.clone());

        let response = pipeline.generate(request("Tell me about cosplay")).await.unwrap();

        assert_eq!(response.response, "Yatta! Let's sew costumes!");
        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("### Context:\nI love cosplay.\n"));
        assert!(prompts[0].contains("### Question:\nTell me about cosplay\n"));

        let guard = index.read().await;
        assert_eq!(guard.len(), 3);
        assert_eq!(
            guard.knowledge().get(2).map(Fragment::as_str),
            Some("remember our chat-- User:Tell me about cosplay\nMarin:Yatta! Let's sew costumes!")
        );
    }

    #[tokio::test]
    async fn test_generate_without_context_uses_fallback() {
        let embedder = Arc::new(KeywordEmbedder::marin());
        let index = MemoryIndex::empty(embedder.dimensions()).into_shared();
        let generator = Arc::new(RecordingGenerator::answering("Hi!"));
        let pipeline = pipeline(index, embedder, generator.clone());

        pipeline.generate(request("hello")).await.unwrap();
        assert!(generator.prompts()[0].contains("### Context:\nNo relevant data found.\n"));
    }

    #[tokio::test]
    async fn test_generate_answers_when_memory_is_down() {
        let keyword = KeywordEmbedder::marin();
        let index = seeded(&keyword).await;
        let generator = Arc::new(RecordingGenerator::answering("Still here!"));
        let pipeline = pipeline(index.clone(), Arc::new(FailingEmbedder { dims: 8 }), generator.clone());

        let response = pipeline.generate(request("cosplay?")).await.unwrap();

        assert_eq!(response.response, "Still here!");
        assert!(generator.prompts()[0].contains(NO_CONTEXT));
        assert_eq!(index.read().await.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_failure_returns_apology_and_forgets() {
        let embedder = Arc::new(KeywordEmbedder::marin());
        let index = seeded(&embedder).await;
        let pipeline = pipeline(index.clone(), embedder, Arc::new(RecordingGenerator::failing()));

        let response = pipeline.generate(request("cosplay?")).await.unwrap();

        assert_eq!(response.response, GENERATION_FAILED_REPLY);
        assert_eq!(index.read().await.len(), 2);
    }

    #[tokio::test]
    async fn test_generate_empty_completion() {
        let embedder = Arc::new(KeywordEmbedder::marin());
        let index = seeded(&embedder).await;
        let pipeline = pipeline(index.clone(), embedder, Arc::new(RecordingGenerator::answering("")));

        let response = pipeline.generate(request("cosplay?")).await.unwrap();
        assert_eq!(response.response, EMPTY_COMPLETION_REPLY);
        assert_eq!(index.read().await.len(), 3);
    }

    #[tokio::test]
    async fn test_generate_rejects_empty_query() {
        let embedder = Arc::new(KeywordEmbedder::marin());
        let index = seeded(&embedder).await;
        let generator = Arc::new(RecordingGenerator::answering("unused"));
        let pipeline = pipeline(index, embedder, generator.clone());

        assert_eq!(
            pipeline.generate(request("")).await,
            Err(PipelineError::EmptyQuery)
        );
        assert!(generator.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_generate_accepts_whitespace_query() {
        let embedder = Arc::new(KeywordEmbedder::marin());
        let index = seeded(&embedder).await;
        let generator = Arc::new(RecordingGenerator::answering("Nani?"));
        let pipeline = pipeline(index, embedder, generator.clone());

        let response = pipeline.generate(request("   ")).await.unwrap();
        assert_eq!(response.response, "Nani?");
        assert_eq!(generator.prompts().len(), 1);
    }

    #[test]
    fn test_request_response_json_shape() {
        let req: GenerateRequest = serde_json::from_str(r#"{"query": "hi"}"#).unwrap();
        assert_eq!(req.query, "hi");
        let body = serde_json::to_value(GenerateResponse {
            response: "yo".into(),
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"response": "yo"}));
    }
}
