//! # Generator
//!
//! The text generator is an opaque `complete(prompt) -> text` capability. The crate ships
//! one implementation, [`OpenAiGenerator`], which sends the rendered prompt as a single
//! user message to any OpenAI-compatible chat-completions endpoint.

use async_openai::{
    Client,
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
    },
};
use async_trait::async_trait;
use tracing::debug;

use crate::config::MarinConfig;
use crate::error::GenerationError;

#[async_trait]
pub trait Generator: Send + Sync {
    /// Complete `prompt`. An empty string is a valid (if unhelpful) answer.
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Chat-completions backed generator.
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u16,
    stop_words: Vec<String>,
}

impl OpenAiGenerator {
    pub fn new(config: &MarinConfig) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.api_key.clone())
            .with_api_base(config.api_base.clone());
        debug!("Client created for {}", config.api_base);

        Self {
            client: Client::with_config(openai_config),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            stop_words: config.stop_words.clone(),
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    #[allow(deprecated)]
    async fn complete(&self, prompt: &str) -> Result<String, GenerationError> {
        let message = ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
            name: None,
        });

        let mut args = CreateChatCompletionRequestArgs::default();
        args.max_tokens(self.max_tokens)
            .model(self.model.clone())
            .messages(vec![message]);
        if !self.stop_words.is_empty() {
            args.stop(self.stop_words.clone());
        }
        let request = args
            .build()
            .map_err(|e| GenerationError::InvalidRequest(e.to_string()))?;

        debug!("Sending request: {:?}", request);

        let response = self.client.chat().create(request).await?;

        let mut response_string = String::new();
        for chat_choice in response.choices {
            if let Some(text) = chat_choice.message.content {
                response_string.push_str(&text);
            }
        }
        Ok(response_string)
    }
}
