//! # Embedding providers
//!
//! Everything that turns text into a [`Vector`]. The memory core only sees the
//! [`EmbeddingProvider`] trait; two implementations ship with the crate:
//!
//! - [`LocalEmbeddingProvider`]: `sentence-transformers/all-MiniLM-L6-v2` run in-process
//!   with Candle (pure Rust, 384 dimensions). Weights come from the Hugging Face hub cache.
//! - [`OpenAiEmbeddingProvider`]: any OpenAI-compatible `/v1/embeddings` endpoint.
//!
//! Both hand back vectors through [`Vector::new`], so they are L2-normalized no matter
//! what the backend returned.

use async_trait::async_trait;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{Repo, RepoType, api::sync::Api};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::error::EmbeddingError;
use crate::vector_store::Vector;

/// Default local model and its output width.
pub const DEFAULT_LOCAL_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const MINILM_DIMENSIONS: usize = 384;

/// Maps text to a fixed-length normalized vector.
///
/// Implementations must be deterministic for a given model and always return
/// [`dimensions`](Self::dimensions)-long vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vector, EmbeddingError>;

    /// Output width of [`embed`](Self::embed).
    fn dimensions(&self) -> usize;

    fn model_name(&self) -> &str;
}

/// Sentence embeddings model using Candle (pure Rust)
pub struct SentenceEmbeddingsModel {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
}

impl SentenceEmbeddingsModel {
    /// Load `model_id` from the Hugging Face Hub (or its local cache).
    pub fn load(model_id: &str) -> Result<Self, EmbeddingError> {
        let device = Device::Cpu;
        let hub = |e: hf_hub::api::sync::ApiError| EmbeddingError::Model(e.to_string());

        let repo = Repo::with_revision(model_id.to_string(), RepoType::Model, "main".to_string());
        let api = Api::new().map_err(hub)?;
        let api_repo = api.repo(repo);

        let config_filename = api_repo.get("config.json").map_err(hub)?;
        let tokenizer_filename = api_repo.get("tokenizer.json").map_err(hub)?;
        let weights_filename = api_repo.get("model.safetensors").map_err(hub)?;

        let config = std::fs::read_to_string(config_filename)
            .map_err(|e| EmbeddingError::Model(format!("Failed to read model config: {e}")))?;
        let config: Config = serde_json::from_str(&config)
            .map_err(|e| EmbeddingError::Model(format!("Invalid model config: {e}")))?;

        let tokenizer = Tokenizer::from_file(tokenizer_filename)
            .map_err(|e| EmbeddingError::Model(format!("Failed to load tokenizer: {e}")))?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights_filename], DTYPE, &device)? };
        let model = BertModel::load(vb, &config)?;

        info!("Loaded embedding model {}", model_id);

        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Encode text into a normalized embedding.
    pub fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        // Truncation at 512 tokens happens in the tokenizer
        let tokens = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::Model(format!("Tokenization error: {e}")))?;

        let token_ids = Tensor::new(tokens.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(tokens.get_type_ids(), &self.device)?.unsqueeze(0)?;

        let output = self.model.forward(&token_ids, &token_type_ids, None)?;
        let embedding = self.mean_pooling(&output, tokens.get_attention_mask())?;
        let embedding = self.normalize(&embedding)?;

        Ok(embedding.to_vec1::<f32>()?)
    }

    /// Mean pooling over token embeddings, considering attention mask
    fn mean_pooling(
        &self,
        embeddings: &Tensor,
        attention_mask: &[u32],
    ) -> Result<Tensor, EmbeddingError> {
        // embeddings: [1, seq_len, hidden], mask broadcast as [1, seq_len, 1]
        let mask = Tensor::new(attention_mask, &self.device)?
            .to_dtype(DType::F32)?
            .unsqueeze(0)?
            .unsqueeze(2)?;

        let sum = embeddings.broadcast_mul(&mask)?.sum(1)?;
        let count = mask.sum(1)?.clamp(1f32, f32::INFINITY)?;

        Ok(sum.broadcast_div(&count)?.squeeze(0)?)
    }

    fn normalize(&self, tensor: &Tensor) -> Result<Tensor, EmbeddingError> {
        let norm = tensor.sqr()?.sum_all()?.sqrt()?;
        Ok(tensor.broadcast_div(&norm)?)
    }
}

/// Wrap backend output, rejecting the wrong width and any NaN or infinite component.
fn checked_vector(values: Vec<f32>, dims: usize) -> Result<Vector, EmbeddingError> {
    if values.len() != dims {
        return Err(EmbeddingError::Response(format!(
            "expected {} dimensions, got {}",
            dims,
            values.len()
        )));
    }
    let vector = Vector::new(values);
    if !vector.is_finite() {
        return Err(EmbeddingError::Response(
            "embedding contains non-finite values".to_string(),
        ));
    }
    Ok(vector)
}

/// [`EmbeddingProvider`] over an in-process [`SentenceEmbeddingsModel`].
///
/// Inference is CPU-bound, so each call runs on tokio's blocking pool.
pub struct LocalEmbeddingProvider {
    model: Arc<SentenceEmbeddingsModel>,
    model_name: String,
    dims: usize,
}

impl LocalEmbeddingProvider {
    pub fn load(model_id: &str, dims: usize) -> Result<Self, EmbeddingError> {
        Ok(Self {
            model: Arc::new(SentenceEmbeddingsModel::load(model_id)?),
            model_name: model_id.to_string(),
            dims,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for LocalEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vector, EmbeddingError> {
        let model = Arc::clone(&self.model);
        let text = text.to_string();
        let values = tokio::task::spawn_blocking(move || model.encode(&text))
            .await
            .map_err(|e| EmbeddingError::Model(format!("Embedding task failed: {e}")))??;

        checked_vector(values, self.dims)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// OpenAI-compatible embeddings over HTTP.
pub struct OpenAiEmbeddingProvider {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    dims: usize,
}

fn normalize_base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn has_version_suffix(base_url: &str) -> bool {
    let Some(last_segment) = base_url.rsplit('/').next() else {
        return false;
    };
    let Some(rest) = last_segment.strip_prefix('v') else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit())
}

fn embeddings_endpoint(base_url: &str) -> String {
    let normalized = normalize_base_url(base_url);
    if normalized.ends_with("/embeddings") {
        return normalized;
    }
    if has_version_suffix(&normalized) {
        return format!("{normalized}/embeddings");
    }
    format!("{normalized}/v1/embeddings")
}

impl OpenAiEmbeddingProvider {
    pub fn new(base_url: &str, model: String, dims: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: None,
            base_url: normalize_base_url(base_url),
            model,
            dims,
        }
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = Some(api_key);
        self
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: Vec<&'a str>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vector, EmbeddingError> {
        let req = EmbeddingRequest {
            model: &self.model,
            input: vec![text],
        };

        let mut builder = self.client.post(embeddings_endpoint(&self.base_url)).json(&req);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder
            .send()
            .await?
            .error_for_status()?
            .json::<EmbeddingResponse>()
            .await?;

        let embedding = resp
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::Response("empty embedding response".to_string()))?;

        debug!(dimensions = embedding.len(), "Embedding generated");
        checked_vector(embedding, self.dims)
    }

    fn dimensions(&self) -> usize {
        self.dims
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
