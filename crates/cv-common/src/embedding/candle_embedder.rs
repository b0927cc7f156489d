//! Sentence embedding using Candle and a BERT-family sentence transformer.
//!
//! The default model is the multilingual paraphrase MiniLM
//! (`sentence-transformers/paraphrase-multilingual-MiniLM-L12-v2`), which
//! handles Turkish and English CV text. Sentence-transformers models use
//! attention-masked mean pooling, not CLS pooling.

use std::sync::Mutex;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config, DTYPE};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use super::{EmbeddingError, TextEmbedder};

/// Token limit applied to every input (sentence-transformers `max_seq_length`).
const MAX_SEQ_LENGTH: usize = 128;

/// Truncation length: `MAX_SEQ_LENGTH`, capped by the model's position table.
fn max_sequence_length(raw_config: &str) -> usize {
    serde_json::from_str::<serde_json::Value>(raw_config)
        .ok()
        .and_then(|config| config.get("max_position_embeddings")?.as_u64())
        .map_or(MAX_SEQ_LENGTH, |limit| MAX_SEQ_LENGTH.min(limit as usize))
}

struct Loaded {
    model: BertModel,
    tokenizer: Tokenizer,
}

/// Candle-backed sentence embedder.
///
/// Inference is serialized through a mutex, so one loaded model can be shared
/// by all comparison workers of the process.
pub struct CandleEmbedder {
    inner: Mutex<Loaded>,
    device: Device,
    model_name: String,
    dimension: usize,
}

fn load_err(context: &str, err: impl std::fmt::Display) -> EmbeddingError {
    EmbeddingError::ModelLoad(format!("{context}: {err}"))
}

fn infer_err(err: impl std::fmt::Display) -> EmbeddingError {
    EmbeddingError::Inference(err.to_string())
}

impl CandleEmbedder {
    /// Create an embedder, downloading the model on first use.
    ///
    /// Files are cached in the HuggingFace cache directory (~/.cache/huggingface).
    pub fn with_model(model_name: &str) -> Result<Self, EmbeddingError> {
        info!(model = model_name, "loading embedding model");

        let device = Device::Cpu;

        let api = Api::new().map_err(|e| load_err("failed to create HuggingFace API client", e))?;
        let repo = api.repo(Repo::new(model_name.to_string(), RepoType::Model));

        let config_path = repo
            .get("config.json")
            .map_err(|e| load_err("failed to download config.json", e))?;
        let tokenizer_path = repo
            .get("tokenizer.json")
            .map_err(|e| load_err("failed to download tokenizer.json", e))?;
        let weights_path = repo
            .get("model.safetensors")
            .map_err(|e| load_err("failed to download model.safetensors", e))?;

        debug!("model files downloaded to cache");

        let raw_config = std::fs::read_to_string(&config_path)
            .map_err(|e| load_err("failed to read config.json", e))?;
        let config: Config = serde_json::from_str(&raw_config)
            .map_err(|e| load_err("failed to parse config.json", e))?;
        let dimension = config.hidden_size;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| load_err("failed to load tokenizer", e))?;
        let max_length = max_sequence_length(&raw_config);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length,
                ..Default::default()
            }))
            .map_err(|e| load_err("failed to configure truncation", e))?;

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, &device)
                .map_err(|e| load_err("failed to load model weights", e))?
        };
        let model = BertModel::load(vb, &config).map_err(|e| load_err("failed to build BERT model", e))?;

        info!(model = model_name, dimension, max_length, "embedding model loaded");

        Ok(Self {
            inner: Mutex::new(Loaded { model, tokenizer }),
            device,
            model_name: model_name.to_string(),
            dimension,
        })
    }

    fn forward_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let loaded = self
            .inner
            .lock()
            .map_err(|_| EmbeddingError::Inference("embedding model mutex poisoned".into()))?;

        let encodings = loaded
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Inference(format!("tokenization failed: {e}")))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);

        let mut all_input_ids = Vec::with_capacity(texts.len() * max_len);
        let mut all_attention_mask = Vec::with_capacity(texts.len() * max_len);
        let mut all_token_type_ids = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let mut ids = encoding.get_ids().to_vec();
            let mut attention = encoding.get_attention_mask().to_vec();
            let mut type_ids = encoding.get_type_ids().to_vec();

            ids.resize(max_len, 0);
            attention.resize(max_len, 0);
            type_ids.resize(max_len, 0);

            all_input_ids.extend(ids);
            all_attention_mask.extend(attention);
            all_token_type_ids.extend(type_ids);
        }

        let batch_size = texts.len();
        let input_ids = Tensor::from_vec(all_input_ids, (batch_size, max_len), &self.device)
            .map_err(infer_err)?;
        let attention_mask =
            Tensor::from_vec(all_attention_mask, (batch_size, max_len), &self.device)
                .map_err(infer_err)?;
        let token_type_ids =
            Tensor::from_vec(all_token_type_ids, (batch_size, max_len), &self.device)
                .map_err(infer_err)?;

        // (batch, seq_len, hidden)
        let output = loaded
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))
            .map_err(infer_err)?;

        let pooled = Self::mean_pool(&output, &attention_mask).map_err(infer_err)?;
        let normalized = Self::l2_normalize(&pooled).map_err(infer_err)?;
        normalized.to_vec2::<f32>().map_err(infer_err)
    }

    /// Mean over real (non-padding) tokens.
    fn mean_pool(output: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
        let mask = attention_mask.to_dtype(DType::F32)?.unsqueeze(2)?;
        let summed = output.broadcast_mul(&mask)?.sum(1)?;
        let counts = mask.sum(1)?.clamp(1e-9, f64::MAX)?;
        summed.broadcast_div(&counts)
    }

    fn l2_normalize(tensor: &Tensor) -> candle_core::Result<Tensor> {
        let norm = tensor
            .sqr()?
            .sum_keepdim(1)?
            .sqrt()?
            .clamp(1e-12, f64::MAX)?;
        tensor.broadcast_div(&norm)
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

impl TextEmbedder for CandleEmbedder {
    fn name(&self) -> &'static str {
        "candle"
    }

    fn version(&self) -> &str {
        &self.model_name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.forward_batch(texts)
    }
}
