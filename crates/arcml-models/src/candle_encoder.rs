//! Candle-backed sentence encoder (mean pooling + L2 normalization)

use crate::encoder::{l2_normalize, TextEncoder};
use crate::loader::{
    encode_batch, fetch_model_files, load_bert_backbone, load_tokenizer, load_var_builder,
    mean_pool_embeddings, parse_json_config, select_device, ModelResultExt, MAX_SEQUENCE_TOKENS,
};
use arcml_core::{Error, Result};
use async_trait::async_trait;
use candle_core::Device;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

struct Inner {
    tokenizer: Tokenizer,
    model: BertModel,
    device: Device,
}

impl Inner {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let batch = encode_batch(&self.tokenizer, texts, &self.device)?;
        let hidden: Vec<Vec<Vec<f32>>> = self
            .model
            .forward(
                &batch.input_ids,
                &batch.token_type_ids,
                Some(&batch.attention_mask),
            )
            .and_then(|t| t.to_vec3())
            .inference_context("Model forward pass failed")?;

        Ok(hidden
            .iter()
            .zip(&batch.mask_rows)
            .map(|(tokens, mask)| {
                let mut pooled = mean_pool_embeddings(tokens, mask);
                l2_normalize(&mut pooled);
                pooled
            })
            .collect())
    }
}

/// Sentence-transformer encoder loaded from a Hugging Face repository
#[derive(Clone)]
pub struct CandleSentenceEncoder {
    name: String,
    inner: Arc<Inner>,
}

impl CandleSentenceEncoder {
    /// Download (or reuse) `repo` under `cache_dir` and build the encoder
    pub fn load(repo: &str, cache_dir: &Path, use_accelerator: bool) -> Result<Self> {
        let model_dir = fetch_model_files(repo, cache_dir)?;
        Self::from_dir(repo, &model_dir, use_accelerator)
    }

    /// Build the encoder from an already-downloaded model directory
    pub fn from_dir(name: &str, model_dir: &Path, use_accelerator: bool) -> Result<Self> {
        let config: BertConfig = parse_json_config(&model_dir.join("config.json"))?;
        let max_length = config
            .max_position_embeddings
            .min(MAX_SEQUENCE_TOKENS);

        let tokenizer = load_tokenizer(model_dir, max_length)?;
        let device = select_device(use_accelerator)?;
        let vb = load_var_builder(model_dir, &device)?;
        let model = load_bert_backbone(&vb, &config)?;

        tracing::info!(
            "Loaded sentence encoder '{}' (hidden_size={}, max_length={})",
            name,
            config.hidden_size,
            max_length
        );

        Ok(Self {
            name: name.to_string(),
            inner: Arc::new(Inner {
                tokenizer,
                model,
                device,
            }),
        })
    }
}

#[async_trait]
impl TextEncoder for CandleSentenceEncoder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || inner.embed(&texts))
            .await
            .map_err(|e| Error::inference(format!("Embedding task failed: {e}")))?
    }

    fn name(&self) -> &str {
        &self.name
    }
}
