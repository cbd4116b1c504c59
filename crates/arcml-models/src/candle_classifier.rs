//! Candle-backed sentiment classifier
//!
//! Tokenizer and classification model are fused into one batched callable.
//! Forward passes run on the blocking pool.

use crate::classifier::SequenceClassifier;
use crate::loader::{
    encode_batch, fetch_model_files, load_bert_backbone, load_tokenizer, load_var_builder,
    parse_json_config, read_id2label, read_num_labels, select_device, ModelResultExt,
    MAX_SEQUENCE_TOKENS,
};
use arcml_core::{Error, LabelScore, Result};
use async_trait::async_trait;
use candle_core::{Device, IndexOp, Tensor, D};
use candle_nn::{Linear, Module};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{
    Config as XlmRobertaConfig, XLMRobertaForSequenceClassification,
};
use std::path::Path;
use std::sync::Arc;
use tokenizers::Tokenizer;

enum ClassificationModel {
    /// RoBERTa / XLM-RoBERTa checkpoints with their own classification head
    XlmRoberta(XLMRobertaForSequenceClassification),

    /// BERT checkpoints: backbone, optional pooler, linear head
    Bert {
        backbone: BertModel,
        pooler: Option<Linear>,
        head: Linear,
    },
}

/// Texts per forward pass; each pass pads to its own longest text
pub const CLASSIFIER_MICRO_BATCH: usize = 32;

/// Run `forward` over length-sorted slices of at most `size` texts
///
/// Similar lengths share a pass so one long text only pads its own slice.
/// Rows come back in input order.
fn in_micro_batches<F>(texts: &[String], size: usize, mut forward: F) -> Result<Vec<Vec<f32>>>
where
    F: FnMut(&[String]) -> Result<Vec<Vec<f32>>>,
{
    let mut order: Vec<usize> = (0..texts.len()).collect();
    order.sort_by_key(|&i| texts[i].len());

    let mut rows: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
    for slice in order.chunks(size.max(1)) {
        let batch: Vec<String> = slice.iter().map(|&i| texts[i].clone()).collect();
        let output = forward(&batch)?;
        if output.len() != batch.len() {
            return Err(Error::inference(format!(
                "Model returned {} rows for {} texts",
                output.len(),
                batch.len()
            )));
        }
        for (&i, row) in slice.iter().zip(output) {
            rows[i] = Some(row);
        }
    }

    rows.into_iter()
        .map(|row| row.ok_or_else(|| Error::internal("Missing classifier row")))
        .collect()
}

struct Inner {
    tokenizer: Tokenizer,
    model: ClassificationModel,
    device: Device,
    labels: Vec<String>,
}

impl Inner {
    fn logits(&self, texts: &[String]) -> Result<Tensor> {
        let batch = encode_batch(&self.tokenizer, texts, &self.device)?;

        match &self.model {
            ClassificationModel::XlmRoberta(model) => model
                .forward(&batch.input_ids, &batch.attention_mask, &batch.token_type_ids)
                .inference_context("Model forward pass failed"),
            ClassificationModel::Bert {
                backbone,
                pooler,
                head,
            } => {
                let hidden = backbone
                    .forward(
                        &batch.input_ids,
                        &batch.token_type_ids,
                        Some(&batch.attention_mask),
                    )
                    .inference_context("Model forward pass failed")?;
                let mut cls = hidden
                    .i((.., 0))
                    .inference_context("Failed to extract CLS token")?;
                if let Some(pooler) = pooler {
                    cls = pooler
                        .forward(&cls)
                        .and_then(|t| t.tanh())
                        .inference_context("Pooler failed")?;
                }
                head.forward(&cls)
                    .inference_context("Classification head failed")
            }
        }
    }

    fn classify(&self, texts: &[String]) -> Result<Vec<Vec<LabelScore>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let probabilities = in_micro_batches(texts, CLASSIFIER_MICRO_BATCH, |batch| {
            candle_nn::ops::softmax(&self.logits(batch)?, D::Minus1)
                .and_then(|p| p.to_vec2())
                .inference_context("Softmax failed")
        })?;

        Ok(probabilities
            .into_iter()
            .map(|row| {
                self.labels
                    .iter()
                    .zip(row)
                    .map(|(label, score)| LabelScore::new(label.clone(), score))
                    .collect()
            })
            .collect())
    }
}

/// Transformer sentiment classifier loaded from a Hugging Face repository
#[derive(Clone)]
pub struct CandleSentimentClassifier {
    name: String,
    inner: Arc<Inner>,
}

impl CandleSentimentClassifier {
    /// Download (or reuse) `repo` under `cache_dir` and build the classifier
    pub fn load(repo: &str, cache_dir: &Path, use_accelerator: bool) -> Result<Self> {
        let model_dir = fetch_model_files(repo, cache_dir)?;
        Self::from_dir(repo, &model_dir, use_accelerator)
    }

    /// Build the classifier from an already-downloaded model directory
    pub fn from_dir(name: &str, model_dir: &Path, use_accelerator: bool) -> Result<Self> {
        let config_path = model_dir.join("config.json");
        let raw_config: serde_json::Value = parse_json_config(&config_path)?;

        let num_labels = read_num_labels(&raw_config);
        let labels = read_id2label(&raw_config, num_labels);
        let max_positions = raw_config
            .get("max_position_embeddings")
            .and_then(|v| v.as_u64())
            .map(|n| n as usize)
            .unwrap_or(MAX_SEQUENCE_TOKENS + 2);
        let max_length = max_positions.saturating_sub(2).min(MAX_SEQUENCE_TOKENS);

        let tokenizer = load_tokenizer(model_dir, max_length)?;
        let device = select_device(use_accelerator)?;
        let vb = load_var_builder(model_dir, &device)?;

        let model_type = raw_config
            .get("model_type")
            .and_then(|v| v.as_str())
            .unwrap_or("bert");

        let model = match model_type {
            "roberta" | "xlm-roberta" => {
                let config: XlmRobertaConfig = parse_json_config(&config_path)?;
                let model = XLMRobertaForSequenceClassification::new(num_labels, &config, vb)
                    .model_context("Failed to load RoBERTa sequence classifier")?;
                ClassificationModel::XlmRoberta(model)
            }
            "bert" => {
                let config: BertConfig = parse_json_config(&config_path)?;
                let hidden_size = config.hidden_size;
                let backbone = load_bert_backbone(&vb, &config)?;
                let pooler =
                    candle_nn::linear(hidden_size, hidden_size, vb.pp("bert.pooler.dense")).ok();
                let head = candle_nn::linear(hidden_size, num_labels, vb.pp("classifier"))
                    .model_context("Failed to load classification head")?;
                ClassificationModel::Bert {
                    backbone,
                    pooler,
                    head,
                }
            }
            other => {
                return Err(Error::model(format!(
                    "Unsupported sentiment architecture '{other}'"
                )))
            }
        };

        tracing::info!(
            "Loaded {} sentiment classifier '{}' with labels {:?} (max_length={})",
            model_type,
            name,
            labels,
            max_length
        );

        Ok(Self {
            name: name.to_string(),
            inner: Arc::new(Inner {
                tokenizer,
                model,
                device,
                labels,
            }),
        })
    }
}

#[async_trait]
impl SequenceClassifier for CandleSentimentClassifier {
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Vec<LabelScore>>> {
        let inner = Arc::clone(&self.inner);
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || inner.classify(&texts))
            .await
            .map_err(|e| Error::inference(format!("Inference task failed: {e}")))?
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &[String] {
        &self.inner.labels
    }
}
