//! Hugging Face download and Candle construction helpers shared by the
//! classifier and the encoder

use arcml_core::{Error, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

/// Upper bound on tokens per sequence regardless of model config
pub const MAX_SEQUENCE_TOKENS: usize = 512;

/// Attach context to errors from Candle, tokenizers and hf-hub
pub(crate) trait ModelResultExt<T> {
    /// Map to [`Error::Model`] (load time)
    fn model_context(self, what: &str) -> Result<T>;

    /// Map to [`Error::Inference`] (request time)
    fn inference_context(self, what: &str) -> Result<T>;
}

impl<T, E: Display> ModelResultExt<T> for std::result::Result<T, E> {
    fn model_context(self, what: &str) -> Result<T> {
        self.map_err(|e| Error::model(format!("{what}: {e}")))
    }

    fn inference_context(self, what: &str) -> Result<T> {
        self.map_err(|e| Error::inference(format!("{what}: {e}")))
    }
}

/// Pick the inference device
pub fn select_device(use_accelerator: bool) -> Result<Device> {
    if use_accelerator {
        if candle_core::utils::cuda_is_available() {
            tracing::info!("Using CUDA device 0");
            return Device::new_cuda(0).model_context("Failed to initialize CUDA");
        }
        if candle_core::utils::metal_is_available() {
            tracing::info!("Using Metal device 0");
            return Device::new_metal(0).model_context("Failed to initialize Metal");
        }
        tracing::warn!("Accelerator requested but none is available, falling back to CPU");
    }
    Ok(Device::Cpu)
}

/// Fetch a model repository into `cache_dir` and return the snapshot directory
///
/// Files already present in the cache are reused without network access.
pub fn fetch_model_files(repo: &str, cache_dir: &Path) -> Result<PathBuf> {
    tracing::info!("Fetching model {} into {}", repo, cache_dir.display());

    let api = hf_hub::api::sync::ApiBuilder::new()
        .with_cache_dir(cache_dir.to_path_buf())
        .with_progress(false)
        .build()
        .model_context("Failed to initialize Hugging Face API")?;
    let repo_api = api.model(repo.to_string());

    let config_path = repo_api
        .get("config.json")
        .model_context(&format!("Failed to download config.json for {repo}"))?;

    let weights = ["model.safetensors", "pytorch_model.bin"]
        .iter()
        .find(|file| repo_api.get(file).is_ok());
    match weights {
        Some(file) => tracing::debug!("Found weight file: {}", file),
        None => {
            return Err(Error::model(format!(
                "No model weights found for {repo} (tried model.safetensors, pytorch_model.bin)"
            )))
        }
    }

    let mut found_tokenizer = false;
    for file in ["tokenizer.json", "vocab.json", "merges.txt", "vocab.txt"] {
        match repo_api.get(file) {
            Ok(_) => {
                tracing::debug!("Found tokenizer file: {}", file);
                found_tokenizer = true;
            }
            Err(_) => tracing::debug!("Tokenizer file not present: {}", file),
        }
    }
    if !found_tokenizer {
        return Err(Error::model(format!(
            "No tokenizer files found for {repo}"
        )));
    }

    let model_dir = config_path
        .parent()
        .ok_or_else(|| Error::model("Invalid cache path"))?
        .to_path_buf();

    tracing::info!("Model available at: {}", model_dir.display());
    Ok(model_dir)
}

/// Parse a JSON config file into `T`
pub fn parse_json_config<T: DeserializeOwned>(config_path: &Path) -> Result<T> {
    let config_str = std::fs::read_to_string(config_path)
        .model_context(&format!("Failed to read config {}", config_path.display()))?;

    serde_json::from_str(&config_str)
        .model_context(&format!("Failed to parse config {}", config_path.display()))
}

/// Memory-map safetensors weights, or fall back to a PyTorch checkpoint
pub fn load_var_builder(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the cache file is not modified while mapped.
        return unsafe {
            VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)
                .model_context("Failed to load safetensors weights")
        };
    }

    let pth = model_dir.join("pytorch_model.bin");
    if pth.exists() {
        tracing::debug!("Loading PyTorch checkpoint {}", pth.display());
        return VarBuilder::from_pth(&pth, DType::F32, device)
            .model_context("Failed to load PyTorch weights");
    }

    Err(Error::model(format!(
        "No weights found in {}",
        model_dir.display()
    )))
}

/// Load a BERT-family backbone, trying the usual checkpoint prefixes
pub fn load_bert_backbone(vb: &VarBuilder, config: &BertConfig) -> Result<BertModel> {
    let mut errors = Vec::new();

    for prefix in ["bert", "roberta", ""] {
        let vb_prefix = if prefix.is_empty() {
            vb.clone()
        } else {
            vb.pp(prefix)
        };
        let shown = if prefix.is_empty() { "<root>" } else { prefix };

        match BertModel::load(vb_prefix, config) {
            Ok(model) => {
                tracing::info!("Loaded BERT backbone from '{}'", shown);
                return Ok(model);
            }
            Err(e) => errors.push(format!("{shown}: {e}")),
        }
    }

    Err(Error::model(format!(
        "Failed to load BERT backbone with tried prefixes [{}]",
        errors.join(" | ")
    )))
}

/// Label names in output order, from `config.json` `id2label`
///
/// Missing or malformed entries become `LABEL_<i>`.
pub fn read_id2label(config: &serde_json::Value, num_labels: usize) -> Vec<String> {
    let mapped: BTreeMap<usize, String> = config
        .get("id2label")
        .and_then(|v| v.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(k, v)| Some((k.parse().ok()?, v.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default();

    (0..num_labels)
        .map(|i| mapped.get(&i).cloned().unwrap_or_else(|| format!("LABEL_{i}")))
        .collect()
}

/// Number of output labels declared by a model config
pub fn read_num_labels(config: &serde_json::Value) -> usize {
    config
        .get("id2label")
        .and_then(|v| v.as_object())
        .map(|obj| obj.len())
        .filter(|n| *n > 0)
        .or_else(|| {
            config
                .get("num_labels")
                .and_then(|v| v.as_u64())
                .map(|n| n as usize)
        })
        .unwrap_or(3)
}

/// Load a tokenizer from a model directory and configure batch padding and truncation
///
/// Tries `tokenizer.json`, then byte-level BPE from `vocab.json` + `merges.txt`,
/// then WordPiece from `vocab.txt`.
pub fn load_tokenizer(model_dir: &Path, max_length: usize) -> Result<Tokenizer> {
    let mut tokenizer = build_tokenizer(model_dir)?;

    if tokenizer.get_padding().is_none() {
        let (pad_token, pad_id) = ["<pad>", "[PAD]"]
            .iter()
            .find_map(|t| tokenizer.token_to_id(t).map(|id| (t.to_string(), id)))
            .unwrap_or_else(|| ("[PAD]".to_string(), 0));
        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            pad_id,
            pad_token,
            ..Default::default()
        }));
    } else if let Some(padding) = tokenizer.get_padding_mut() {
        padding.strategy = PaddingStrategy::BatchLongest;
    }

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .model_context("Failed to configure truncation")?;

    Ok(tokenizer)
}

fn build_tokenizer(model_dir: &Path) -> Result<Tokenizer> {
    let tokenizer_json = model_dir.join("tokenizer.json");
    if tokenizer_json.exists() {
        tracing::debug!("Loading tokenizer from tokenizer.json");
        return Tokenizer::from_file(&tokenizer_json).model_context("Failed to load tokenizer.json");
    }

    let vocab_json = model_dir.join("vocab.json");
    let merges = model_dir.join("merges.txt");
    if vocab_json.exists() && merges.exists() {
        tracing::debug!("Building byte-level BPE tokenizer from vocab.json + merges.txt");

        use tokenizers::decoders::byte_level::ByteLevel as ByteLevelDecoder;
        use tokenizers::models::bpe::BPE;
        use tokenizers::pre_tokenizers::byte_level::ByteLevel;
        use tokenizers::processors::roberta::RobertaProcessing;

        let bpe = BPE::from_file(
            vocab_json.to_string_lossy().as_ref(),
            merges.to_string_lossy().as_ref(),
        )
        .unk_token("<unk>".to_string())
        .build()
        .model_context("Failed to build BPE model")?;

        let mut tokenizer = Tokenizer::new(bpe);
        let cls_id = tokenizer.token_to_id("<s>").unwrap_or(0);
        let sep_id = tokenizer.token_to_id("</s>").unwrap_or(2);

        tokenizer.with_pre_tokenizer(Some(ByteLevel::new(false, true, true)));
        tokenizer.with_decoder(Some(ByteLevelDecoder::default()));
        tokenizer.with_post_processor(Some(RobertaProcessing::new(
            ("</s>".to_string(), sep_id),
            ("<s>".to_string(), cls_id),
        )));

        return Ok(tokenizer);
    }

    let vocab_txt = model_dir.join("vocab.txt");
    if vocab_txt.exists() {
        tracing::debug!("Building WordPiece tokenizer from vocab.txt");

        use tokenizers::models::wordpiece::WordPiece;
        use tokenizers::normalizers::BertNormalizer;
        use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
        use tokenizers::processors::bert::BertProcessing;

        let wordpiece = WordPiece::from_file(vocab_txt.to_string_lossy().as_ref())
            .unk_token("[UNK]".to_string())
            .build()
            .model_context("Failed to build WordPiece model")?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        let cls_id = tokenizer.token_to_id("[CLS]").unwrap_or(101);
        let sep_id = tokenizer.token_to_id("[SEP]").unwrap_or(102);

        tokenizer.with_normalizer(Some(BertNormalizer::default()));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));
        tokenizer.with_post_processor(Some(BertProcessing::new(
            ("[SEP]".to_string(), sep_id),
            ("[CLS]".to_string(), cls_id),
        )));

        return Ok(tokenizer);
    }

    Err(Error::model(format!(
        "No tokenizer found in {} (tried tokenizer.json, vocab.json + merges.txt, vocab.txt)",
        model_dir.display()
    )))
}

/// Tokenized batch as `(batch, seq)` tensors
pub struct EncodedBatch {
    pub input_ids: Tensor,
    pub attention_mask: Tensor,
    pub token_type_ids: Tensor,
    pub mask_rows: Vec<Vec<u32>>,
}

/// Tokenize a batch and stack it into tensors on `device`
pub fn encode_batch(tokenizer: &Tokenizer, texts: &[String], device: &Device) -> Result<EncodedBatch> {
    let encodings = tokenizer
        .encode_batch(texts.to_vec(), true)
        .inference_context("Tokenization failed")?;

    let batch = encodings.len();
    let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

    let mut ids = Vec::with_capacity(batch * seq_len);
    let mut mask = Vec::with_capacity(batch * seq_len);
    let mut type_ids = Vec::with_capacity(batch * seq_len);
    let mut mask_rows = Vec::with_capacity(batch);

    for encoding in &encodings {
        if encoding.get_ids().len() != seq_len {
            return Err(Error::inference("Tokenizer produced ragged batch"));
        }
        ids.extend_from_slice(encoding.get_ids());
        mask.extend_from_slice(encoding.get_attention_mask());
        type_ids.extend_from_slice(encoding.get_type_ids());
        mask_rows.push(encoding.get_attention_mask().to_vec());
    }

    let shape = (batch, seq_len);
    Ok(EncodedBatch {
        input_ids: Tensor::from_vec(ids, shape, device)
            .inference_context("Failed to create input ids tensor")?,
        attention_mask: Tensor::from_vec(mask, shape, device)
            .inference_context("Failed to create attention mask tensor")?,
        token_type_ids: Tensor::from_vec(type_ids, shape, device)
            .inference_context("Failed to create token type ids tensor")?,
        mask_rows,
    })
}

/// Average token embeddings over the attention mask
///
/// When the mask selects nothing, every token is averaged.
pub fn mean_pool_embeddings(sequence_embeddings: &[Vec<f32>], attention_mask: &[u32]) -> Vec<f32> {
    if sequence_embeddings.is_empty() {
        return Vec::new();
    }

    let hidden_dim = sequence_embeddings[0].len();
    let mut pooled = vec![0.0f32; hidden_dim];
    let mut token_count = 0.0f32;

    for (embedding, _) in sequence_embeddings
        .iter()
        .zip(attention_mask)
        .filter(|(_, m)| **m > 0)
    {
        token_count += 1.0;
        for (acc, value) in pooled.iter_mut().zip(embedding) {
            *acc += value;
        }
    }

    if token_count == 0.0 {
        token_count = sequence_embeddings.len() as f32;
        for embedding in sequence_embeddings {
            for (acc, value) in pooled.iter_mut().zip(embedding) {
                *acc += value;
            }
        }
    }

    for value in &mut pooled {
        *value /= token_count;
    }

    pooled
}
