//! Arc ML Models
//!
//! Model handles behind the batch analysis pipeline.
//!
//! Three models are cached for the lifetime of the process:
//! - `sentiment`: a transformer sequence classifier (RoBERTa or BERT family)
//! - `embeddings`: a sentence-transformer encoder (mean pooling + L2 norm)
//! - `keybert`: an MMR keyphrase extractor built on the encoder
//!
//! Inference runs on CPU by default, on the blocking thread pool.

pub mod cache;
pub mod candle_classifier;
pub mod candle_encoder;
pub mod classifier;
pub mod encoder;
pub mod keywords;
pub mod loader;
pub mod resources;
pub mod settings;

pub use cache::{ModelCache, ModelCacheBuilder, ModelHandle, ModelName};
pub use candle_classifier::CandleSentimentClassifier;
pub use candle_encoder::CandleSentenceEncoder;
pub use classifier::{top_label, SequenceClassifier};
pub use encoder::{cosine_similarity, l2_normalize, TextEncoder};
pub use keywords::{mmr_select, KeywordModel, KeywordOptions, MmrKeywordExtractor, ScoredKeyword};
pub use resources::LanguageResources;
pub use settings::ModelSettings;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cache::{ModelCache, ModelHandle};
    pub use crate::classifier::SequenceClassifier;
    pub use crate::encoder::TextEncoder;
    pub use crate::keywords::{KeywordModel, KeywordOptions};
}
