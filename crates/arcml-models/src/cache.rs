//! Model cache: the three shared model handles, loaded once at warm-up

use crate::candle_classifier::CandleSentimentClassifier;
use crate::candle_encoder::CandleSentenceEncoder;
use crate::classifier::SequenceClassifier;
use crate::encoder::TextEncoder;
use crate::keywords::{KeywordModel, MmrKeywordExtractor};
use crate::resources::LanguageResources;
use crate::settings::ModelSettings;
use arcml_core::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Lookup names of the cached models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelName {
    Sentiment,
    Embeddings,
    Keywords,
}

impl ModelName {
    pub const ALL: [ModelName; 3] = [Self::Sentiment, Self::Embeddings, Self::Keywords];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sentiment => "sentiment",
            Self::Embeddings => "embeddings",
            Self::Keywords => "keybert",
        }
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sentiment" => Ok(Self::Sentiment),
            "embeddings" => Ok(Self::Embeddings),
            "keybert" => Ok(Self::Keywords),
            other => Err(Error::model_not_loaded(format!("unknown model '{other}'"))),
        }
    }
}

/// Shared reference to one loaded model
#[derive(Clone)]
pub enum ModelHandle {
    Sentiment(Arc<dyn SequenceClassifier>),
    Embeddings(Arc<dyn TextEncoder>),
    Keywords(Arc<dyn KeywordModel>),
}

impl ModelHandle {
    pub fn model_name(&self) -> &str {
        match self {
            Self::Sentiment(m) => m.name(),
            Self::Embeddings(m) => m.name(),
            Self::Keywords(m) => m.name(),
        }
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelHandle").field(&self.model_name()).finish()
    }
}

/// Immutable set of model handles shared by every request and job
///
/// Built once by [`ModelCache::initialize`] (or [`ModelCacheBuilder`] for
/// tests) and never mutated afterwards.
#[derive(Clone, Default)]
pub struct ModelCache {
    sentiment: Option<Arc<dyn SequenceClassifier>>,
    embeddings: Option<Arc<dyn TextEncoder>>,
    keywords: Option<Arc<dyn KeywordModel>>,
    resources: Arc<LanguageResources>,
}

impl ModelCache {
    /// Load every model in order: language resources, sentiment classifier,
    /// embedding encoder, keyword extractor
    ///
    /// Any failure aborts initialization.
    pub async fn initialize(settings: &ModelSettings) -> Result<Self> {
        let settings = settings.clone();
        tokio::task::spawn_blocking(move || Self::load_blocking(&settings))
            .await
            .map_err(|e| Error::model(format!("Model loading task failed: {e}")))?
    }

    fn load_blocking(settings: &ModelSettings) -> Result<Self> {
        let start = Instant::now();
        info!("Initializing model cache in {}", settings.cache_dir.display());

        for dir in settings.namespace_dirs() {
            std::fs::create_dir_all(&dir)?;
        }

        let resources = Arc::new(LanguageResources::load(&settings.resources_dir())?);
        info!("Language resources ready ({} stop words)", resources.stop_word_count());

        let sentiment: Arc<dyn SequenceClassifier> = Arc::new(CandleSentimentClassifier::load(
            &settings.sentiment_model,
            &settings.sentiment_dir(),
            settings.use_accelerator,
        )?);
        info!("Sentiment model loaded: {}", settings.sentiment_model);

        let embedding_repo = settings.embedding_repo();
        let embeddings: Arc<dyn TextEncoder> = Arc::new(CandleSentenceEncoder::load(
            &embedding_repo,
            &settings.embeddings_dir(),
            settings.use_accelerator,
        )?);
        info!("Embedding model loaded: {}", embedding_repo);

        let keywords: Arc<dyn KeywordModel> = Arc::new(MmrKeywordExtractor::new(
            Arc::clone(&embeddings),
            Arc::clone(&resources),
        )?);
        info!("Keyword extractor ready");

        info!(
            "Model cache initialized in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        Ok(Self {
            sentiment: Some(sentiment),
            embeddings: Some(embeddings),
            keywords: Some(keywords),
            resources,
        })
    }

    pub fn builder() -> ModelCacheBuilder {
        ModelCacheBuilder::default()
    }

    /// Look up a handle by name
    pub fn get(&self, name: &str) -> Result<ModelHandle> {
        let name: ModelName = name.parse()?;
        let missing = || Error::model_not_loaded(name.as_str());

        Ok(match name {
            ModelName::Sentiment => ModelHandle::Sentiment(self.sentiment.clone().ok_or_else(missing)?),
            ModelName::Embeddings => {
                ModelHandle::Embeddings(self.embeddings.clone().ok_or_else(missing)?)
            }
            ModelName::Keywords => ModelHandle::Keywords(self.keywords.clone().ok_or_else(missing)?),
        })
    }

    pub fn sentiment(&self) -> Result<Arc<dyn SequenceClassifier>> {
        self.sentiment
            .clone()
            .ok_or_else(|| Error::model_not_loaded(ModelName::Sentiment.as_str()))
    }

    pub fn embeddings(&self) -> Result<Arc<dyn TextEncoder>> {
        self.embeddings
            .clone()
            .ok_or_else(|| Error::model_not_loaded(ModelName::Embeddings.as_str()))
    }

    pub fn keywords(&self) -> Result<Arc<dyn KeywordModel>> {
        self.keywords
            .clone()
            .ok_or_else(|| Error::model_not_loaded(ModelName::Keywords.as_str()))
    }

    pub fn resources(&self) -> &Arc<LanguageResources> {
        &self.resources
    }

    /// Names of the handles currently present
    pub fn loaded_models(&self) -> Vec<&'static str> {
        let present = [
            self.sentiment.is_some(),
            self.embeddings.is_some(),
            self.keywords.is_some(),
        ];
        ModelName::ALL
            .iter()
            .zip(present)
            .filter(|(_, loaded)| *loaded)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// All three handles are present
    pub fn is_ready(&self) -> bool {
        self.sentiment.is_some() && self.embeddings.is_some() && self.keywords.is_some()
    }
}

/// Assembles a [`ModelCache`] from already-built models
#[derive(Default)]
pub struct ModelCacheBuilder {
    cache: ModelCache,
}

impl ModelCacheBuilder {
    pub fn sentiment(mut self, model: Arc<dyn SequenceClassifier>) -> Self {
        self.cache.sentiment = Some(model);
        self
    }

    pub fn embeddings(mut self, model: Arc<dyn TextEncoder>) -> Self {
        self.cache.embeddings = Some(model);
        self
    }

    pub fn keywords(mut self, model: Arc<dyn KeywordModel>) -> Self {
        self.cache.keywords = Some(model);
        self
    }

    pub fn resources(mut self, resources: LanguageResources) -> Self {
        self.cache.resources = Arc::new(resources);
        self
    }

    /// Derive the keyword extractor from the configured encoder
    pub fn keywords_from_embeddings(mut self) -> Result<Self> {
        let encoder = self.cache.embeddings()?;
        let extractor = MmrKeywordExtractor::new(encoder, Arc::clone(&self.cache.resources))?;
        self.cache.keywords = Some(Arc::new(extractor));
        Ok(self)
    }

    pub fn build(self) -> ModelCache {
        self.cache
    }
}
