//! Model selection and on-disk cache layout

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which models to load and where to keep their weights
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Root of the on-disk model cache
    pub cache_dir: PathBuf,

    /// Hugging Face repository of the sentiment classifier
    pub sentiment_model: String,

    /// Sentence-transformer used for embeddings and keyword extraction
    pub embedding_model: String,

    /// Use CUDA or Metal when the build and host support it
    pub use_accelerator: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./models"),
            sentiment_model: "cardiffnlp/twitter-roberta-base-sentiment-latest".to_string(),
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            use_accelerator: false,
        }
    }
}

impl ModelSettings {
    pub fn sentiment_dir(&self) -> PathBuf {
        self.cache_dir.join("sentiment")
    }

    pub fn embeddings_dir(&self) -> PathBuf {
        self.cache_dir.join("embeddings")
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.cache_dir.join("resources")
    }

    /// Cache directories, one per model namespace
    pub fn namespace_dirs(&self) -> [PathBuf; 3] {
        [
            self.sentiment_dir(),
            self.embeddings_dir(),
            self.resources_dir(),
        ]
    }

    /// Embedding repository id; bare names live under `sentence-transformers/`
    pub fn embedding_repo(&self) -> String {
        qualify_repo(&self.embedding_model, "sentence-transformers")
    }

    pub fn with_cache_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cache_dir = dir.as_ref().to_path_buf();
        self
    }
}

fn qualify_repo(name: &str, default_owner: &str) -> String {
    if name.contains('/') {
        name.to_string()
    } else {
        format!("{default_owner}/{name}")
    }
}
