//! Error types for Arc ML

/// Result type alias using Arc ML's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Arc ML operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or oversized request, rejected before any model work
    #[error("validation error: {0}")]
    Validation(String),

    /// A model handle was requested before initialization or under an unknown name
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),

    /// Model download or construction errors
    #[error("model error: {0}")]
    Model(String),

    /// Inference-time errors (tokenization, forward pass)
    #[error("inference error: {0}")]
    Inference(String),

    /// Relational store errors
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Readiness check failed
    #[error("service not ready: {0}")]
    NotReady(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new model-not-loaded error
    pub fn model_not_loaded(name: impl Into<String>) -> Self {
        Self::ModelNotLoaded(name.into())
    }

    /// Create a new model error
    pub fn model(msg: impl Into<String>) -> Self {
        Self::Model(msg.into())
    }

    /// Create a new inference error
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new not-ready error
    pub fn not_ready(msg: impl Into<String>) -> Self {
        Self::NotReady(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the error should surface to API callers as a client error
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
