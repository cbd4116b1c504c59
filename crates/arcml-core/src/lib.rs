//! Arc ML Core
//!
//! Types and error handling shared across the Arc ML crates.
//!
//! This crate provides:
//! - The error type and result alias used by every layer
//! - Domain records for batch analysis (text items, sentiment outcomes, keyword sets)
//! - Normalization of model label vocabularies into the canonical sentiment scheme

pub mod error;
pub mod label;
pub mod types;

pub use error::{Error, Result};
pub use label::{normalize_label, RawLabel};
pub use types::{KeywordSet, LabelScore, Sentiment, SentimentOutcome, TextItem};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::types::{KeywordSet, LabelScore, Sentiment, SentimentOutcome, TextItem};
}
