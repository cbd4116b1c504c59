//! Core types for Arc ML

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical 3-way sentiment scheme every model vocabulary is normalized into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    #[serde(rename = "POS")]
    Positive,
    #[serde(rename = "NEU")]
    Neutral,
    #[serde(rename = "NEG")]
    Negative,
}

impl Sentiment {
    /// Wire/storage representation (`POS`, `NEU`, `NEG`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "POS",
            Self::Neutral => "NEU",
            Self::Negative => "NEG",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single label/score pair emitted by a classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    /// Raw label as named by the model (e.g. `LABEL_2`, `positive`)
    pub label: String,

    /// Probability for this label
    pub score: f32,
}

impl LabelScore {
    pub fn new(label: impl Into<String>, score: f32) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// One text submitted for analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextItem {
    /// Text content
    pub text: String,

    /// Caller-supplied correlation id
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl TextItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            external_id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }
}

impl From<&str> for TextItem {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Sentiment result for one input text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentOutcome {
    /// Original (untruncated) input text
    pub text: String,

    /// Canonical sentiment
    pub sentiment: Sentiment,

    /// Score of the winning label, within [0, 1]
    pub confidence: f32,

    /// Caller-supplied correlation id
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Set when the outcome is a neutral fallback for a failed inference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SentimentOutcome {
    /// Neutral, zero-confidence outcome recorded when inference failed
    pub fn fallback(item: &TextItem, error: impl Into<String>) -> Self {
        Self {
            text: item.text.clone(),
            sentiment: Sentiment::Neutral,
            confidence: 0.0,
            external_id: item.external_id.clone(),
            error: Some(error.into()),
        }
    }

    /// Whether this outcome came from the fallback path
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// Ranked keyphrases for one input text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordSet {
    /// Original input text
    pub text: String,

    /// Keyphrases, most relevant first
    pub keywords: Vec<String>,

    /// Caller-supplied correlation id
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl KeywordSet {
    pub fn empty(item: &TextItem) -> Self {
        Self {
            text: item.text.clone(),
            keywords: Vec::new(),
            external_id: item.external_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_wire_format() {
        assert_eq!(serde_json::to_string(&Sentiment::Positive).unwrap(), "\"POS\"");
        assert_eq!(serde_json::to_string(&Sentiment::Neutral).unwrap(), "\"NEU\"");
        assert_eq!(serde_json::to_string(&Sentiment::Negative).unwrap(), "\"NEG\"");

        let parsed: Sentiment = serde_json::from_str("\"NEG\"").unwrap();
        assert_eq!(parsed, Sentiment::Negative);
    }

    #[test]
    fn test_text_item_id_field() {
        let item: TextItem = serde_json::from_str(r#"{"text": "hello", "id": "c-1"}"#).unwrap();
        assert_eq!(item.external_id.as_deref(), Some("c-1"));

        let item: TextItem = serde_json::from_str(r#"{"text": "hello"}"#).unwrap();
        assert!(item.external_id.is_none());
    }

    #[test]
    fn test_fallback_outcome() {
        let item = TextItem::new("great stuff").with_id("42");
        let outcome = SentimentOutcome::fallback(&item, "boom");

        assert_eq!(outcome.sentiment, Sentiment::Neutral);
        assert_eq!(outcome.confidence, 0.0);
        assert_eq!(outcome.external_id.as_deref(), Some("42"));
        assert!(outcome.is_fallback());

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["error"], "boom");
        assert_eq!(json["id"], "42");
    }
}
