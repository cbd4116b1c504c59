//! Normalization of model label vocabularies into the canonical sentiment scheme
//!
//! Sentiment models disagree on label names: some emit positional labels
//! (`LABEL_0`..`LABEL_2`), others textual ones (`negative`, `NEUTRAL`, ...).
//! Raw labels are parsed into a closed set first; mapping that set onto
//! [`Sentiment`] is then a total function.

use crate::types::Sentiment;

/// Closed vocabulary of raw labels understood by the normalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawLabel {
    Label0,
    Label1,
    Label2,
    Negative,
    Neutral,
    Positive,
    /// Anything else a model might emit
    Unknown,
}

impl RawLabel {
    /// Parse a model label, case-insensitively
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "LABEL_0" => Self::Label0,
            "LABEL_1" => Self::Label1,
            "LABEL_2" => Self::Label2,
            "NEGATIVE" => Self::Negative,
            "NEUTRAL" => Self::Neutral,
            "POSITIVE" => Self::Positive,
            _ => Self::Unknown,
        }
    }

    /// Canonical sentiment for this label; unknown labels are neutral
    pub fn sentiment(self) -> Sentiment {
        match self {
            Self::Label0 | Self::Negative => Sentiment::Negative,
            Self::Label1 | Self::Neutral => Sentiment::Neutral,
            Self::Label2 | Self::Positive => Sentiment::Positive,
            Self::Unknown => Sentiment::Neutral,
        }
    }
}

/// Map any raw model label to the canonical scheme
pub fn normalize_label(label: &str) -> Sentiment {
    RawLabel::parse(label).sentiment()
}
