//! Sequence classifier trait

use arcml_core::{LabelScore, Result};
use async_trait::async_trait;

/// A text classifier that scores every label for every input
///
/// Implementations receive one chunk at a time and must return exactly one
/// score list per input text, in input order.
#[async_trait]
pub trait SequenceClassifier: Send + Sync {
    /// Score all labels for each text in the chunk
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Vec<LabelScore>>>;

    /// Get the classifier name
    fn name(&self) -> &str;

    /// Labels this classifier can emit, in model output order
    fn labels(&self) -> &[String];
}

/// Pick the highest-scoring label of one text's score list
pub fn top_label(scores: &[LabelScore]) -> Option<&LabelScore> {
    scores
        .iter()
        .max_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal))
}
