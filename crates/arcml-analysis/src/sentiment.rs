//! Chunked sentiment batching with neutral fallback

use arcml_core::{normalize_label, SentimentOutcome, TextItem};
use arcml_models::{top_label, SequenceClassifier};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Chunking and truncation limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Maximum texts per classifier call
    pub max_batch_size: usize,

    /// Characters of each text passed to the classifier
    pub max_text_length: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_batch_size: 1000,
            max_text_length: 512,
        }
    }
}

/// Leading `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Confidence within [0, 1]; non-finite scores become 0
fn sanitize_confidence(score: f32) -> f32 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Runs a sentiment classifier over arbitrarily long text lists
///
/// Never fails: a chunk whose inference errors yields neutral, zero-confidence
/// outcomes carrying the error message.
#[derive(Clone)]
pub struct SentimentBatcher {
    classifier: Arc<dyn SequenceClassifier>,
    settings: BatchSettings,
}

impl SentimentBatcher {
    pub fn new(classifier: Arc<dyn SequenceClassifier>, settings: BatchSettings) -> Self {
        Self {
            classifier,
            settings: BatchSettings {
                max_batch_size: settings.max_batch_size.max(1),
                ..settings
            },
        }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// One outcome per input, in input order
    pub async fn analyze(&self, items: &[TextItem]) -> Vec<SentimentOutcome> {
        if items.is_empty() {
            return Vec::new();
        }

        let start = Instant::now();
        let mut outcomes = Vec::with_capacity(items.len());

        for (chunk_idx, chunk) in items.chunks(self.settings.max_batch_size).enumerate() {
            let texts: Vec<String> = chunk
                .iter()
                .map(|item| truncate_chars(&item.text, self.settings.max_text_length).to_string())
                .collect();

            debug!(
                "Classifying chunk {} ({} texts) with {}",
                chunk_idx,
                texts.len(),
                self.classifier.name()
            );

            match self.classifier.classify_batch(&texts).await {
                Ok(scores) if scores.len() == chunk.len() => {
                    outcomes.extend(chunk.iter().zip(scores).map(|(item, scores)| {
                        match top_label(&scores) {
                            Some(best) => SentimentOutcome {
                                text: item.text.clone(),
                                sentiment: normalize_label(&best.label),
                                confidence: sanitize_confidence(best.score),
                                external_id: item.external_id.clone(),
                                error: None,
                            },
                            None => {
                                metrics::counter!("arcml_inference_fallbacks_total").increment(1);
                                SentimentOutcome::fallback(item, "classifier returned no scores")
                            }
                        }
                    }));
                }
                Ok(scores) => {
                    let message = format!(
                        "classifier returned {} results for {} texts",
                        scores.len(),
                        chunk.len()
                    );
                    warn!("Sentiment chunk {} failed: {}", chunk_idx, message);
                    outcomes.extend(self.fallback_chunk(chunk, &message));
                }
                Err(e) => {
                    warn!("Sentiment chunk {} failed: {}", chunk_idx, e);
                    outcomes.extend(self.fallback_chunk(chunk, &e.to_string()));
                }
            }
        }

        metrics::counter!("arcml_texts_processed_total", "kind" => "sentiment")
            .increment(items.len() as u64);
        metrics::histogram!("arcml_batch_latency_ms", "kind" => "sentiment")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        outcomes
    }

    fn fallback_chunk(&self, chunk: &[TextItem], message: &str) -> Vec<SentimentOutcome> {
        metrics::counter!("arcml_inference_fallbacks_total").increment(chunk.len() as u64);
        chunk
            .iter()
            .map(|item| SentimentOutcome::fallback(item, message))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("", 3), "");
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("😀😀😀", 2), "😀😀");
    }

    #[test]
    fn test_sanitize_confidence() {
        assert_eq!(sanitize_confidence(0.7), 0.7);
        assert_eq!(sanitize_confidence(1.2), 1.0);
        assert_eq!(sanitize_confidence(-0.1), 0.0);
        assert_eq!(sanitize_confidence(f32::NAN), 0.0);
        assert_eq!(sanitize_confidence(f32::INFINITY), 0.0);
    }

    #[test]
    fn test_zero_batch_size_is_raised() {
        struct Never;

        #[async_trait::async_trait]
        impl SequenceClassifier for Never {
            async fn classify_batch(
                &self,
                _texts: &[String],
            ) -> arcml_core::Result<Vec<Vec<arcml_core::LabelScore>>> {
                unreachable!()
            }

            fn name(&self) -> &str {
                "never"
            }

            fn labels(&self) -> &[String] {
                &[]
            }
        }

        let batcher = SentimentBatcher::new(
            Arc::new(Never),
            BatchSettings {
                max_batch_size: 0,
                max_text_length: 10,
            },
        );
        assert_eq!(batcher.settings().max_batch_size, 1);
    }
}
