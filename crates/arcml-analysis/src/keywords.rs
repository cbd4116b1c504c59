//! Keyphrase extraction over batches of texts

use arcml_core::{KeywordSet, Result, TextItem};
use arcml_models::{KeywordModel, KeywordOptions};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Texts shorter than this (after trimming) get no keywords
pub const MIN_KEYWORD_TEXT_CHARS: usize = 10;

/// Runs a keyword model over a list of texts
#[derive(Clone)]
pub struct KeywordBatcher {
    model: Arc<dyn KeywordModel>,
    options: KeywordOptions,
}

impl KeywordBatcher {
    pub fn new(model: Arc<dyn KeywordModel>) -> Self {
        Self {
            model,
            options: KeywordOptions::default(),
        }
    }

    pub fn with_options(mut self, options: KeywordOptions) -> Self {
        self.options = options;
        self
    }

    /// One keyword set per input, in input order
    ///
    /// Any extraction failure empties the keyword lists of the whole batch.
    pub async fn extract(&self, items: &[TextItem], top_k: usize) -> Vec<KeywordSet> {
        if items.is_empty() {
            return Vec::new();
        }

        let start = Instant::now();
        let result = self.extract_all(items, top_k).await;

        metrics::counter!("arcml_texts_processed_total", "kind" => "keywords")
            .increment(items.len() as u64);
        metrics::histogram!("arcml_batch_latency_ms", "kind" => "keywords")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(sets) => sets,
            Err(e) => {
                warn!("Keyword extraction failed for batch of {}: {}", items.len(), e);
                metrics::counter!("arcml_inference_fallbacks_total").increment(items.len() as u64);
                items.iter().map(KeywordSet::empty).collect()
            }
        }
    }

    async fn extract_all(&self, items: &[TextItem], top_k: usize) -> Result<Vec<KeywordSet>> {
        let options = self.options.with_top_k(top_k);
        let mut sets = Vec::with_capacity(items.len());

        for item in items {
            if item.text.trim().chars().count() < MIN_KEYWORD_TEXT_CHARS {
                debug!("Skipping keyword extraction for short text");
                sets.push(KeywordSet::empty(item));
                continue;
            }

            let keywords = self.model.extract(&item.text, &options).await?;
            sets.push(KeywordSet {
                text: item.text.clone(),
                keywords: keywords.into_iter().map(|k| k.phrase).collect(),
                external_id: item.external_id.clone(),
            });
        }

        Ok(sets)
    }
}
