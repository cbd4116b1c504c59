//! Embedding-based keyphrase extraction with Maximal Marginal Relevance
//!
//! Candidates are the distinct 1..=N word n-grams of a document after stop
//! words are removed. The document and every candidate are embedded with the
//! shared [`TextEncoder`]; candidates are then picked greedily, trading
//! similarity to the document against similarity to already-picked phrases.

use crate::encoder::{cosine_similarity, TextEncoder};
use crate::resources::LanguageResources;
use arcml_core::{Error, Result};
use async_trait::async_trait;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Candidates are embedded in slices of this size
const CANDIDATE_EMBED_CHUNK: usize = 64;

/// Extraction parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeywordOptions {
    /// Maximum number of phrases returned
    pub top_k: usize,

    /// Shortest and longest phrase, in words
    pub ngram_range: (usize, usize),

    /// Weight of the redundancy penalty (0 = pure relevance, 1 = pure diversity)
    pub diversity: f32,
}

impl Default for KeywordOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            ngram_range: (1, 2),
            diversity: 0.5,
        }
    }
}

impl KeywordOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

/// A selected phrase and its similarity to the source document
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredKeyword {
    pub phrase: String,
    pub relevance: f32,
}

/// Keyphrase extraction model
#[async_trait]
pub trait KeywordModel: Send + Sync {
    /// Extract ranked keyphrases from one document
    async fn extract(&self, text: &str, options: &KeywordOptions) -> Result<Vec<ScoredKeyword>>;

    /// Get the model name
    fn name(&self) -> &str;
}

/// KeyBERT-style extractor on top of a sentence encoder
pub struct MmrKeywordExtractor {
    encoder: Arc<dyn TextEncoder>,
    resources: Arc<LanguageResources>,
    token_pattern: Regex,
}

impl MmrKeywordExtractor {
    pub fn new(encoder: Arc<dyn TextEncoder>, resources: Arc<LanguageResources>) -> Result<Self> {
        let token_pattern = Regex::new(r"\b\w\w+\b")
            .map_err(|e| Error::internal(format!("Invalid token pattern: {e}")))?;

        Ok(Self {
            encoder,
            resources,
            token_pattern,
        })
    }

    /// Distinct candidate phrases of `text`, sorted
    pub fn candidates(&self, text: &str, ngram_range: (usize, usize)) -> Vec<String> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = self
            .token_pattern
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !self.resources.is_stop_word(t))
            .collect();

        let (min_n, max_n) = (ngram_range.0.max(1), ngram_range.1.max(ngram_range.0.max(1)));
        let mut phrases = BTreeSet::new();
        for n in min_n..=max_n {
            for window in tokens.windows(n) {
                phrases.insert(window.join(" "));
            }
        }

        phrases.into_iter().collect()
    }

    async fn embed_candidates(&self, candidates: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(candidates.len());
        for chunk in candidates.chunks(CANDIDATE_EMBED_CHUNK) {
            let vectors = self.encoder.embed(chunk).await?;
            if vectors.len() != chunk.len() {
                return Err(Error::inference(format!(
                    "Encoder returned {} embeddings for {} candidates",
                    vectors.len(),
                    chunk.len()
                )));
            }
            embeddings.extend(vectors);
        }
        Ok(embeddings)
    }
}

#[async_trait]
impl KeywordModel for MmrKeywordExtractor {
    async fn extract(&self, text: &str, options: &KeywordOptions) -> Result<Vec<ScoredKeyword>> {
        let candidates = self.candidates(text, options.ngram_range);
        if candidates.is_empty() || options.top_k == 0 {
            return Ok(Vec::new());
        }

        let doc_embedding = self
            .encoder
            .embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::inference("Encoder returned no document embedding"))?;
        let candidate_embeddings = self.embed_candidates(&candidates).await?;

        let selected = mmr_select(
            &doc_embedding,
            &candidate_embeddings,
            options.top_k,
            options.diversity,
        );

        let mut keywords: Vec<ScoredKeyword> = selected
            .into_iter()
            .map(|(idx, relevance)| ScoredKeyword {
                phrase: candidates[idx].clone(),
                relevance,
            })
            .collect();
        keywords.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(keywords)
    }

    fn name(&self) -> &str {
        "keybert"
    }
}

/// Greedy Maximal Marginal Relevance selection
///
/// Returns `(candidate index, similarity to document)` in selection order.
pub fn mmr_select(
    doc: &[f32],
    candidates: &[Vec<f32>],
    top_k: usize,
    diversity: f32,
) -> Vec<(usize, f32)> {
    if candidates.is_empty() || top_k == 0 {
        return Vec::new();
    }

    let doc_sim: Vec<f32> = candidates.iter().map(|c| cosine_similarity(c, doc)).collect();

    let first = doc_sim
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut selected = vec![first];
    let mut remaining: Vec<usize> = (0..candidates.len()).filter(|&i| i != first).collect();

    while selected.len() < top_k && !remaining.is_empty() {
        let mut best_pos = 0;
        let mut best_score = f32::MIN;

        for (pos, &idx) in remaining.iter().enumerate() {
            let redundancy = selected
                .iter()
                .map(|&s| cosine_similarity(&candidates[idx], &candidates[s]))
                .fold(f32::MIN, f32::max);
            let score = (1.0 - diversity) * doc_sim[idx] - diversity * redundancy;

            if score > best_score {
                best_score = score;
                best_pos = pos;
            }
        }

        selected.push(remaining.remove(best_pos));
    }

    selected.into_iter().map(|i| (i, doc_sim[i])).collect()
}
