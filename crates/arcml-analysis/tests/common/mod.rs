//! Mock models and an in-memory comment store for testing
//!
//! Provides configurable implementations of the model and storage traits
//! with call counters and failure injection.

#![allow(dead_code)]

use arcml_analysis::{CommentAnalysis, CommentQuery, CommentStore, PendingComment};
use arcml_core::{Error, LabelScore, Result, Sentiment};
use arcml_models::{KeywordModel, KeywordOptions, ScoredKeyword, SequenceClassifier, TextEncoder};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

/// A configurable mock sentiment classifier
///
/// Scores follow the text: "love"/"great" read positive, "terrible"/"hate"
/// read negative, anything else neutral. Every call records the texts it saw.
pub struct MockClassifier {
    name: String,
    labels: Vec<String>,
    confidence: f32,
    simulated_latency: Option<Duration>,
    drop_last_result: bool,
    call_count: AtomicU32,
    seen: Mutex<Vec<Vec<String>>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self {
            name: "mock-sentiment".to_string(),
            labels: vec![
                "negative".to_string(),
                "neutral".to_string(),
                "positive".to_string(),
            ],
            confidence: 0.9,
            simulated_latency: None,
            drop_last_result: false,
            call_count: AtomicU32::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Emit labels under different names, in negative/neutral/positive order
    pub fn with_labels(mut self, labels: [&str; 3]) -> Self {
        self.labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Score given to the winning label
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = Some(latency);
        self
    }

    /// Return one result fewer than requested
    pub fn dropping_last_result(mut self) -> Self {
        self.drop_last_result = true;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Texts of every call, in call order
    pub fn seen_batches(&self) -> Vec<Vec<String>> {
        self.seen.lock().clone()
    }

    fn winner(text: &str) -> usize {
        let lower = text.to_lowercase();
        if lower.contains("love") || lower.contains("great") {
            2
        } else if lower.contains("terrible") || lower.contains("hate") {
            0
        } else {
            1
        }
    }
}

#[async_trait]
impl SequenceClassifier for MockClassifier {
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Vec<LabelScore>>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.seen.lock().push(texts.to_vec());

        if let Some(latency) = self.simulated_latency {
            tokio::time::sleep(latency).await;
        }

        let rest = (1.0 - self.confidence) / 2.0;
        let mut results: Vec<Vec<LabelScore>> = texts
            .iter()
            .map(|text| {
                let winner = Self::winner(text);
                self.labels
                    .iter()
                    .enumerate()
                    .map(|(idx, label)| {
                        let score = if idx == winner { self.confidence } else { rest };
                        LabelScore::new(label.clone(), score)
                    })
                    .collect()
            })
            .collect();

        if self.drop_last_result {
            results.pop();
        }
        Ok(results)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}

/// A classifier that fails on selected calls - for testing fallback paths
pub struct FailingClassifier {
    fail_on_call: Option<u32>,
    call_count: AtomicU32,
    inner: MockClassifier,
}

impl FailingClassifier {
    /// Fail every call
    pub fn new() -> Self {
        Self {
            fail_on_call: None,
            call_count: AtomicU32::new(0),
            inner: MockClassifier::new(),
        }
    }

    /// Fail only the n-th call (0-based); others behave like [`MockClassifier`]
    pub fn on_call(n: u32) -> Self {
        Self {
            fail_on_call: Some(n),
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SequenceClassifier for FailingClassifier {
    async fn classify_batch(&self, texts: &[String]) -> Result<Vec<Vec<LabelScore>>> {
        let call = self.call_count.fetch_add(1, Ordering::Relaxed);
        match self.fail_on_call {
            Some(n) if n != call => self.inner.classify_batch(texts).await,
            _ => Err(Error::inference("simulated inference failure")),
        }
    }

    fn name(&self) -> &str {
        "failing"
    }

    fn labels(&self) -> &[String] {
        self.inner.labels()
    }
}

/// Encoder embedding a text as its letter histogram, so shared letters mean similarity
pub struct MockEncoder {
    call_count: AtomicU32,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self {
            call_count: AtomicU32::new(0),
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TextEncoder for MockEncoder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        Ok(texts
            .iter()
            .map(|t| {
                let mut v = vec![0.0f32; 26];
                for c in t.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
                    v[(c as u8 - b'a') as usize] += 1.0;
                }
                v
            })
            .collect())
    }

    fn name(&self) -> &str {
        "mock-encoder"
    }
}

/// Keyword model that records calls and optionally fails
pub struct MockKeywordModel {
    fail: bool,
    call_count: AtomicU32,
}

impl MockKeywordModel {
    pub fn new() -> Self {
        Self {
            fail: false,
            call_count: AtomicU32::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl KeywordModel for MockKeywordModel {
    async fn extract(&self, text: &str, options: &KeywordOptions) -> Result<Vec<ScoredKeyword>> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        if self.fail {
            return Err(Error::inference("simulated extraction failure"));
        }
        Ok(text
            .split_whitespace()
            .filter(|w| w.len() > 3)
            .take(options.top_k)
            .map(|w| ScoredKeyword {
                phrase: w.to_lowercase(),
                relevance: 0.5,
            })
            .collect())
    }

    fn name(&self) -> &str {
        "mock-keywords"
    }
}

/// A stored comment with its analysis columns
#[derive(Debug, Clone)]
pub struct StoredComment {
    pub id: String,
    pub workspace_id: String,
    pub platform: String,
    pub text: String,
    pub sentiment: Option<Sentiment>,
    pub topic_tags: Vec<String>,
    pub meta: Option<serde_json::Value>,
}

/// In-memory [`CommentStore`] with per-id failure injection
///
/// Comments are returned newest first, i.e. in reverse insertion order.
pub struct InMemoryCommentStore {
    comments: Mutex<Vec<StoredComment>>,
    failing_ids: Mutex<HashSet<String>>,
    panic_on_update: AtomicBool,
    healthy: AtomicBool,
    update_calls: AtomicU32,
}

impl InMemoryCommentStore {
    pub fn new() -> Self {
        Self {
            comments: Mutex::new(Vec::new()),
            failing_ids: Mutex::new(HashSet::new()),
            panic_on_update: AtomicBool::new(false),
            healthy: AtomicBool::new(true),
            update_calls: AtomicU32::new(0),
        }
    }

    pub fn insert(&self, id: &str, workspace_id: &str, platform: &str, text: &str) {
        self.comments.lock().push(StoredComment {
            id: id.to_string(),
            workspace_id: workspace_id.to_string(),
            platform: platform.to_string(),
            text: text.to_string(),
            sentiment: None,
            topic_tags: Vec::new(),
            meta: None,
        });
    }

    /// Seed `n` analyzable comments in one workspace
    pub fn seed(&self, workspace_id: &str, n: usize) {
        for i in 0..n {
            self.insert(
                &format!("c{i}"),
                workspace_id,
                "youtube",
                &format!("comment number {i}: I love this video so much"),
            );
        }
    }

    pub fn fail_updates_for(&self, id: &str) {
        self.failing_ids.lock().insert(id.to_string());
    }

    pub fn panic_on_update(&self) {
        self.panic_on_update.store(true, Ordering::Relaxed);
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn update_calls(&self) -> u32 {
        self.update_calls.load(Ordering::Relaxed)
    }

    pub fn get(&self, id: &str) -> Option<StoredComment> {
        self.comments.lock().iter().find(|c| c.id == id).cloned()
    }

    pub fn unprocessed_count(&self, workspace_id: &str) -> usize {
        self.comments
            .lock()
            .iter()
            .filter(|c| c.workspace_id == workspace_id && c.sentiment.is_none())
            .count()
    }
}

#[async_trait]
impl CommentStore for InMemoryCommentStore {
    async fn fetch_unprocessed(&self, query: &CommentQuery) -> Result<Vec<PendingComment>> {
        if !self.healthy.load(Ordering::Relaxed) {
            return Err(Error::storage("connection refused"));
        }

        Ok(self
            .comments
            .lock()
            .iter()
            .rev()
            .filter(|c| c.workspace_id == query.workspace_id)
            .filter(|c| c.sentiment.is_none())
            .filter(|c| c.text.chars().count() > 10)
            .filter(|c| query.platform.as_ref().map_or(true, |p| *p == c.platform))
            .take(query.limit as usize)
            .map(|c| PendingComment {
                id: c.id.clone(),
                text: c.text.clone(),
                platform: Some(c.platform.clone()),
                content_item_id: None,
            })
            .collect())
    }

    async fn update_analysis(&self, analysis: &CommentAnalysis) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::Relaxed);

        if self.panic_on_update.load(Ordering::Relaxed) {
            panic!("store exploded");
        }
        if self.failing_ids.lock().contains(&analysis.comment_id) {
            return Err(Error::storage(format!(
                "simulated write failure for {}",
                analysis.comment_id
            )));
        }

        let mut comments = self.comments.lock();
        let comment = comments
            .iter_mut()
            .find(|c| c.id == analysis.comment_id)
            .ok_or_else(|| Error::storage("comment not found"))?;
        comment.sentiment = Some(analysis.sentiment);
        comment.topic_tags = analysis.topic_tags.clone();
        comment.meta = Some(analysis.meta_json());
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        if self.healthy.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(Error::storage("connection refused"))
        }
    }
}
