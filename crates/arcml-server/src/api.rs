//! Request and response bodies for the HTTP API
//!
//! Request types carry their own constraint checks, run before any model or
//! storage work.

use arcml_analysis::{CommentQuery, JobRecord, JobStatus};
use arcml_core::{KeywordSet, Sentiment, SentimentOutcome, TextItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

pub const MAX_TEXT_CHARS: usize = 2000;
pub const MAX_SENTIMENT_TEXTS: usize = 1000;
pub const MAX_TOPIC_TEXTS: usize = 500;
pub const MAX_TOP_K: usize = 20;
pub const DEFAULT_TOP_K: usize = 5;
pub const MAX_WORKSPACE_LIMIT: u32 = 5000;
pub const DEFAULT_WORKSPACE_LIMIT: u32 = 1000;

/// Constraint checks applied after deserialization
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

fn validate_texts(texts: &[TextItem], max_items: usize) -> Result<(), AppError> {
    if texts.is_empty() {
        return Err(AppError::validation("texts: at least 1 item is required"));
    }
    if texts.len() > max_items {
        return Err(AppError::validation(format!(
            "texts: at most {} items are allowed, got {}",
            max_items,
            texts.len()
        )));
    }
    for (i, item) in texts.iter().enumerate() {
        let chars = item.text.chars().count();
        if chars == 0 {
            return Err(AppError::validation(format!("texts[{i}].text: must not be empty")));
        }
        if chars > MAX_TEXT_CHARS {
            return Err(AppError::validation(format!(
                "texts[{i}].text: at most {MAX_TEXT_CHARS} characters are allowed, got {chars}"
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentimentBatchRequest {
    pub texts: Vec<TextItem>,
}

impl Validate for SentimentBatchRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_texts(&self.texts, MAX_SENTIMENT_TEXTS)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SentimentResult {
    pub text: String,
    pub sentiment: Sentiment,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl From<SentimentOutcome> for SentimentResult {
    fn from(outcome: SentimentOutcome) -> Self {
        Self {
            text: outcome.text,
            sentiment: outcome.sentiment,
            confidence: outcome.confidence,
            id: outcome.external_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SentimentBatchResponse {
    pub results: Vec<SentimentResult>,
    pub processed_count: usize,
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopicExtractionRequest {
    pub texts: Vec<TextItem>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Validate for TopicExtractionRequest {
    fn validate(&self) -> Result<(), AppError> {
        validate_texts(&self.texts, MAX_TOPIC_TEXTS)?;
        if !(1..=MAX_TOP_K).contains(&self.top_k) {
            return Err(AppError::validation(format!(
                "top_k: must be between 1 and {MAX_TOP_K}, got {}",
                self.top_k
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TopicResult {
    pub text: String,
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl From<KeywordSet> for TopicResult {
    fn from(set: KeywordSet) -> Self {
        Self {
            text: set.text,
            keywords: set.keywords,
            id: set.external_id,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopicExtractionResponse {
    pub results: Vec<TopicResult>,
    pub processed_count: usize,
    pub processing_time_ms: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceAnalysisRequest {
    pub workspace_id: String,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default = "default_workspace_limit")]
    pub limit: u32,
}

fn default_workspace_limit() -> u32 {
    DEFAULT_WORKSPACE_LIMIT
}

impl Validate for WorkspaceAnalysisRequest {
    fn validate(&self) -> Result<(), AppError> {
        if !(1..=MAX_WORKSPACE_LIMIT).contains(&self.limit) {
            return Err(AppError::validation(format!(
                "limit: must be between 1 and {MAX_WORKSPACE_LIMIT}, got {}",
                self.limit
            )));
        }
        Ok(())
    }
}

impl WorkspaceAnalysisRequest {
    pub fn query(&self) -> CommentQuery {
        CommentQuery {
            workspace_id: self.workspace_id.clone(),
            platform: self.platform.clone(),
            limit: self.limit,
        }
    }
}

/// Enqueue acknowledgement
///
/// `comments_found` is set only when nothing was queued.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceAnalysisResponse {
    pub message: String,
    pub workspace_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments_to_process: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments_found: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<Uuid>,
}

impl WorkspaceAnalysisResponse {
    pub fn nothing_to_do(workspace_id: impl Into<String>) -> Self {
        Self {
            message: "No unprocessed comments found".to_string(),
            workspace_id: workspace_id.into(),
            comments_to_process: None,
            comments_found: Some(0),
            status: None,
            job_id: None,
        }
    }

    pub fn started(workspace_id: impl Into<String>, count: usize, job_id: Uuid) -> Self {
        Self {
            message: "Analysis started".to_string(),
            workspace_id: workspace_id.into(),
            comments_to_process: Some(count),
            comments_found: None,
            status: Some("processing".to_string()),
            job_id: Some(job_id),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobResponse {
    pub job_id: Uuid,
    pub workspace_id: String,
    pub comment_count: usize,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<JobRecord> for JobResponse {
    fn from(record: JobRecord) -> Self {
        Self {
            job_id: record.id,
            workspace_id: record.workspace_id,
            comment_count: record.comment_count,
            status: record.status,
            started_at: record.started_at,
            finished_at: record.finished_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceInfo {
    pub service: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub health: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(n: usize) -> Vec<TextItem> {
        (0..n).map(|i| TextItem::new(format!("text {i}"))).collect()
    }

    #[test]
    fn test_sentiment_request_bounds() {
        assert!(SentimentBatchRequest { texts: texts(1) }.validate().is_ok());
        assert!(SentimentBatchRequest { texts: texts(1000) }.validate().is_ok());
        assert!(SentimentBatchRequest { texts: vec![] }.validate().is_err());
        assert!(SentimentBatchRequest { texts: texts(1001) }.validate().is_err());
    }

    #[test]
    fn test_text_length_counts_characters() {
        let request = SentimentBatchRequest {
            texts: vec![TextItem::new("é".repeat(MAX_TEXT_CHARS))],
        };
        assert!(request.validate().is_ok());

        let request = SentimentBatchRequest {
            texts: vec![TextItem::new("a".repeat(MAX_TEXT_CHARS + 1))],
        };
        assert!(request.validate().is_err());

        let request = SentimentBatchRequest {
            texts: vec![TextItem::new("")],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_topic_request_defaults_and_bounds() {
        let request: TopicExtractionRequest =
            serde_json::from_str(r#"{"texts": [{"text": "hello there"}]}"#).unwrap();
        assert_eq!(request.top_k, 5);
        assert!(request.validate().is_ok());

        let request = TopicExtractionRequest { texts: texts(1), top_k: 21 };
        assert!(request.validate().is_err());
        let request = TopicExtractionRequest { texts: texts(1), top_k: 0 };
        assert!(request.validate().is_err());
        let request = TopicExtractionRequest { texts: texts(501), top_k: 5 };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_workspace_request_defaults_and_bounds() {
        let request: WorkspaceAnalysisRequest =
            serde_json::from_str(r#"{"workspace_id": "ws1"}"#).unwrap();
        assert_eq!(request.limit, 1000);
        assert_eq!(request.platform, None);
        assert!(request.validate().is_ok());

        let request = WorkspaceAnalysisRequest { limit: 5001, ..request };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_workspace_response_shapes() {
        let json = serde_json::to_value(WorkspaceAnalysisResponse::nothing_to_do("ws1")).unwrap();
        assert_eq!(json["comments_found"], 0);
        assert!(json.get("comments_to_process").is_none());
        assert!(json.get("job_id").is_none());

        let json =
            serde_json::to_value(WorkspaceAnalysisResponse::started("ws1", 7, Uuid::new_v4()))
                .unwrap();
        assert_eq!(json["comments_to_process"], 7);
        assert_eq!(json["status"], "processing");
        assert!(json.get("comments_found").is_none());
    }

    #[test]
    fn test_sentiment_result_drops_error_field() {
        let outcome = SentimentOutcome::fallback(&TextItem::new("x").with_id("a"), "boom");
        let json = serde_json::to_value(SentimentResult::from(outcome)).unwrap();
        assert_eq!(json["sentiment"], "NEU");
        assert_eq!(json["id"], "a");
        assert!(json.get("error").is_none());
    }
}
