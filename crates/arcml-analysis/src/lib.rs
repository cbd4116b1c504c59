//! Arc ML Analysis
//!
//! Batch sentiment and keyword analysis over comment text, and the
//! background workspace scan that writes results back to storage.
//!
//! Every batch operation degrades instead of failing: inference errors
//! become neutral or empty results, and a failed comment update never stops
//! the rest of a workspace job.

pub mod health;
pub mod job;
pub mod keywords;
pub mod sentiment;
pub mod store;
pub mod system;

pub use health::{HealthProbe, HealthReport, HealthStatus};
pub use job::{
    EnqueueOutcome, JobRecord, JobRegistry, JobReport, JobSettings, JobStatus,
    WorkspaceAnalysisJob, JOB_KEYWORD_TOP_K,
};
pub use keywords::{KeywordBatcher, MIN_KEYWORD_TEXT_CHARS};
pub use sentiment::{truncate_chars, BatchSettings, SentimentBatcher};
pub use store::{
    CommentAnalysis, CommentQuery, CommentStore, DbConfig, PendingComment, PgCommentStore,
};
pub use system::{ResourceUsage, SystemSampler};
