//! Background workspace analysis and the registry that supervises it

use crate::keywords::KeywordBatcher;
use crate::sentiment::SentimentBatcher;
use crate::store::{CommentAnalysis, CommentQuery, CommentStore, PendingComment};
use arcml_core::{Result, TextItem};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Keyphrases stored per comment
pub const JOB_KEYWORD_TOP_K: usize = 5;

/// Counters of one job run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub attempted: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Analyzes a list of comments and writes each result back
///
/// A failed write is logged and skipped; the comment keeps its null
/// sentiment and is selected again by the next run.
#[derive(Clone)]
pub struct WorkspaceAnalysisJob {
    store: Arc<dyn CommentStore>,
    sentiment: SentimentBatcher,
    keywords: KeywordBatcher,
}

impl WorkspaceAnalysisJob {
    pub fn new(
        store: Arc<dyn CommentStore>,
        sentiment: SentimentBatcher,
        keywords: KeywordBatcher,
    ) -> Self {
        Self {
            store,
            sentiment,
            keywords,
        }
    }

    pub fn store(&self) -> &Arc<dyn CommentStore> {
        &self.store
    }

    pub async fn run(&self, comments: &[PendingComment]) -> JobReport {
        info!("Processing {} comments in background", comments.len());

        let items: Vec<TextItem> = comments
            .iter()
            .map(|c| TextItem::new(c.text.clone()).with_id(c.id.clone()))
            .collect();

        let sentiments = self.sentiment.analyze(&items).await;
        let keywords = self.keywords.extract(&items, JOB_KEYWORD_TOP_K).await;

        let mut report = JobReport::default();
        for ((comment, sentiment), keyword_set) in comments.iter().zip(sentiments).zip(keywords) {
            report.attempted += 1;

            let analysis = CommentAnalysis {
                comment_id: comment.id.clone(),
                sentiment: sentiment.sentiment,
                confidence: sentiment.confidence,
                topic_tags: keyword_set.keywords,
                processed_at: Utc::now(),
            };

            match self.store.update_analysis(&analysis).await {
                Ok(()) => {
                    report.updated += 1;
                    metrics::counter!("arcml_comment_updates_total", "outcome" => "updated")
                        .increment(1);
                }
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("arcml_comment_updates_total", "outcome" => "failed")
                        .increment(1);
                    error!("Failed to update comment {}: {}", comment.id, e);
                }
            }
        }

        info!(
            "Processed {} comments ({} updated, {} failed)",
            report.attempted, report.updated, report.failed
        );
        report
    }
}

/// Lifecycle state of a background job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed { updated: usize, failed: usize },
    Failed { reason: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }

    fn outcome(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Observable record of one enqueued job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub workspace_id: String,
    pub comment_count: usize,
    pub status: JobStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Result of an enqueue request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueOutcome {
    /// Set when a job was spawned
    pub job_id: Option<Uuid>,
    /// Comments handed to the job
    pub queued_count: usize,
}

/// Registry limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobSettings {
    /// Abort a job after this many seconds; unset means no limit
    pub timeout_secs: Option<u64>,

    /// Finished records kept for status queries
    pub history_capacity: usize,
}

impl Default for JobSettings {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            history_capacity: 256,
        }
    }
}

struct JobEntry {
    record: JobRecord,
    status_tx: watch::Sender<JobStatus>,
}

struct RegistryInner {
    jobs: RwLock<HashMap<Uuid, JobEntry>>,
    settings: JobSettings,
}

/// Spawns workspace jobs and tracks their outcome
///
/// Each job runs on its own task; a supervisor awaits the task handle so
/// panics and timeouts are recorded as `Failed` instead of being lost.
#[derive(Clone)]
pub struct JobRegistry {
    inner: Arc<RegistryInner>,
}

impl JobRegistry {
    pub fn new(settings: JobSettings) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                jobs: RwLock::new(HashMap::new()),
                settings,
            }),
        }
    }

    /// Fetch unprocessed comments and spawn a job for them
    ///
    /// Nothing is spawned when the workspace has no eligible comments.
    /// Storage errors are returned to the caller.
    pub async fn enqueue(
        &self,
        job: &WorkspaceAnalysisJob,
        query: &CommentQuery,
    ) -> Result<EnqueueOutcome> {
        info!("Starting workspace analysis for {}", query.workspace_id);

        let comments = job.store().fetch_unprocessed(query).await?;
        if comments.is_empty() {
            return Ok(EnqueueOutcome {
                job_id: None,
                queued_count: 0,
            });
        }

        let queued_count = comments.len();
        let id = self.spawn(job.clone(), query.workspace_id.clone(), comments);

        Ok(EnqueueOutcome {
            job_id: Some(id),
            queued_count,
        })
    }

    fn spawn(
        &self,
        job: WorkspaceAnalysisJob,
        workspace_id: String,
        comments: Vec<PendingComment>,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let (status_tx, _) = watch::channel(JobStatus::Running);

        self.inner.jobs.write().insert(
            id,
            JobEntry {
                record: JobRecord {
                    id,
                    workspace_id,
                    comment_count: comments.len(),
                    status: JobStatus::Running,
                    started_at: Utc::now(),
                    finished_at: None,
                },
                status_tx,
            },
        );

        let timeout = self.inner.settings.timeout_secs.map(Duration::from_secs);
        let handle = tokio::spawn(async move {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, job.run(&comments)).await.ok(),
                None => Some(job.run(&comments).await),
            }
        });

        let registry = self.clone();
        tokio::spawn(async move {
            let status = match handle.await {
                Ok(Some(report)) => JobStatus::Completed {
                    updated: report.updated,
                    failed: report.failed,
                },
                Ok(None) => JobStatus::Failed {
                    reason: "timed out".to_string(),
                },
                Err(e) if e.is_panic() => JobStatus::Failed {
                    reason: format!("panicked: {}", panic_message(e.into_panic())),
                },
                Err(e) => JobStatus::Failed {
                    reason: format!("cancelled: {e}"),
                },
            };
            registry.finish(id, status);
        });

        id
    }

    fn finish(&self, id: Uuid, status: JobStatus) {
        match &status {
            JobStatus::Failed { reason } => warn!("Analysis job {} failed: {}", id, reason),
            _ => info!("Analysis job {} finished", id),
        }
        metrics::counter!("arcml_jobs_total", "outcome" => status.outcome()).increment(1);

        let mut jobs = self.inner.jobs.write();
        if let Some(entry) = jobs.get_mut(&id) {
            entry.record.status = status.clone();
            entry.record.finished_at = Some(Utc::now());
            entry.status_tx.send_replace(status);
        }
        evict_finished(&mut jobs, self.inner.settings.history_capacity);
    }

    pub fn get(&self, id: &Uuid) -> Option<JobRecord> {
        self.inner.jobs.read().get(id).map(|e| e.record.clone())
    }

    /// All known jobs, newest first
    pub fn list(&self) -> Vec<JobRecord> {
        let mut records: Vec<JobRecord> = self
            .inner
            .jobs
            .read()
            .values()
            .map(|e| e.record.clone())
            .collect();
        records.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        records
    }

    pub fn running_count(&self) -> usize {
        self.inner
            .jobs
            .read()
            .values()
            .filter(|e| !e.record.status.is_terminal())
            .count()
    }

    /// Wait until a job reaches a terminal state
    ///
    /// Returns `None` for unknown (or already evicted) ids.
    pub async fn wait(&self, id: &Uuid) -> Option<JobStatus> {
        let mut rx = {
            let jobs = self.inner.jobs.read();
            jobs.get(id)?.status_tx.subscribe()
        };

        let status = rx.wait_for(|s| s.is_terminal()).await.ok()?.clone();
        Some(status)
    }
}

fn evict_finished(jobs: &mut HashMap<Uuid, JobEntry>, capacity: usize) {
    let mut finished: Vec<(DateTime<Utc>, Uuid)> = jobs
        .values()
        .filter_map(|e| e.record.finished_at.map(|t| (t, e.record.id)))
        .collect();

    if finished.len() <= capacity {
        return;
    }

    finished.sort();
    let excess = finished.len() - capacity;
    for (_, id) in finished.into_iter().take(excess) {
        jobs.remove(&id);
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
