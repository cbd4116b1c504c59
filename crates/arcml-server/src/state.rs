//! Shared application state

use arcml_analysis::{
    BatchSettings, CommentStore, HealthProbe, JobRegistry, JobSettings, KeywordBatcher,
    SentimentBatcher, WorkspaceAnalysisJob,
};
use arcml_core::Result;
use arcml_models::ModelCache;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Service version reported by the info and health endpoints
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// State cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub models: Arc<ModelCache>,
    pub store: Arc<dyn CommentStore>,
    pub batch: BatchSettings,
    pub jobs: JobRegistry,
    pub probe: HealthProbe,
    /// Prometheus renderer; absent when no recorder was installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(
        models: Arc<ModelCache>,
        store: Arc<dyn CommentStore>,
        batch: BatchSettings,
        jobs: JobSettings,
        environment: impl Into<String>,
    ) -> Self {
        let probe = HealthProbe::new(models.clone(), store.clone(), SERVICE_VERSION, environment);
        Self {
            models,
            store,
            batch,
            jobs: JobRegistry::new(jobs),
            probe,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Fails with `ModelNotLoaded` when the classifier is missing
    pub fn sentiment_batcher(&self) -> Result<SentimentBatcher> {
        Ok(SentimentBatcher::new(self.models.sentiment()?, self.batch))
    }

    pub fn keyword_batcher(&self) -> Result<KeywordBatcher> {
        Ok(KeywordBatcher::new(self.models.keywords()?))
    }

    pub fn workspace_job(&self) -> Result<WorkspaceAnalysisJob> {
        Ok(WorkspaceAnalysisJob::new(
            self.store.clone(),
            self.sentiment_batcher()?,
            self.keyword_batcher()?,
        ))
    }
}
