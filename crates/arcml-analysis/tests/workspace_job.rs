//! Workspace analysis job and registry supervision

mod common;

use arcml_analysis::{
    BatchSettings, CommentQuery, CommentStore, HealthProbe, HealthStatus, JobRegistry,
    JobSettings, JobStatus, KeywordBatcher, SentimentBatcher, WorkspaceAnalysisJob,
};
use arcml_core::{Error, Sentiment};
use arcml_models::{ModelCache, SequenceClassifier};
use common::{InMemoryCommentStore, MockClassifier, MockEncoder, MockKeywordModel};
use std::sync::Arc;
use std::time::Duration;

fn job_with(store: Arc<InMemoryCommentStore>, classifier: Arc<dyn SequenceClassifier>) -> WorkspaceAnalysisJob {
    WorkspaceAnalysisJob::new(
        store,
        SentimentBatcher::new(classifier, BatchSettings::default()),
        KeywordBatcher::new(Arc::new(MockKeywordModel::new())),
    )
}

fn query(workspace_id: &str) -> CommentQuery {
    CommentQuery {
        workspace_id: workspace_id.to_string(),
        platform: None,
        limit: 1000,
    }
}

#[tokio::test]
async fn test_job_updates_every_comment() {
    let store = Arc::new(InMemoryCommentStore::new());
    store.seed("ws1", 5);
    let job = job_with(store.clone(), Arc::new(MockClassifier::new()));

    let comments = store.fetch_unprocessed(&query("ws1")).await.unwrap();
    let report = job.run(&comments).await;

    assert_eq!(report.attempted, 5);
    assert_eq!(report.updated, 5);
    assert_eq!(report.failed, 0);

    let stored = store.get("c0").unwrap();
    assert_eq!(stored.sentiment, Some(Sentiment::Positive));
    assert!(!stored.topic_tags.is_empty());
    let meta = stored.meta.unwrap();
    assert_eq!(meta["ml_version"], "1.0.0");
    assert!((meta["sentiment_confidence"].as_f64().unwrap() - 0.9).abs() < 1e-6);
}

#[tokio::test]
async fn test_second_run_finds_nothing() {
    let store = Arc::new(InMemoryCommentStore::new());
    store.seed("ws1", 4);
    let job = job_with(store.clone(), Arc::new(MockClassifier::new()));
    let registry = JobRegistry::new(JobSettings::default());

    let first = registry.enqueue(&job, &query("ws1")).await.unwrap();
    assert_eq!(first.queued_count, 4);
    let status = registry.wait(&first.job_id.unwrap()).await.unwrap();
    assert_eq!(status, JobStatus::Completed { updated: 4, failed: 0 });
    assert_eq!(store.unprocessed_count("ws1"), 0);

    let second = registry.enqueue(&job, &query("ws1")).await.unwrap();
    assert_eq!(second.queued_count, 0);
    assert!(second.job_id.is_none());
    assert_eq!(store.update_calls(), 4);
}

#[tokio::test]
async fn test_single_update_failure_is_isolated() {
    let store = Arc::new(InMemoryCommentStore::new());
    store.seed("ws1", 5);
    store.fail_updates_for("c2");
    let job = job_with(store.clone(), Arc::new(MockClassifier::new()));

    let comments = store.fetch_unprocessed(&query("ws1")).await.unwrap();
    let report = job.run(&comments).await;

    assert_eq!(report.attempted, 5);
    assert_eq!(report.updated, 4);
    assert_eq!(report.failed, 1);
    assert_eq!(store.unprocessed_count("ws1"), 1);
    assert!(store.get("c2").unwrap().sentiment.is_none());
    for id in ["c0", "c1", "c3", "c4"] {
        assert!(store.get(id).unwrap().sentiment.is_some(), "{id} not updated");
    }
}

#[tokio::test]
async fn test_fetch_filters() {
    let store = Arc::new(InMemoryCommentStore::new());
    store.insert("old", "ws1", "youtube", "an older comment here");
    store.insert("short", "ws1", "youtube", "tiny");
    store.insert("ig", "ws1", "instagram", "instagram comment text");
    store.insert("other", "ws2", "youtube", "another workspace comment");
    store.insert("new", "ws1", "youtube", "the newest comment here");

    let all = store.fetch_unprocessed(&query("ws1")).await.unwrap();
    let ids: Vec<&str> = all.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["new", "ig", "old"]);

    let youtube = store
        .fetch_unprocessed(&CommentQuery {
            platform: Some("youtube".to_string()),
            limit: 1,
            ..query("ws1")
        })
        .await
        .unwrap();
    assert_eq!(youtube.len(), 1);
    assert_eq!(youtube[0].id, "new");
}

#[tokio::test]
async fn test_enqueue_without_comments_spawns_nothing() {
    let store = Arc::new(InMemoryCommentStore::new());
    let job = job_with(store, Arc::new(MockClassifier::new()));
    let registry = JobRegistry::new(JobSettings::default());

    let outcome = registry.enqueue(&job, &query("empty")).await.unwrap();

    assert_eq!(outcome.queued_count, 0);
    assert!(outcome.job_id.is_none());
    assert!(registry.list().is_empty());
}

#[tokio::test]
async fn test_enqueue_surfaces_storage_errors() {
    let store = Arc::new(InMemoryCommentStore::new());
    store.set_healthy(false);
    let job = job_with(store, Arc::new(MockClassifier::new()));
    let registry = JobRegistry::new(JobSettings::default());

    let result = registry.enqueue(&job, &query("ws1")).await;
    assert!(matches!(result, Err(Error::Storage(_))));
}

#[tokio::test]
async fn test_panicking_job_is_recorded() {
    let store = Arc::new(InMemoryCommentStore::new());
    store.seed("ws1", 2);
    store.panic_on_update();
    let job = job_with(store, Arc::new(MockClassifier::new()));
    let registry = JobRegistry::new(JobSettings::default());

    let outcome = registry.enqueue(&job, &query("ws1")).await.unwrap();
    let id = outcome.job_id.unwrap();
    let status = registry.wait(&id).await.unwrap();

    match status {
        JobStatus::Failed { reason } => assert!(reason.contains("store exploded")),
        other => panic!("expected failure, got {other:?}"),
    }
    let record = registry.get(&id).unwrap();
    assert!(record.finished_at.is_some());
    assert_eq!(record.comment_count, 2);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_is_recorded() {
    let store = Arc::new(InMemoryCommentStore::new());
    store.seed("ws1", 3);
    let classifier = Arc::new(MockClassifier::new().with_latency(Duration::from_secs(30)));
    let job = job_with(store.clone(), classifier);
    let registry = JobRegistry::new(JobSettings {
        timeout_secs: Some(1),
        ..Default::default()
    });

    let outcome = registry.enqueue(&job, &query("ws1")).await.unwrap();
    let status = registry.wait(&outcome.job_id.unwrap()).await.unwrap();

    assert_eq!(
        status,
        JobStatus::Failed {
            reason: "timed out".to_string()
        }
    );
    assert_eq!(store.unprocessed_count("ws1"), 3);
}

#[tokio::test]
async fn test_history_is_bounded() {
    let store = Arc::new(InMemoryCommentStore::new());
    let job = job_with(store.clone(), Arc::new(MockClassifier::new()));
    let registry = JobRegistry::new(JobSettings {
        history_capacity: 2,
        ..Default::default()
    });

    for round in 0..4 {
        store.insert(&format!("r{round}"), "ws1", "youtube", "a comment long enough");
        let outcome = registry.enqueue(&job, &query("ws1")).await.unwrap();
        registry.wait(&outcome.job_id.unwrap()).await.unwrap();
    }

    assert_eq!(registry.list().len(), 2);
    assert_eq!(registry.running_count(), 0);
}

#[tokio::test]
async fn test_wait_unknown_job() {
    let registry = JobRegistry::new(JobSettings::default());
    assert!(registry.wait(&uuid::Uuid::new_v4()).await.is_none());
}

#[tokio::test]
async fn test_health_probe() {
    let store = Arc::new(InMemoryCommentStore::new());
    let models = Arc::new(
        ModelCache::builder()
            .sentiment(Arc::new(MockClassifier::new()))
            .embeddings(Arc::new(MockEncoder::new()))
            .keywords_from_embeddings()
            .unwrap()
            .build(),
    );
    let probe = HealthProbe::new(models, store.clone(), "1.0.0", "test");

    let report = probe.check().await;
    assert_eq!(report.status, HealthStatus::Healthy);
    assert!(report.checks.models.loaded_models.values().all(|l| *l));
    assert!(probe.readiness().await.is_ok());

    store.set_healthy(false);
    let report = probe.check().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert!(report.checks.database.error.is_some());
    assert!(matches!(probe.readiness().await, Err(Error::NotReady(_))));
}

#[tokio::test]
async fn test_health_probe_without_models() {
    let store = Arc::new(InMemoryCommentStore::new());
    let probe = HealthProbe::new(Arc::new(ModelCache::default()), store, "1.0.0", "test");

    let report = probe.check().await;
    assert_eq!(report.status, HealthStatus::Unhealthy);
    assert_eq!(report.checks.models.status, HealthStatus::Unhealthy);
    assert!(matches!(probe.readiness().await, Err(Error::NotReady(_))));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["checks"]["models"]["loaded_models"]["sentiment"], false);
    assert!(json["checks"]["system"]["cpu_percent"].is_number());
}
