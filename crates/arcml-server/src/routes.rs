//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use arcml_analysis::HealthReport;

use crate::api::{
    JobResponse, ProbeResponse, SentimentBatchRequest, SentimentBatchResponse, ServiceInfo,
    TopicExtractionRequest, TopicExtractionResponse, Validate, WorkspaceAnalysisRequest,
    WorkspaceAnalysisResponse,
};
use crate::config::CorsConfig;
use crate::error::AppError;
use crate::state::{AppState, SERVICE_VERSION};

pub fn create_router(state: AppState, cors: &CorsConfig) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/health/live", get(liveness))
        .route("/metrics", get(metrics))
        .route("/nlp/sentiment-batch", post(sentiment_batch))
        .route("/nlp/topics", post(topics))
        .route("/nlp/analyze-workspace", post(analyze_workspace))
        .route("/nlp/jobs/:job_id", get(job_status))
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors))
        .with_state(state)
}

fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .allow_credentials(true)
}

fn count_request(endpoint: &'static str) {
    metrics::counter!("arcml_requests_total", "endpoint" => endpoint).increment(1);
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Unwrap a JSON body and run its constraint checks
fn validated<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    let Json(request) = payload?;
    request.validate()?;
    Ok(request)
}

async fn service_info() -> Json<ServiceInfo> {
    count_request("root");
    Json(ServiceInfo {
        service: "Arc ML Service",
        version: SERVICE_VERSION,
        status: "running",
        health: "/health",
    })
}

async fn health(State(state): State<AppState>) -> Json<HealthReport> {
    count_request("health");
    Json(state.probe.check().await)
}

async fn readiness(State(state): State<AppState>) -> Result<Json<ProbeResponse>, AppError> {
    count_request("health_ready");
    state.probe.readiness().await?;
    Ok(Json(ProbeResponse {
        status: "ready",
        timestamp: None,
    }))
}

async fn liveness() -> Json<ProbeResponse> {
    Json(ProbeResponse {
        status: "alive",
        timestamp: Some(Utc::now()),
    })
}

async fn metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

async fn sentiment_batch(
    State(state): State<AppState>,
    payload: Result<Json<SentimentBatchRequest>, JsonRejection>,
) -> Result<Json<SentimentBatchResponse>, AppError> {
    count_request("sentiment_batch");
    let request = validated(payload)?;
    let start = Instant::now();

    let batcher = state.sentiment_batcher()?;
    let outcomes = batcher.analyze(&request.texts).await;

    let processing_time_ms = elapsed_ms(start);
    info!(
        "Processed {} texts for sentiment in {:.1}ms",
        outcomes.len(),
        processing_time_ms
    );

    Ok(Json(SentimentBatchResponse {
        processed_count: outcomes.len(),
        results: outcomes.into_iter().map(Into::into).collect(),
        processing_time_ms,
    }))
}

async fn topics(
    State(state): State<AppState>,
    payload: Result<Json<TopicExtractionRequest>, JsonRejection>,
) -> Result<Json<TopicExtractionResponse>, AppError> {
    count_request("topics");
    let request = validated(payload)?;
    let start = Instant::now();

    let batcher = state.keyword_batcher()?;
    let sets = batcher.extract(&request.texts, request.top_k).await;

    let processing_time_ms = elapsed_ms(start);
    info!(
        "Extracted keywords for {} texts in {:.1}ms",
        sets.len(),
        processing_time_ms
    );

    Ok(Json(TopicExtractionResponse {
        processed_count: sets.len(),
        results: sets.into_iter().map(Into::into).collect(),
        processing_time_ms,
    }))
}

async fn analyze_workspace(
    State(state): State<AppState>,
    payload: Result<Json<WorkspaceAnalysisRequest>, JsonRejection>,
) -> Result<Json<WorkspaceAnalysisResponse>, AppError> {
    count_request("analyze_workspace");
    let request = validated(payload)?;

    let job = state.workspace_job()?;
    let outcome = state.jobs.enqueue(&job, &request.query()).await?;

    let response = match outcome.job_id {
        Some(job_id) => {
            info!(
                "Queued {} comments from workspace {} as job {}",
                outcome.queued_count, request.workspace_id, job_id
            );
            WorkspaceAnalysisResponse::started(&request.workspace_id, outcome.queued_count, job_id)
        }
        None => {
            debug!("No unprocessed comments in workspace {}", request.workspace_id);
            WorkspaceAnalysisResponse::nothing_to_do(&request.workspace_id)
        }
    };
    Ok(Json(response))
}

async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobResponse>, AppError> {
    count_request("job_status");
    Uuid::parse_str(&job_id)
        .ok()
        .and_then(|id| state.jobs.get(&id))
        .map(|record| Json(record.into()))
        .ok_or_else(|| AppError::not_found(format!("Job {job_id} not found")))
}

async fn fallback() -> AppError {
    AppError::not_found("Not found")
}
