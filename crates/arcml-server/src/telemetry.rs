//! Logging and metrics setup

use anyhow::Result;
use arcml_models::{ModelCache, ModelName};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

/// Filter used when `RUST_LOG` is unset
fn default_directives(level: &str) -> String {
    format!("arcml={level},tower_http={level},hyper=warn,sqlx=warn,tokenizers=warn")
}

/// Initialize tracing/logging
///
/// `verbose` forces debug output for the service crates and ignores `RUST_LOG`.
pub fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new(default_directives("debug"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directives(&logging.level)))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer().pretty()).init(),
    }
}

/// Install the Prometheus recorder and describe the service metrics
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics: {}", e))?;

    metrics::describe_counter!("arcml_requests_total", "Requests handled by endpoint");
    metrics::describe_counter!(
        "arcml_texts_processed_total",
        "Texts run through the sentiment or keyword pipeline"
    );
    metrics::describe_counter!(
        "arcml_inference_fallbacks_total",
        "Texts that received the neutral fallback after an inference failure"
    );
    metrics::describe_counter!(
        "arcml_comment_updates_total",
        "Comment analysis writes by outcome"
    );
    metrics::describe_counter!("arcml_jobs_total", "Finished workspace jobs by outcome");
    metrics::describe_histogram!(
        "arcml_batch_latency_ms",
        metrics::Unit::Milliseconds,
        "Batch processing latency by pipeline"
    );
    metrics::describe_gauge!("arcml_model_loaded", "1 when the named model is loaded");

    info!("Metrics exporter initialized");
    Ok(handle)
}

/// Publish one `arcml_model_loaded` gauge per model
pub fn record_model_gauges(models: &ModelCache) {
    let loaded = models.loaded_models();
    for name in ModelName::ALL {
        let value = if loaded.contains(&name.as_str()) { 1.0 } else { 0.0 };
        metrics::gauge!("arcml_model_loaded", "model" => name.as_str()).set(value);
    }
}
