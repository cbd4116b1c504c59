//! Liveness, readiness and the aggregate health report

use crate::store::CommentStore;
use crate::system::{ResourceUsage, SystemSampler};
use arcml_core::{Error, Result};
use arcml_models::{ModelCache, ModelName};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatabaseCheck {
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelsCheck {
    pub status: HealthStatus,
    pub loaded_models: BTreeMap<&'static str, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemCheck {
    pub status: HealthStatus,
    #[serde(flatten)]
    pub usage: ResourceUsage,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthChecks {
    pub database: DatabaseCheck,
    pub models: ModelsCheck,
    pub system: SystemCheck,
}

/// Aggregate health; `healthy` iff storage and models both pass
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub environment: String,
    pub checks: HealthChecks,
}

/// Runs the health checks against the live model cache and store
#[derive(Clone)]
pub struct HealthProbe {
    models: Arc<ModelCache>,
    store: Arc<dyn CommentStore>,
    sampler: Arc<SystemSampler>,
    version: String,
    environment: String,
}

impl HealthProbe {
    pub fn new(
        models: Arc<ModelCache>,
        store: Arc<dyn CommentStore>,
        version: impl Into<String>,
        environment: impl Into<String>,
    ) -> Self {
        Self {
            models,
            store,
            sampler: Arc::new(SystemSampler::new()),
            version: version.into(),
            environment: environment.into(),
        }
    }

    pub async fn check(&self) -> HealthReport {
        let database = self.check_database().await;
        let models = self.check_models();
        let system = SystemCheck {
            status: HealthStatus::Healthy,
            usage: self.sampler.sample(),
        };

        let status = if database.status == HealthStatus::Healthy
            && models.status == HealthStatus::Healthy
        {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport {
            status,
            timestamp: Utc::now(),
            version: self.version.clone(),
            environment: self.environment.clone(),
            checks: HealthChecks {
                database,
                models,
                system,
            },
        }
    }

    /// Ready iff every model is loaded and storage answers
    pub async fn readiness(&self) -> Result<()> {
        let result: Result<()> = async {
            for name in ModelName::ALL {
                self.models.get(name.as_str())?;
            }
            self.store.ping().await
        }
        .await;

        result.map_err(|e| {
            error!("Readiness check failed: {}", e);
            Error::not_ready(e.to_string())
        })
    }

    async fn check_database(&self) -> DatabaseCheck {
        let start = Instant::now();
        match self.store.ping().await {
            Ok(()) => DatabaseCheck {
                status: HealthStatus::Healthy,
                response_time_ms: Some(start.elapsed().as_millis() as u64),
                error: None,
            },
            Err(e) => DatabaseCheck {
                status: HealthStatus::Unhealthy,
                response_time_ms: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn check_models(&self) -> ModelsCheck {
        let loaded = self.models.loaded_models();
        let loaded_models: BTreeMap<&'static str, bool> = ModelName::ALL
            .iter()
            .map(|name| (name.as_str(), loaded.contains(&name.as_str())))
            .collect();

        let missing = ModelName::ALL
            .iter()
            .find(|name| !loaded.contains(&name.as_str()));

        ModelsCheck {
            status: if missing.is_none() {
                HealthStatus::Healthy
            } else {
                HealthStatus::Unhealthy
            },
            loaded_models,
            error: missing.map(|name| Error::model_not_loaded(name.as_str()).to_string()),
        }
    }
}
