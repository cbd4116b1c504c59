//! Arc ML Server
//!
//! HTTP surface over the batch analysis pipeline: synchronous sentiment and
//! keyword endpoints, background workspace analysis, and health probes.

pub mod api;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::{AppConfig, ConfigOverrides};
pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
