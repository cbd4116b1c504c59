//! Comment storage: the query/update contract and its Postgres implementation

use arcml_core::{Error, Result, Sentiment};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Version stamped into every comment's analysis metadata
pub const ML_VERSION: &str = "1.0.0";

/// Selection of unprocessed comments for one workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentQuery {
    pub workspace_id: String,
    pub platform: Option<String>,
    pub limit: u32,
}

/// A comment awaiting analysis
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PendingComment {
    pub id: String,
    pub text: String,
    pub platform: Option<String>,
    pub content_item_id: Option<String>,
}

/// Analysis results written back to one comment
#[derive(Debug, Clone, PartialEq)]
pub struct CommentAnalysis {
    pub comment_id: String,
    pub sentiment: Sentiment,
    pub confidence: f32,
    pub topic_tags: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

impl CommentAnalysis {
    /// Metadata document stored alongside the sentiment
    pub fn meta_json(&self) -> serde_json::Value {
        serde_json::json!({
            "sentiment_confidence": self.confidence,
            "processed_at": self.processed_at.to_rfc3339(),
            "ml_version": ML_VERSION,
        })
    }
}

/// Storage consumed by the workspace analysis job and the health probe
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Newest-first comments of a workspace whose sentiment is still null
    async fn fetch_unprocessed(&self, query: &CommentQuery) -> Result<Vec<PendingComment>>;

    /// Persist one comment's analysis
    async fn update_analysis(&self, analysis: &CommentAnalysis) -> Result<()>;

    /// Round-trip check
    async fn ping(&self) -> Result<()>;
}

/// Postgres connection settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection acquisition timeout (get connection from pool)
    pub acquire_timeout_secs: u64,
    /// Type the sentiment parameter is cast to on update, when the column is
    /// a database enum rather than text
    pub sentiment_type: Option<String>,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("sentiment_type", &self.sentiment_type)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/arc".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 10,
            sentiment_type: None,
        }
    }
}

const FETCH_BASE: &str = "SELECT c.id::text AS id, c.text, c.platform::text AS platform, \
     c.content_item_id::text AS content_item_id \
     FROM comments c \
     JOIN content_items ci ON c.content_item_id = ci.id \
     JOIN channels ch ON ci.channel_id = ch.id \
     WHERE ch.workspace_id = $1 \
     AND c.sentiment IS NULL \
     AND LENGTH(c.text) > 10";

/// Build the selection statement; placeholders are numbered by filter presence
pub fn fetch_sql(with_platform: bool) -> String {
    if with_platform {
        format!("{FETCH_BASE} AND c.platform::text = $2 ORDER BY c.created_at DESC LIMIT $3")
    } else {
        format!("{FETCH_BASE} ORDER BY c.created_at DESC LIMIT $2")
    }
}

/// Build the update statement, casting the sentiment to `sentiment_type` when set
pub fn update_sql(sentiment_type: Option<&str>) -> String {
    let sentiment = match sentiment_type {
        Some(ty) => format!("$2::{ty}"),
        None => "$2".to_string(),
    };
    format!(
        "UPDATE comments SET sentiment = {sentiment}, topic_tags = $3, meta_json = $4, \
         updated_at = NOW() WHERE id = $1"
    )
}

fn is_type_name(name: &str) -> bool {
    let unquoted = name.trim_matches('"');
    !unquoted.is_empty()
        && unquoted
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// [`CommentStore`] backed by a bounded sqlx pool
#[derive(Clone)]
pub struct PgCommentStore {
    pool: PgPool,
    update_sql: String,
}

impl PgCommentStore {
    /// Build the pool without connecting; connections open on first use
    pub fn connect_lazy(config: &DbConfig) -> Result<Self> {
        if let Some(ty) = config.sentiment_type.as_deref() {
            if !is_type_name(ty) {
                return Err(Error::config(format!("Invalid sentiment_type '{ty}'")));
            }
        }

        let options = PgConnectOptions::from_str(&config.url)
            .map_err(|e| Error::config(format!("Invalid database URL: {e}")))?
            .application_name("arcml");

        info!(
            "Creating database pool (max={}, min={}, acquire_timeout={}s)",
            config.max_connections, config.min_connections, config.acquire_timeout_secs
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_lazy_with(options);

        Ok(Self::from_pool(pool, config.sentiment_type.as_deref()))
    }

    pub fn from_pool(pool: PgPool, sentiment_type: Option<&str>) -> Self {
        Self {
            pool,
            update_sql: update_sql(sentiment_type),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

#[async_trait]
impl CommentStore for PgCommentStore {
    async fn fetch_unprocessed(&self, query: &CommentQuery) -> Result<Vec<PendingComment>> {
        let sql = fetch_sql(query.platform.is_some());
        let mut statement = sqlx::query_as::<_, PendingComment>(&sql).bind(&query.workspace_id);
        if let Some(platform) = &query.platform {
            statement = statement.bind(platform);
        }

        let rows = statement
            .bind(i64::from(query.limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| Error::storage(format!("Failed to fetch comments: {e}")))?;

        debug!(
            "Fetched {} unprocessed comments for workspace {}",
            rows.len(),
            query.workspace_id
        );
        Ok(rows)
    }

    async fn update_analysis(&self, analysis: &CommentAnalysis) -> Result<()> {
        let result = sqlx::query(&self.update_sql)
            .bind(&analysis.comment_id)
            .bind(analysis.sentiment.as_str())
            .bind(&analysis.topic_tags)
            .bind(analysis.meta_json())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage(format!("Failed to update comment: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(Error::storage(format!(
                "Comment {} not found",
                analysis.comment_id
            )));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| Error::storage(format!("Database ping failed: {e}")))
    }
}
