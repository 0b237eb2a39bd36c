use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use super::{Insight, InsightAnalytics, InsightStore, NewInsight};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const INSIGHT_COLUMNS: &str = "id, user_id, article_text, prediction_label, confidence_score, \
     summary, explanation, confidence_explanation, verification_triggered, decision_source, \
     processing_time_ms, cpu_usage_percent, gemini_result, final_displayed_result, \
     comparison_status, created_at";

/// SQLite-backed insight storage
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl InsightStore for SqliteStorage {
    async fn save_insight(&self, insight: &NewInsight) -> StorageResult<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO classification_insights (
                user_id, article_text, prediction_label, confidence_score,
                summary, explanation, confidence_explanation,
                verification_triggered, decision_source,
                processing_time_ms, cpu_usage_percent,
                gemini_result, final_displayed_result, comparison_status, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(insight.user_id)
        .bind(&insight.article_text)
        .bind(&insight.prediction_label)
        .bind(insight.confidence_score)
        .bind(&insight.summary)
        .bind(&insight.explanation)
        .bind(&insight.confidence_explanation)
        .bind(insight.verification_triggered)
        .bind(&insight.decision_source)
        .bind(insight.processing_time_ms)
        .bind(insight.cpu_usage_percent)
        .bind(&insight.gemini_result)
        .bind(&insight.final_displayed_result)
        .bind(&insight.comparison_status)
        .bind(insight.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!(insight_id = id, user_id = ?insight.user_id, "Insight saved");
        Ok(id)
    }

    async fn get_insight(&self, id: i64) -> StorageResult<Option<Insight>> {
        let row: Option<InsightRow> = sqlx::query_as(&format!(
            "SELECT {} FROM classification_insights WHERE id = ?",
            INSIGHT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn user_insights(&self, user_id: i64, limit: i64) -> StorageResult<Vec<Insight>> {
        let rows: Vec<InsightRow> = sqlx::query_as(&format!(
            "SELECT {} FROM classification_insights WHERE user_id = ? \
             ORDER BY created_at DESC, id DESC LIMIT ?",
            INSIGHT_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn all_insights(&self, limit: i64) -> StorageResult<Vec<Insight>> {
        let rows: Vec<InsightRow> = sqlx::query_as(&format!(
            "SELECT {} FROM classification_insights ORDER BY created_at DESC, id DESC LIMIT ?",
            INSIGHT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Insight::from(row).into_preview())
            .collect())
    }

    async fn analytics(&self) -> StorageResult<InsightAnalytics> {
        let row: AnalyticsRow = sqlx::query_as(
            r#"
            SELECT
                COUNT(*) AS total_classifications,
                COALESCE(AVG(confidence_score), 0.0) AS avg_confidence,
                COALESCE(AVG(processing_time_ms), 0.0) AS avg_processing_time_ms,
                COALESCE(AVG(cpu_usage_percent), 0.0) AS avg_cpu_usage_percent,
                COALESCE(SUM(CASE WHEN prediction_label = 'fake' THEN 1 ELSE 0 END), 0) AS fake_count,
                COALESCE(SUM(CASE WHEN prediction_label = 'real' THEN 1 ELSE 0 END), 0) AS real_count,
                COALESCE(SUM(CASE WHEN verification_triggered THEN 1 ELSE 0 END), 0) AS verification_count
            FROM classification_insights
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(InsightAnalytics {
            total_classifications: row.total_classifications,
            avg_confidence: row.avg_confidence,
            avg_processing_time_ms: row.avg_processing_time_ms,
            avg_cpu_usage_percent: row.avg_cpu_usage_percent,
            fake_count: row.fake_count,
            real_count: row.real_count,
            verification_count: row.verification_count,
            fake_ratio: 0.0,
        }
        .with_fake_ratio())
    }
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct InsightRow {
    id: i64,
    user_id: Option<i64>,
    article_text: String,
    prediction_label: String,
    confidence_score: f64,
    summary: Option<String>,
    explanation: Option<String>,
    confidence_explanation: Option<String>,
    verification_triggered: bool,
    decision_source: String,
    processing_time_ms: Option<f64>,
    cpu_usage_percent: Option<f64>,
    gemini_result: Option<String>,
    final_displayed_result: Option<String>,
    comparison_status: Option<String>,
    created_at: String,
}

impl From<InsightRow> for Insight {
    fn from(row: InsightRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            article_text: row.article_text,
            prediction_label: row.prediction_label,
            confidence_score: row.confidence_score,
            summary: row.summary,
            explanation: row.explanation,
            confidence_explanation: row.confidence_explanation,
            verification_triggered: row.verification_triggered,
            decision_source: row.decision_source,
            processing_time_ms: row.processing_time_ms,
            cpu_usage_percent: row.cpu_usage_percent,
            gemini_result: row.gemini_result,
            final_displayed_result: row.final_displayed_result,
            comparison_status: row.comparison_status,
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}

#[derive(sqlx::FromRow)]
struct AnalyticsRow {
    total_classifications: i64,
    avg_confidence: f64,
    avg_processing_time_ms: f64,
    avg_cpu_usage_percent: f64,
    fake_count: i64,
    real_count: i64,
    verification_count: i64,
}
