//! Storage layer for classification insights.
//!
//! Insights are append-only: this crate writes and reads them but never
//! updates or deletes a row.

mod sqlite;
mod writer;


pub use sqlite::SqliteStorage;
pub use writer::{DeadLetter, DeadLetterLog, InsightWriter, DEAD_LETTER_TARGET};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::arbiter::ComparisonOutcome;
use crate::error::StorageResult;
use crate::metrics::PerformanceMetrics;
use crate::pipeline::normalize_confidence;

/// Default page size for a single user's history.
pub const USER_INSIGHTS_LIMIT: i64 = 50;
/// Default page size for the administrative listing.
pub const ALL_INSIGHTS_LIMIT: i64 = 100;
/// Characters of article text kept in the administrative listing.
pub const PREVIEW_CHARS: usize = 100;

/// An insight about to be written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInsight {
    /// Caller identity; `None` for anonymous requests.
    pub user_id: Option<i64>,
    pub article_text: String,
    pub prediction_label: String,
    /// 0-100, written as-is.
    pub confidence_score: f64,
    pub summary: Option<String>,
    pub explanation: Option<String>,
    pub confidence_explanation: Option<String>,
    pub verification_triggered: bool,
    pub decision_source: String,
    pub processing_time_ms: f64,
    pub cpu_usage_percent: f64,
    /// Oracle verdict from arbitration (`real`, `fake` or `ERROR`).
    pub gemini_result: Option<String>,
    /// Verdict the caller was shown.
    pub final_displayed_result: Option<String>,
    pub comparison_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewInsight {
    /// Start an insight with a 0-100 `confidence`.
    pub fn new(
        article_text: impl Into<String>,
        prediction_label: impl Into<String>,
        confidence: f64,
    ) -> Self {
        Self {
            user_id: None,
            article_text: article_text.into(),
            prediction_label: prediction_label.into(),
            confidence_score: confidence,
            summary: None,
            explanation: None,
            confidence_explanation: None,
            verification_triggered: false,
            decision_source: "ML_ONLY".to_string(),
            processing_time_ms: 0.0,
            cpu_usage_percent: 0.0,
            gemini_result: None,
            final_displayed_result: None,
            comparison_status: None,
            created_at: Utc::now(),
        }
    }

    /// Start an insight from a raw model score, scaled to 0-100 once here.
    pub fn from_probability(
        article_text: impl Into<String>,
        prediction_label: impl Into<String>,
        probability: f64,
    ) -> Self {
        Self::new(article_text, prediction_label, normalize_confidence(probability))
    }

    pub fn with_user(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_narrative(
        mut self,
        summary: Option<String>,
        explanation: Option<String>,
        confidence_explanation: Option<String>,
    ) -> Self {
        self.summary = summary;
        self.explanation = explanation;
        self.confidence_explanation = confidence_explanation;
        self
    }

    pub fn with_verification(mut self, triggered: bool, decision_source: impl Into<String>) -> Self {
        self.verification_triggered = triggered;
        self.decision_source = decision_source.into();
        self
    }

    pub fn with_metrics(mut self, metrics: PerformanceMetrics) -> Self {
        self.processing_time_ms = metrics.processing_time_ms;
        self.cpu_usage_percent = metrics.cpu_usage_percent;
        self
    }

    /// Record how arbitration resolved the verdict.
    pub fn with_comparison(mut self, outcome: &ComparisonOutcome) -> Self {
        self.gemini_result = outcome.gemini_result.map(|verdict| verdict.to_string());
        self.final_displayed_result = outcome
            .final_displayed_result
            .map(|verdict| verdict.as_str().to_string());
        self.comparison_status = Some(outcome.comparison_status.to_string());
        self
    }
}

/// A stored insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,
    pub article_text: String,
    pub prediction_label: String,
    pub confidence_score: f64,
    pub summary: Option<String>,
    pub explanation: Option<String>,
    pub confidence_explanation: Option<String>,
    pub verification_triggered: bool,
    pub decision_source: String,
    pub processing_time_ms: Option<f64>,
    pub cpu_usage_percent: Option<f64>,
    pub gemini_result: Option<String>,
    pub final_displayed_result: Option<String>,
    pub comparison_status: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Insight {
    /// Same insight with the article text cut to a short preview.
    pub fn into_preview(mut self) -> Self {
        self.article_text = preview(&self.article_text);
        self
    }
}

/// `text` cut to [`PREVIEW_CHARS`] characters plus `...` when longer.
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Aggregates over every stored insight. All zero on an empty store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightAnalytics {
    pub total_classifications: i64,
    pub avg_confidence: f64,
    pub avg_processing_time_ms: f64,
    pub avg_cpu_usage_percent: f64,
    pub fake_count: i64,
    pub real_count: i64,
    pub verification_count: i64,
    /// Percentage of `fake` verdicts, two decimals.
    pub fake_ratio: f64,
}

impl InsightAnalytics {
    /// Derive `fake_ratio` from the counts.
    pub fn with_fake_ratio(mut self) -> Self {
        self.fake_ratio = if self.total_classifications > 0 {
            let ratio = self.fake_count as f64 / self.total_classifications as f64 * 100.0;
            (ratio * 100.0).round() / 100.0
        } else {
            0.0
        };
        self
    }
}

/// Durable home for insights.
#[async_trait]
pub trait InsightStore: Send + Sync {
    /// Write one insight and return its id.
    async fn save_insight(&self, insight: &NewInsight) -> StorageResult<i64>;
    /// Fetch one insight by id.
    async fn get_insight(&self, id: i64) -> StorageResult<Option<Insight>>;
    /// A user's insights, newest first.
    async fn user_insights(&self, user_id: i64, limit: i64) -> StorageResult<Vec<Insight>>;
    /// Every user's insights, newest first, with previewed article text.
    async fn all_insights(&self, limit: i64) -> StorageResult<Vec<Insight>>;
    /// Dashboard aggregates.
    async fn analytics(&self) -> StorageResult<InsightAnalytics>;
}
