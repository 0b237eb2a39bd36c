//! At-most-once insight delivery.
//!
//! Every insight gets exactly one write attempt. When it fails the insight
//! is handed to the [`DeadLetterLog`] and dropped; losing it is accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::{InsightStore, NewInsight};
use crate::config::{PersistMode, PipelineConfig};
use crate::error::StorageError;

/// `tracing` target for insights that could not be stored.
pub const DEAD_LETTER_TARGET: &str = "news_xai::dead_letter";

/// One insight that failed to persist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetter {
    pub id: Uuid,
    pub failed_at: DateTime<Utc>,
    pub error: String,
    pub insight: NewInsight,
}

/// Sink for failed writes: a warning event and, optionally, a JSON-lines file.
#[derive(Debug, Clone, Default)]
pub struct DeadLetterLog {
    path: Option<PathBuf>,
}

impl DeadLetterLog {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }

    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    /// Record a failed insight. Never fails; file problems are only logged.
    pub async fn record(&self, insight: NewInsight, cause: &StorageError) {
        let letter = DeadLetter {
            id: Uuid::new_v4(),
            failed_at: Utc::now(),
            error: cause.to_string(),
            insight,
        };

        warn!(
            target: DEAD_LETTER_TARGET,
            dead_letter_id = %letter.id,
            user_id = ?letter.insight.user_id,
            label = %letter.insight.prediction_label,
            error = %letter.error,
            "Insight dropped after failed write"
        );

        if let Some(path) = &self.path {
            if let Err(e) = append_line(path, &letter).await {
                error!(
                    target: DEAD_LETTER_TARGET,
                    path = %path.display(),
                    error = %e,
                    "Failed to append dead letter"
                );
            }
        }
    }
}

async fn append_line(path: &Path, letter: &DeadLetter) -> std::io::Result<()> {
    let mut line = serde_json::to_string(letter)?;
    line.push('\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

/// Hands finished insights to an [`InsightStore`].
#[derive(Clone)]
pub struct InsightWriter {
    store: Arc<dyn InsightStore>,
    mode: PersistMode,
    dead_letters: DeadLetterLog,
}

impl InsightWriter {
    pub fn new(store: Arc<dyn InsightStore>, mode: PersistMode, dead_letters: DeadLetterLog) -> Self {
        Self {
            store,
            mode,
            dead_letters,
        }
    }

    pub fn from_config(store: Arc<dyn InsightStore>, config: &PipelineConfig) -> Self {
        Self::new(
            store,
            config.persist_mode,
            DeadLetterLog::new(config.dead_letter_path.clone()),
        )
    }

    pub fn mode(&self) -> PersistMode {
        self.mode
    }

    /// Deliver one insight.
    ///
    /// Inline mode returns the new row id, or `None` when the write failed.
    /// Detached mode always returns `None`; the write happens in the background.
    pub async fn submit(&self, insight: NewInsight) -> Option<i64> {
        match self.mode {
            PersistMode::Inline => {
                Self::write_once(self.store.as_ref(), &self.dead_letters, insight).await
            }
            PersistMode::Detached => {
                let store = Arc::clone(&self.store);
                let dead_letters = self.dead_letters.clone();
                tokio::spawn(async move {
                    Self::write_once(store.as_ref(), &dead_letters, insight).await;
                });
                None
            }
        }
    }

    async fn write_once(
        store: &dyn InsightStore,
        dead_letters: &DeadLetterLog,
        insight: NewInsight,
    ) -> Option<i64> {
        match store.save_insight(&insight).await {
            Ok(id) => {
                debug!(insight_id = id, "Insight persisted");
                Some(id)
            }
            Err(e) => {
                dead_letters.record(insight, &e).await;
                None
            }
        }
    }
}
