//! # News XAI
//!
//! Fake-news classification with a second opinion and an explanation.
//!
//! A local classifier labels an article `real` or `fake`. A generative
//! verification oracle (Gemini) is consulted for a verdict of its own and,
//! when the local model is unsure, for a narrative explanation. A
//! perturbation explainer ranks the words that pushed the prediction.
//! Finished results can be stored as insights in SQLite.
//!
//! ## Architecture
//!
//! ```text
//! text → XaiPipeline ─┬─ MetricsTracker
//!                     ├─ LocalClassifier ── model server (HTTP)
//!                     ├─ VerificationOracle ── Gemini (HTTP)
//!                     ├─ Explainer
//!                     └─ InsightWriter ── SQLite
//!      → ComparisonArbiter (local verdict vs oracle verdict)
//! ```
//!
//! Nothing past the pipeline boundary fails: oracle, model, and storage
//! problems become sentinel values plus a log event.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use news_xai::{ClassifyService, Config, SqliteStorage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let storage = Arc::new(SqliteStorage::new(&config.database).await?);
//!     let service = ClassifyService::from_config(&config, Some(storage))?;
//!     let response = service.classify("Breaking: Earth is flat", Some(5), false).await?;
//!     println!("{:?}", response.final_displayed_result);
//!     Ok(())
//! }
//! ```

/// Verdict arbitration between the local model and the oracle.
pub mod arbiter;
/// Local classifier adapters.
pub mod classifier;
/// Command-line interface.
pub mod cli;
/// Configuration management.
pub mod config;
/// Error types and result aliases.
pub mod error;
/// Word-level attribution.
pub mod explainer;
/// Gemini verification oracle.
pub mod gemini;
/// Timing and CPU sampling.
pub mod metrics;
/// Request orchestrator.
pub mod pipeline;
/// Oracle prompts.
pub mod prompts;
/// Request-facing composition.
pub mod service;
/// Insight persistence.
pub mod storage;

pub use arbiter::{ComparisonArbiter, ComparisonOutcome, ComparisonStatus, Verdict};
pub use classifier::{LocalClassifier, Prediction};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use explainer::{Explainer, PerturbationExplainer};
pub use gemini::{GeminiClient, OracleExt, VerificationOracle};
pub use metrics::MetricsTracker;
pub use pipeline::{ClassificationResult, XaiPipeline};
pub use service::ClassifyService;
pub use storage::{InsightStore, InsightWriter, SqliteStorage};
