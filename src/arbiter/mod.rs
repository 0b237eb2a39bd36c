//! Verdict arbitration between the local model and the oracle.
//!
//! | local | oracle | status   | displayed |
//! |-------|--------|----------|-----------|
//! | real  | real   | matched  | real      |
//! | fake  | fake   | matched  | fake      |
//! | real  | fake   | conflict | fake      |
//! | fake  | real   | conflict | real      |
//!
//! Anything else (no oracle, oracle failure, unresolvable label on either
//! side) is `model_only` and shows the local label.

mod verdict;

pub use verdict::{normalize_label, OracleVerdict, Verdict};

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::gemini::VerificationOracle;

/// How the displayed verdict was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    Matched,
    Conflict,
    ModelOnly,
}

impl std::fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComparisonStatus::Matched => write!(f, "matched"),
            ComparisonStatus::Conflict => write!(f, "conflict"),
            ComparisonStatus::ModelOnly => write!(f, "model_only"),
        }
    }
}

/// Oracle bookkeeping attached to every comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingDetails {
    pub gemini_available: bool,
    pub gemini_error: Option<String>,
    pub processing_time_ms: f64,
}

/// Result of one dual-verdict comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    pub model_result: Option<String>,
    pub model_confidence: f64,
    pub gemini_result: Option<OracleVerdict>,
    pub final_displayed_result: Option<Verdict>,
    pub comparison_status: ComparisonStatus,
    pub processing_details: ProcessingDetails,
}

impl ComparisonOutcome {
    pub(crate) fn model_only(local_label: Option<&str>, local_confidence: f64, gemini_available: bool) -> Self {
        Self {
            model_result: local_label.map(str::to_string),
            model_confidence: local_confidence,
            gemini_result: None,
            final_displayed_result: local_label.map(Verdict::from_model_label),
            comparison_status: ComparisonStatus::ModelOnly,
            processing_details: ProcessingDetails {
                gemini_available,
                gemini_error: None,
                processing_time_ms: 0.0,
            },
        }
    }

    fn oracle_failed(&mut self, message: String) {
        self.gemini_result = Some(OracleVerdict::Error);
        self.comparison_status = ComparisonStatus::ModelOnly;
        self.processing_details.gemini_error = Some(message);
    }
}

/// Precedence rule for two resolved verdicts: agreement keeps the local
/// verdict, disagreement takes the oracle's.
pub fn arbitrate(local: Verdict, oracle: Verdict) -> (Verdict, ComparisonStatus) {
    if local == oracle {
        (local, ComparisonStatus::Matched)
    } else {
        (oracle, ComparisonStatus::Conflict)
    }
}

/// Combines the local classifier's verdict with the oracle's.
#[derive(Clone)]
pub struct ComparisonArbiter {
    oracle: Option<Arc<dyn VerificationOracle>>,
}

impl ComparisonArbiter {
    /// Create an arbiter; `None` means every comparison is `model_only`.
    pub fn new(oracle: Option<Arc<dyn VerificationOracle>>) -> Self {
        Self { oracle }
    }

    pub fn is_oracle_available(&self) -> bool {
        self.oracle.is_some()
    }

    /// Compare a local prediction against the oracle's verdict for the same article.
    ///
    /// Never fails; oracle problems surface as `gemini_result = ERROR` with
    /// the reason in `processing_details.gemini_error`.
    pub async fn compare(
        &self,
        article_text: &str,
        local_label: Option<&str>,
        local_confidence: f64,
    ) -> ComparisonOutcome {
        let start = Instant::now();
        let mut outcome =
            ComparisonOutcome::model_only(local_label, local_confidence, self.oracle.is_some());

        let Some(oracle) = &self.oracle else {
            info!("Oracle not configured, using local model result only");
            outcome.processing_details.processing_time_ms = elapsed_ms(start);
            return outcome;
        };

        match oracle.verify(article_text).await {
            Ok(analysis) => match normalize_label(&analysis.verdict) {
                Some(oracle_verdict) => {
                    outcome.gemini_result = Some(oracle_verdict.into());

                    match local_label.and_then(normalize_label) {
                        Some(local_verdict) => {
                            let (displayed, status) = arbitrate(local_verdict, oracle_verdict);
                            if status == ComparisonStatus::Conflict {
                                info!(
                                    local = %local_verdict,
                                    oracle = %oracle_verdict,
                                    "Classification conflict, using oracle verdict"
                                );
                            }
                            outcome.final_displayed_result = Some(displayed);
                            outcome.comparison_status = status;
                        }
                        None => {
                            warn!(
                                local = ?local_label,
                                "Local label unresolvable, keeping model-only result"
                            );
                        }
                    }
                }
                None => {
                    outcome.oracle_failed(format!("unrecognized verdict: {:?}", analysis.verdict));
                }
            },
            Err(e) => {
                error!(error = %e, "Oracle verification failed");
                outcome.oracle_failed(e.to_string());
            }
        }

        outcome.processing_details.processing_time_ms = elapsed_ms(start);
        outcome
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
