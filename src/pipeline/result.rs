use serde::{Deserialize, Serialize};
use std::fmt;

use crate::arbiter::{ComparisonOutcome, Verdict};
use crate::explainer::WordInfluence;

/// Rescale a confidence to 0-100. Values at or below `1.0` are treated as a
/// 0-1 probability; anything already above stays put.
pub fn normalize_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        return 0.0;
    }
    let scaled = if confidence <= 1.0 {
        confidence * 100.0
    } else {
        confidence
    };
    scaled.clamp(0.0, 100.0)
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Provenance of the narrative fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionSource {
    #[default]
    #[serde(rename = "ML_ONLY")]
    MlOnly,
    #[serde(rename = "ML_GEMINI")]
    MlGemini,
}

impl DecisionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionSource::MlOnly => "ML_ONLY",
            DecisionSource::MlGemini => "ML_GEMINI",
        }
    }
}

impl fmt::Display for DecisionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator states, in order. Every run ends in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineStage {
    Start,
    MetricsStarted,
    Classified,
    MetricsStopped,
    VerificationDecided,
    Explained,
    Arbitrated,
    Persisted,
    Done,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Start => "START",
            PipelineStage::MetricsStarted => "METRICS_STARTED",
            PipelineStage::Classified => "CLASSIFIED",
            PipelineStage::MetricsStopped => "METRICS_STOPPED",
            PipelineStage::VerificationDecided => "VERIFICATION_DECIDED",
            PipelineStage::Explained => "EXPLAINED",
            PipelineStage::Arbitrated => "ARBITRATED",
            PipelineStage::Persisted => "PERSISTED",
            PipelineStage::Done => "DONE",
        };
        f.write_str(name)
    }
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub prediction_label: Option<Verdict>,
    /// 0-100.
    pub confidence_score: f64,
    pub summary: Option<String>,
    pub explanation: Option<String>,
    pub confidence_explanation: Option<String>,
    pub verification_triggered: bool,
    pub decision_source: DecisionSource,
    pub processing_time_ms: f64,
    pub cpu_usage_percent: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub word_influences: Vec<WordInfluence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation_markup: Option<String>,
    /// Set by [`XaiPipeline::process_arbitrated`](super::XaiPipeline::process_arbitrated).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparison: Option<ComparisonOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight_id: Option<i64>,
    pub error: Option<String>,
}

/// Caller-facing shape of a [`ClassificationResult`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayResult {
    pub prediction_label: Option<Verdict>,
    pub confidence_score: f64,
    pub confidence_percent: String,
    pub summary: Option<String>,
    pub explanation: Option<String>,
    pub confidence_explanation: Option<String>,
    pub verification_triggered: bool,
    pub decision_source: DecisionSource,
    pub processing_time_ms: f64,
    pub cpu_usage_percent: f64,
    pub error: Option<String>,
}

/// Round numbers for display and render the confidence as a percentage.
pub fn format_for_display(result: &ClassificationResult) -> DisplayResult {
    DisplayResult {
        prediction_label: result.prediction_label,
        confidence_score: round2(result.confidence_score),
        confidence_percent: format!("{:.1}%", result.confidence_score),
        summary: result.summary.clone(),
        explanation: result.explanation.clone(),
        confidence_explanation: result.confidence_explanation.clone(),
        verification_triggered: result.verification_triggered,
        decision_source: result.decision_source,
        processing_time_ms: round2(result.processing_time_ms),
        cpu_usage_percent: round2(result.cpu_usage_percent),
        error: result.error.clone(),
    }
}
