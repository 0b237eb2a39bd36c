//! Request orchestrator.
//!
//! One [`XaiPipeline::process`] call walks
//! `START → METRICS_STARTED → CLASSIFIED → METRICS_STOPPED →
//! VERIFICATION_DECIDED → EXPLAINED → PERSISTED → DONE` and always returns a
//! [`ClassificationResult`]. [`XaiPipeline::process_arbitrated`] adds
//! `ARBITRATED` before `PERSISTED` so the stored insight carries the verdict
//! the caller is shown. Failures show up in `error` or as missing
//! enrichment, never as an `Err`.

mod result;

pub use result::{
    format_for_display, normalize_confidence, ClassificationResult, DecisionSource,
    DisplayResult, PipelineStage,
};

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::arbiter::{ComparisonArbiter, Verdict};
use crate::classifier::LocalClassifier;
use crate::config::PipelineConfig;
use crate::error::ClassifierError;
use crate::explainer::Explainer;
use crate::gemini::{NarrativeExplanation, OracleExt, VerificationOracle};
use crate::metrics::MetricsTracker;
use crate::storage::{InsightWriter, NewInsight};

/// Sequences classifier, oracle narrative, attribution, and persistence.
///
/// Holds no per-request state; share it freely between tasks.
#[derive(Clone)]
pub struct XaiPipeline {
    classifier: LocalClassifier,
    oracle: Option<Arc<dyn VerificationOracle>>,
    explainer: Option<Arc<dyn Explainer>>,
    writer: Option<InsightWriter>,
    verification_threshold: f64,
}

impl XaiPipeline {
    pub fn new(classifier: LocalClassifier, config: &PipelineConfig) -> Self {
        Self {
            classifier,
            oracle: None,
            explainer: None,
            writer: None,
            verification_threshold: config.verification_threshold,
        }
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn VerificationOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_explainer(mut self, explainer: Arc<dyn Explainer>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    pub fn with_insight_writer(mut self, writer: InsightWriter) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn classifier(&self) -> &LocalClassifier {
        &self.classifier
    }

    pub fn oracle(&self) -> Option<&Arc<dyn VerificationOracle>> {
        self.oracle.as_ref()
    }

    pub fn explainer(&self) -> Option<&Arc<dyn Explainer>> {
        self.explainer.as_ref()
    }

    /// Narrative verification runs only with an oracle and a confidence (0-100)
    /// below the threshold.
    pub fn should_verify(&self, confidence: f64) -> bool {
        self.oracle.is_some() && confidence < self.verification_threshold
    }

    /// Run one request through every stage.
    pub async fn process(&self, article_text: &str, user_id: Option<i64>) -> ClassificationResult {
        self.run(article_text, user_id, None).await
    }

    /// Like [`process`](Self::process), with the local verdict compared
    /// against the oracle before the insight is written. The outcome lands
    /// in `comparison`.
    pub async fn process_arbitrated(
        &self,
        article_text: &str,
        user_id: Option<i64>,
        arbiter: &ComparisonArbiter,
    ) -> ClassificationResult {
        self.run(article_text, user_id, Some(arbiter)).await
    }

    async fn run(
        &self,
        article_text: &str,
        user_id: Option<i64>,
        arbiter: Option<&ComparisonArbiter>,
    ) -> ClassificationResult {
        let mut result = ClassificationResult::default();
        enter(PipelineStage::Start);

        let mut tracker = MetricsTracker::new();
        tracker.start();
        enter(PipelineStage::MetricsStarted);

        let prediction = self.classifier.try_predict(article_text).await;
        enter(PipelineStage::Classified);

        tracker.stop();
        let metrics = tracker.snapshot();
        result.processing_time_ms = metrics.processing_time_ms;
        result.cpu_usage_percent = metrics.cpu_usage_percent;
        enter(PipelineStage::MetricsStopped);

        let top = match prediction {
            Ok(top) => top,
            Err(e) => {
                match &e {
                    ClassifierError::ModelUnavailable => {
                        warn!(classifier = %self.classifier.name(), "No local model loaded")
                    }
                    _ => warn!(error = %e, "Local classification failed"),
                }
                result.error = Some(e.to_string());
                if let Some(arbiter) = arbiter {
                    result.comparison = Some(arbiter.compare(article_text, None, 0.0).await);
                    enter(PipelineStage::Arbitrated);
                }
                enter(PipelineStage::Done);
                return result;
            }
        };

        let label = Verdict::from_model_label(&top.label);
        result.prediction_label = Some(label);
        result.confidence_score = normalize_confidence(top.score);

        result.verification_triggered = self.should_verify(result.confidence_score);
        enter(PipelineStage::VerificationDecided);

        if result.verification_triggered {
            if let Some(narrative) = self.narrative(article_text).await {
                result.summary = Some(narrative.summary);
                result.explanation = Some(narrative.explanation);
                result.confidence_explanation = Some(narrative.confidence_note);
                result.decision_source = DecisionSource::MlGemini;
            }
        }

        if let Some(explainer) = &self.explainer {
            let attribution = explainer.explain(article_text, &self.classifier).await;
            result.word_influences = attribution.influences;
            result.explanation_markup = attribution.markup;
        }
        enter(PipelineStage::Explained);

        if let Some(arbiter) = arbiter {
            let outcome = arbiter
                .compare(
                    article_text,
                    Some(label.as_str()),
                    result.confidence_score / 100.0,
                )
                .await;
            result.comparison = Some(outcome);
            enter(PipelineStage::Arbitrated);
        }

        if let (Some(user_id), Some(writer)) = (user_id, &self.writer) {
            let mut insight =
                NewInsight::from_probability(article_text, label.as_str(), top.score)
                    .with_user(user_id)
                    .with_narrative(
                        result.summary.clone(),
                        result.explanation.clone(),
                        result.confidence_explanation.clone(),
                    )
                    .with_verification(
                        result.verification_triggered,
                        result.decision_source.as_str(),
                    )
                    .with_metrics(metrics);
            if let Some(outcome) = &result.comparison {
                insight = insight.with_comparison(outcome);
            }
            result.insight_id = writer.submit(insight).await;
            enter(PipelineStage::Persisted);
        }

        info!(
            label = %label,
            confidence = result.confidence_score,
            source = %result.decision_source,
            verification = result.verification_triggered,
            "Classification complete"
        );
        enter(PipelineStage::Done);
        result
    }

    async fn narrative(&self, article_text: &str) -> Option<NarrativeExplanation> {
        let oracle = self.oracle.as_ref()?;
        let analysis = oracle.analyze(article_text).await?;
        Some(NarrativeExplanation::from_analysis(&analysis))
    }
}

fn enter(stage: PipelineStage) {
    debug!(stage = %stage, "Pipeline stage");
}
