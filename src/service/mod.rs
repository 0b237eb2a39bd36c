//! Request-facing composition of classifiers, pipeline, and arbiter.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::arbiter::{
    ComparisonArbiter, ComparisonOutcome, ComparisonStatus, OracleVerdict, ProcessingDetails,
    Verdict,
};
use crate::classifier::{HttpPredictor, LabelMap, LocalClassifier};
use crate::config::{Config, PipelineConfig};
use crate::error::{AppError, AppResult};
use crate::explainer::{Explainer, PerturbationExplainer, WordInfluence};
use crate::gemini::{GeminiClient, NarrativeExplanation, OracleExt, VerificationOracle};
use crate::pipeline::{format_for_display, DecisionSource, DisplayResult, XaiPipeline};
use crate::storage::{InsightStore, InsightWriter};

pub const NO_ANALYSIS: &str = "No detailed analysis available.";
pub const NO_SUMMARY: &str = "No summary available.";
pub const NO_CONFIDENCE_NOTE: &str = "N/A";
pub const NO_ATTRIBUTION: &str = "Attribution analysis unavailable";

/// Primary classify response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub original_text: String,
    pub category: Option<String>,
    pub category_confidence: f64,
    /// Local verdict, only when it is `real` or `fake`.
    pub model_result: Option<Verdict>,
    /// 0-1.
    pub model_confidence: f64,
    pub gemini_result: Option<OracleVerdict>,
    pub final_displayed_result: Option<Verdict>,
    pub comparison_status: ComparisonStatus,
    pub processing_details: ProcessingDetails,
    pub xai: DisplayResult,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub word_influences: Vec<WordInfluence>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insight_id: Option<i64>,
}

/// Narrative and attribution for one article. Never contains nulls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplanationReport {
    pub explanation: String,
    pub summary: String,
    pub confidence_explanation: String,
    pub prediction_label: Option<Verdict>,
    /// 0-1.
    pub confidence_score: f64,
    pub attribution_html: String,
    pub word_influences: Vec<WordInfluence>,
}

/// Everything a request handler needs, built once at bootstrap.
#[derive(Clone)]
pub struct ClassifyService {
    category: LocalClassifier,
    pipeline: XaiPipeline,
    explaining_pipeline: XaiPipeline,
    arbiter: ComparisonArbiter,
    oracle: Option<Arc<dyn VerificationOracle>>,
}

impl ClassifyService {
    /// Wire the service from explicit parts.
    pub fn new(
        fake_news: LocalClassifier,
        category: LocalClassifier,
        oracle: Option<Arc<dyn VerificationOracle>>,
        explainer: Arc<dyn Explainer>,
        writer: Option<InsightWriter>,
        config: &PipelineConfig,
    ) -> Self {
        let mut pipeline = XaiPipeline::new(fake_news, config);
        if let Some(oracle) = &oracle {
            pipeline = pipeline.with_oracle(Arc::clone(oracle));
        }
        if let Some(writer) = writer {
            pipeline = pipeline.with_insight_writer(writer);
        }
        let explaining_pipeline = pipeline.clone().with_explainer(explainer);

        Self {
            category,
            pipeline,
            explaining_pipeline,
            arbiter: ComparisonArbiter::new(oracle.clone()),
            oracle,
        }
    }

    /// Build every collaborator from configuration. Missing model URLs or oracle
    /// credentials are degraded modes, not errors.
    pub fn from_config(config: &Config, store: Option<Arc<dyn InsightStore>>) -> AppResult<Self> {
        let fake_news = match &config.models.fake_news_url {
            Some(url) => LocalClassifier::new(
                "fake-news",
                Arc::new(HttpPredictor::new(url.as_str(), &config.request)?),
                LabelMap::fake_news(),
            ),
            None => {
                warn!("FAKE_MODEL_URL not set, fake-news classifier disabled");
                LocalClassifier::unavailable("fake-news", LabelMap::fake_news())
            }
        };

        let category = match &config.models.category_url {
            Some(url) => LocalClassifier::new(
                "news-category",
                Arc::new(HttpPredictor::new(url.as_str(), &config.request)?),
                LabelMap::news_category(),
            ),
            None => {
                warn!("CATEGORY_MODEL_URL not set, topic classifier disabled");
                LocalClassifier::unavailable("news-category", LabelMap::news_category())
            }
        };

        let oracle: Option<Arc<dyn VerificationOracle>> = match &config.gemini {
            Some(gemini) => {
                info!(model = %gemini.model, "Oracle configured");
                let client: Arc<dyn VerificationOracle> =
                    Arc::new(GeminiClient::new(gemini, config.request.clone())?);
                Some(client)
            }
            None => {
                warn!("GEMINI_API_KEY not set, oracle disabled");
                None
            }
        };

        let writer = store.map(|store| InsightWriter::from_config(store, &config.pipeline));

        Ok(Self::new(
            fake_news,
            category,
            oracle,
            Arc::new(PerturbationExplainer::from_config(&config.explainer)),
            writer,
            &config.pipeline,
        ))
    }

    pub fn is_oracle_available(&self) -> bool {
        self.oracle.is_some()
    }

    /// Topic, local verdict, oracle arbitration, and pipeline telemetry for one
    /// article. The stored insight includes the arbitration outcome.
    pub async fn classify(
        &self,
        text: &str,
        user_id: Option<i64>,
        explain: bool,
    ) -> AppResult<ClassifyResponse> {
        validate_text(text)?;

        let category = self.category.predict(text).await;
        let pipeline = if explain {
            &self.explaining_pipeline
        } else {
            &self.pipeline
        };
        let mut result = pipeline
            .process_arbitrated(text, user_id, &self.arbiter)
            .await;

        let model_confidence = result.confidence_score / 100.0;
        let comparison = result.comparison.take().unwrap_or_else(|| {
            ComparisonOutcome::model_only(None, model_confidence, self.arbiter.is_oracle_available())
        });

        Ok(ClassifyResponse {
            original_text: text.to_string(),
            category: category.label,
            category_confidence: category.confidence,
            model_result: result
                .prediction_label
                .filter(|label| matches!(label, Verdict::Real | Verdict::Fake)),
            model_confidence,
            gemini_result: comparison.gemini_result,
            final_displayed_result: comparison.final_displayed_result,
            comparison_status: comparison.comparison_status,
            processing_details: comparison.processing_details,
            xai: format_for_display(&result),
            word_influences: result.word_influences,
            insight_id: result.insight_id,
        })
    }

    /// Narrative plus word attribution, with placeholder strings for anything missing.
    pub async fn explain_article(&self, text: &str) -> AppResult<ExplanationReport> {
        validate_text(text)?;

        let result = self.explaining_pipeline.process(text, None).await;
        let confidence = result.confidence_score / 100.0;

        let narrative = if result.decision_source == DecisionSource::MlGemini {
            Some(NarrativeExplanation {
                summary: result.summary.clone().unwrap_or_default(),
                explanation: result.explanation.clone().unwrap_or_default(),
                confidence_note: result.confidence_explanation.clone().unwrap_or_default(),
            })
        } else if let Some(oracle) = &self.oracle {
            let label = result
                .prediction_label
                .unwrap_or(Verdict::Unknown)
                .as_str()
                .to_uppercase();
            Some(oracle.explain(text, &label, result.confidence_score).await)
        } else {
            None
        };

        let (summary, explanation, confidence_note) = match narrative {
            Some(n) => (n.summary, n.explanation, n.confidence_note),
            None => Default::default(),
        };

        Ok(ExplanationReport {
            explanation: or_placeholder(explanation, NO_ANALYSIS),
            summary: or_placeholder(summary, NO_SUMMARY),
            confidence_explanation: or_placeholder(confidence_note, NO_CONFIDENCE_NOTE),
            prediction_label: result.prediction_label,
            confidence_score: confidence,
            attribution_html: result
                .explanation_markup
                .filter(|markup| !markup.is_empty())
                .unwrap_or_else(|| NO_ATTRIBUTION.to_string()),
            word_influences: result.word_influences,
        })
    }
}

fn validate_text(text: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::Validation {
            field: "text".to_string(),
            reason: "text required".to_string(),
        });
    }
    Ok(())
}

fn or_placeholder(value: String, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{FnPredictor, LabelScore, RawPrediction};
    use crate::gemini::{MockVerificationOracle, OracleAnalysis};

    fn fixed(name: &str, labels: LabelMap, label: &str, score: f64) -> LocalClassifier {
        let raw = RawPrediction::Ranked(vec![LabelScore {
            label: label.to_string(),
            score,
        }]);
        LocalClassifier::new(
            name,
            Arc::new(FnPredictor::new(move |_: &str| Ok(raw.clone()))),
            labels,
        )
    }

    fn service(
        oracle: Option<Arc<dyn VerificationOracle>>,
        fake_label: &str,
        score: f64,
    ) -> ClassifyService {
        ClassifyService::new(
            fixed("fake-news", LabelMap::fake_news(), fake_label, score),
            fixed("news-category", LabelMap::news_category(), "LABEL_6", 0.81),
            oracle,
            Arc::new(PerturbationExplainer::new(20, Some(1))),
            None,
            &PipelineConfig::default(),
        )
    }

    fn oracle_saying(verdict: &'static str) -> Arc<dyn VerificationOracle> {
        let mut oracle = MockVerificationOracle::new();
        oracle.expect_verify().returning(move |_| {
            Ok(OracleAnalysis {
                verdict: verdict.to_string(),
                summary: "- summary".to_string(),
                explanation: "explanation".to_string(),
            })
        });
        Arc::new(oracle)
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let err = service(None, "LABEL_1", 0.9)
            .classify("   ", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_classify_without_oracle() {
        let response = service(None, "LABEL_1", 0.92)
            .classify("Breaking: Earth is flat, NASA hides truth", None, false)
            .await
            .unwrap();
        assert_eq!(response.category.as_deref(), Some("Politics"));
        assert_eq!(response.model_result, Some(Verdict::Fake));
        assert_eq!(response.comparison_status, ComparisonStatus::ModelOnly);
        assert_eq!(response.final_displayed_result, Some(Verdict::Fake));
        assert_eq!(response.gemini_result, None);
        assert_eq!(response.xai.confidence_percent, "92.0%");
    }

    #[tokio::test]
    async fn test_classify_conflict() {
        let response = service(Some(oracle_saying("FAKE")), "LABEL_0", 0.55)
            .classify("text", None, false)
            .await
            .unwrap();
        assert_eq!(response.comparison_status, ComparisonStatus::Conflict);
        assert_eq!(response.final_displayed_result, Some(Verdict::Fake));
        assert_eq!(response.model_result, Some(Verdict::Real));
        assert_eq!(response.xai.decision_source, DecisionSource::MlGemini);
    }

    #[tokio::test]
    async fn test_unknown_label_is_not_a_model_result() {
        let response = service(None, "LABEL_4", 0.7)
            .classify("text", None, false)
            .await
            .unwrap();
        assert_eq!(response.model_result, None);
        assert_eq!(response.final_displayed_result, Some(Verdict::Unknown));
    }

    #[tokio::test]
    async fn test_explain_without_oracle_uses_placeholders() {
        let report = service(None, "LABEL_1", 0.9)
            .explain_article("A shocking hoax spreads online")
            .await
            .unwrap();
        assert_eq!(report.summary, NO_SUMMARY);
        assert_eq!(report.explanation, NO_ANALYSIS);
        assert_eq!(report.confidence_explanation, NO_CONFIDENCE_NOTE);
        assert!((report.confidence_score - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_explain_with_confident_model_asks_oracle() {
        let report = service(Some(oracle_saying("REAL")), "LABEL_0", 0.95)
            .explain_article("Parliament passed the budget")
            .await
            .unwrap();
        assert_eq!(report.summary, "- summary");
        assert_eq!(report.confidence_explanation, "Gemini verdict: REAL");
        assert_eq!(report.prediction_label, Some(Verdict::Real));
    }
}
