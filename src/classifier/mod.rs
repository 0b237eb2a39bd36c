//! Local classifier adapters.
//!
//! Model servers answer in several shapes: a bare label, one scored label,
//! a ranked list, or a batch of ranked lists. [`RawPrediction`] decodes all of
//! them once at the boundary and [`LocalClassifier`] reduces them to a single
//! `(label, confidence)` pair.

mod http;
mod labels;

pub use http::HttpPredictor;
pub use labels::LabelMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::error::{ClassifierError, ClassifierResult};

/// One label with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelScore {
    pub label: String,
    #[serde(default)]
    pub score: f64,
}

/// Every output shape a predictor may produce.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawPrediction {
    /// `"LABEL_1"`
    Label(String),
    /// `{"label": "LABEL_1", "score": 0.93}`
    Scored(LabelScore),
    /// `[{"label": ..., "score": ...}, ...]`
    Ranked(Vec<LabelScore>),
    /// `[[{"label": ..., "score": ...}, ...]]`, one row per input
    Batched(Vec<Vec<LabelScore>>),
}

impl RawPrediction {
    /// Highest-scoring raw label. Ties keep the first entry seen.
    pub fn top(self) -> ClassifierResult<LabelScore> {
        let top = match self {
            RawPrediction::Label(label) => LabelScore { label, score: 0.0 },
            RawPrediction::Scored(scored) => scored,
            RawPrediction::Ranked(scores) => best_of(scores)?,
            RawPrediction::Batched(rows) => best_of(first_row(rows)?)?,
        };

        if top.label.trim().is_empty() {
            return Err(ClassifierError::MalformedOutput {
                message: "empty label".to_string(),
            });
        }
        Ok(top)
    }

    /// Flatten into a score list. A bare label counts as certain.
    pub fn into_scores(self) -> ClassifierResult<Vec<LabelScore>> {
        let scores = match self {
            RawPrediction::Label(label) => vec![LabelScore { label, score: 1.0 }],
            RawPrediction::Scored(scored) => vec![scored],
            RawPrediction::Ranked(scores) => scores,
            RawPrediction::Batched(rows) => first_row(rows)?,
        };
        if scores.is_empty() {
            return Err(ClassifierError::MalformedOutput {
                message: "empty ranking".to_string(),
            });
        }
        Ok(scores)
    }
}

fn first_row(rows: Vec<Vec<LabelScore>>) -> ClassifierResult<Vec<LabelScore>> {
    rows.into_iter()
        .next()
        .ok_or_else(|| ClassifierError::MalformedOutput {
            message: "empty batch".to_string(),
        })
}

fn best_of(scores: Vec<LabelScore>) -> ClassifierResult<LabelScore> {
    let mut iter = scores.into_iter();
    let first = iter.next().ok_or_else(|| ClassifierError::MalformedOutput {
        message: "empty ranking".to_string(),
    })?;
    Ok(iter.fold(first, |best, candidate| {
        if candidate.score > best.score {
            candidate
        } else {
            best
        }
    }))
}

/// Something that turns article text into a raw prediction.
#[async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, text: &str) -> ClassifierResult<RawPrediction>;
}

/// Adapts a plain function (e.g. an in-process model) into a [`Predictor`].
pub struct FnPredictor<F>(F);

impl<F> FnPredictor<F>
where
    F: Fn(&str) -> ClassifierResult<RawPrediction> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> Predictor for FnPredictor<F>
where
    F: Fn(&str) -> ClassifierResult<RawPrediction> + Send + Sync,
{
    async fn predict(&self, text: &str) -> ClassifierResult<RawPrediction> {
        (self.0)(text)
    }
}

/// Degraded-mode friendly prediction: `label` is `None` when nothing could be inferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Option<String>,
    pub confidence: f64,
}

impl Prediction {
    /// The `(None, 0.0)` sentinel.
    pub fn none() -> Self {
        Self {
            label: None,
            confidence: 0.0,
        }
    }
}

/// Uniform `predict(text) -> (label, confidence)` over any [`Predictor`].
#[derive(Clone)]
pub struct LocalClassifier {
    name: String,
    predictor: Option<Arc<dyn Predictor>>,
    labels: LabelMap,
}

impl LocalClassifier {
    /// Classifier backed by a loaded model.
    pub fn new(name: impl Into<String>, predictor: Arc<dyn Predictor>, labels: LabelMap) -> Self {
        Self {
            name: name.into(),
            predictor: Some(predictor),
            labels,
        }
    }

    /// Classifier without a model; every prediction degrades.
    pub fn unavailable(name: impl Into<String>, labels: LabelMap) -> Self {
        Self {
            name: name.into(),
            predictor: None,
            labels,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_available(&self) -> bool {
        self.predictor.is_some()
    }

    pub fn labels(&self) -> &LabelMap {
        &self.labels
    }

    async fn raw(&self, text: &str) -> ClassifierResult<RawPrediction> {
        let predictor = self
            .predictor
            .as_ref()
            .ok_or(ClassifierError::ModelUnavailable)?;
        predictor.predict(text).await
    }

    /// Top mapped label and its score, or the reason there is none.
    pub async fn try_predict(&self, text: &str) -> ClassifierResult<LabelScore> {
        let top = self.raw(text).await?.top()?;
        let label = self.labels.map(&top.label);
        debug!(
            classifier = %self.name,
            raw_label = %top.label,
            label = %label,
            score = top.score,
            "Local prediction"
        );
        Ok(LabelScore {
            label,
            score: top.score,
        })
    }

    /// Like `try_predict`, but failures degrade to `(None, 0.0)` and are only logged.
    pub async fn predict(&self, text: &str) -> Prediction {
        match self.try_predict(text).await {
            Ok(top) => Prediction {
                label: Some(top.label),
                confidence: top.score,
            },
            Err(ClassifierError::ModelUnavailable) => {
                warn!(classifier = %self.name, "No local model loaded");
                Prediction::none()
            }
            Err(e) => {
                error!(classifier = %self.name, error = %e, "Local prediction failed");
                Prediction::none()
            }
        }
    }

    /// Probability the model assigns to the domain label `target`.
    ///
    /// When only the opposing class of a single-score answer is reported,
    /// its complement is used.
    pub async fn probability_of(&self, text: &str, target: &str) -> ClassifierResult<f64> {
        let scores = self.raw(text).await?.into_scores()?;

        if let Some(hit) = scores.iter().find(|s| self.labels.map(&s.label) == target) {
            return Ok(hit.score.clamp(0.0, 1.0));
        }
        match scores.as_slice() {
            [only] => Ok((1.0 - only.score).clamp(0.0, 1.0)),
            _ => Ok(0.0),
        }
    }

    /// Probability mass on `fake`.
    pub async fn fake_probability(&self, text: &str) -> ClassifierResult<f64> {
        self.probability_of(text, "fake").await
    }
}
