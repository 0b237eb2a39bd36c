use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use super::{Predictor, RawPrediction};
use crate::config::RequestConfig;
use crate::error::{ClassifierError, ClassifierResult};

/// Predictor backed by a text-classification model server.
///
/// Sends `{"inputs": text, "parameters": {"top_k": null}}` and accepts any
/// [`RawPrediction`] shape in return.
#[derive(Clone)]
pub struct HttpPredictor {
    client: Client,
    url: String,
}

impl HttpPredictor {
    /// Create a predictor for one model endpoint
    pub fn new(url: impl Into<String>, request_config: &RequestConfig) -> ClassifierResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(|e| ClassifierError::Inference {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Get the endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Predictor for HttpPredictor {
    async fn predict(&self, text: &str) -> ClassifierResult<RawPrediction> {
        debug!(url = %self.url, chars = text.len(), "Calling model server");

        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "inputs": text, "parameters": { "top_k": null } }))
            .send()
            .await
            .map_err(|e| ClassifierError::Inference {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Inference {
                message: format!("model server returned {}: {}", status.as_u16(), body),
            });
        }

        response
            .json::<RawPrediction>()
            .await
            .map_err(|e| ClassifierError::MalformedOutput {
                message: e.to_string(),
            })
    }
}
