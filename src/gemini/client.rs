use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::oracle::VerificationOracle;
use super::parse::parse_tagged_response;
use super::types::{GenerateContentRequest, GenerateContentResponse, OracleAnalysis};
use crate::config::{GeminiConfig, RequestConfig};
use crate::error::{OracleError, OracleResult};
use crate::prompts::fact_check_prompt;

/// Client for the Gemini `generateContent` endpoint
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    request_config: RequestConfig,
}

impl GeminiClient {
    /// Create a new Gemini client. A blank API key is `NotConfigured`.
    pub fn new(config: &GeminiConfig, request_config: RequestConfig) -> OracleResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(OracleError::NotConfigured);
        }

        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(OracleError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            request_config,
        })
    }

    /// Send one prompt and return the generated text
    pub async fn generate(&self, request: GenerateContentRequest) -> OracleResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = backoff_delay(self.request_config.retry_delay_ms, retries);
                warn!(
                    model = %self.model,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying Gemini request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &request).await {
                Ok(text) => {
                    info!(
                        model = %self.model,
                        latency_ms = start.elapsed().as_millis(),
                        "Gemini call succeeded"
                    );
                    return Ok(text);
                }
                // An answer without text will not improve on retry.
                Err(OracleError::EmptyResponse) => return Err(OracleError::EmptyResponse),
                Err(e) => {
                    error!(
                        model = %self.model,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Gemini call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        match last_error {
            Some(e) if self.request_config.max_retries == 0 => Err(e),
            other => Err(OracleError::Unavailable {
                message: other
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "Unknown error".to_string()),
                retries,
            }),
        }
    }

    /// Execute a single request (internal)
    async fn execute_request(
        &self,
        url: &str,
        request: &GenerateContentRequest,
    ) -> OracleResult<String> {
        debug!(model = %self.model, "Calling Gemini");

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    OracleError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let body: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|e| OracleError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        body.text().ok_or(OracleError::EmptyResponse)
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the model name
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Delay before retry number `retry` (1-based): the base delay doubled per
/// earlier retry, saturating instead of overflowing.
fn backoff_delay(retry_delay_ms: u64, retry: u32) -> Duration {
    let factor = 2_u64.saturating_pow(retry.saturating_sub(1));
    Duration::from_millis(retry_delay_ms.saturating_mul(factor))
}

#[async_trait]
impl VerificationOracle for GeminiClient {
    async fn verify(&self, article_text: &str) -> OracleResult<OracleAnalysis> {
        let request = GenerateContentRequest::from_prompt(fact_check_prompt(article_text))
            .with_temperature(0.2)
            .with_max_output_tokens(1024);
        let text = self.generate(request).await?;
        Ok(parse_tagged_response(&text)?)
    }
}
