use serde::{Deserialize, Serialize};

/// Content block in a generateContent conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single content part (only text parts are used here)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Sampling options
#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig", skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Response body from `generateContent`
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    pub usage_metadata: Option<UsageMetadata>,
}

/// One generated candidate
#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
    #[serde(rename = "finishReason")]
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Clone, Deserialize)]
pub struct UsageMetadata {
    #[serde(rename = "promptTokenCount")]
    pub prompt_token_count: Option<u32>,
    #[serde(rename = "candidatesTokenCount")]
    pub candidates_token_count: Option<u32>,
    #[serde(rename = "totalTokenCount")]
    pub total_token_count: Option<u32>,
}

/// Structured verdict extracted from the oracle's tagged answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleAnalysis {
    /// Upper-cased verdict token as written by the oracle (e.g. `FAKE`).
    pub verdict: String,
    pub summary: String,
    pub explanation: String,
}

/// Legacy three-part narrative shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeExplanation {
    pub summary: String,
    pub explanation: String,
    pub confidence_note: String,
}

impl GenerateContentRequest {
    /// Single-turn request carrying one user prompt
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.into()),
                }],
            }],
            generation_config: None,
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.generation_config
            .get_or_insert(GenerationConfig {
                temperature: None,
                max_output_tokens: None,
            })
            .temperature = Some(temperature);
        self
    }

    /// Set the output token cap
    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.generation_config
            .get_or_insert(GenerationConfig {
                temperature: None,
                max_output_tokens: None,
            })
            .max_output_tokens = Some(max_output_tokens);
        self
    }
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate, `None` when there is no text at all
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();
        if text.trim().is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl NarrativeExplanation {
    /// Placeholder triple used whenever the oracle could not answer
    pub fn unavailable() -> Self {
        Self {
            summary: "No summary available".to_string(),
            explanation: "Verification service failed.".to_string(),
            confidence_note: "N/A".to_string(),
        }
    }

    /// Narrative built from a successful analysis
    pub fn from_analysis(analysis: &OracleAnalysis) -> Self {
        Self {
            summary: analysis.summary.clone(),
            explanation: analysis.explanation.clone(),
            confidence_note: format!("Gemini verdict: {}", analysis.verdict),
        }
    }
}
