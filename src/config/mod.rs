use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Oracle settings; `None` when no API key is present.
    pub gemini: Option<GeminiConfig>,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub models: ModelConfig,
    pub pipeline: PipelineConfig,
    pub explainer: ExplainerConfig,
}

/// Gemini API configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Model-serving endpoints for the local classifiers
#[derive(Debug, Clone, Default)]
pub struct ModelConfig {
    pub fake_news_url: Option<String>,
    pub category_url: Option<String>,
}

/// How finished insights are handed to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Await the single write and report the new row id.
    Inline,
    /// Spawn the write and return immediately.
    Detached,
}

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Narrative verification runs only below this confidence (0-100).
    pub verification_threshold: f64,
    pub persist_mode: PersistMode,
    pub dead_letter_path: Option<PathBuf>,
}

/// Attribution settings
#[derive(Debug, Clone)]
pub struct ExplainerConfig {
    pub num_samples: usize,
    pub seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let gemini = env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| GeminiConfig {
                api_key,
                base_url: env::var("GEMINI_BASE_URL")
                    .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
                model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            });

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/insights.db".to_string()),
            ),
            max_connections: parse_env("DATABASE_MAX_CONNECTIONS").unwrap_or(5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: parse_env("REQUEST_TIMEOUT_MS").unwrap_or(30000),
            max_retries: parse_env("MAX_RETRIES").unwrap_or(0),
            retry_delay_ms: parse_env("RETRY_DELAY_MS").unwrap_or(1000),
        };

        let models = ModelConfig {
            fake_news_url: non_empty_env("FAKE_MODEL_URL"),
            category_url: non_empty_env("CATEGORY_MODEL_URL"),
        };

        let pipeline = PipelineConfig {
            verification_threshold: parse_env("VERIFICATION_THRESHOLD").unwrap_or(60.0),
            persist_mode: match env::var("PERSIST_MODE")
                .unwrap_or_else(|_| "inline".to_string())
                .to_lowercase()
                .as_str()
            {
                "detached" => PersistMode::Detached,
                _ => PersistMode::Inline,
            },
            dead_letter_path: non_empty_env("DEAD_LETTER_PATH").map(PathBuf::from),
        };

        let explainer = ExplainerConfig {
            num_samples: parse_env("EXPLAINER_SAMPLES").unwrap_or(250),
            seed: parse_env("EXPLAINER_SEED"),
        };

        Ok(Config {
            gemini,
            database,
            logging,
            request,
            models,
            pipeline,
            explainer,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 0,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            verification_threshold: 60.0,
            persist_mode: PersistMode::Inline,
            dead_letter_path: None,
        }
    }
}

impl Default for ExplainerConfig {
    fn default() -> Self {
        Self {
            num_samples: 250,
            seed: None,
        }
    }
}
