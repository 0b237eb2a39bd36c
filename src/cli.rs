//! Command-line interface.
//!
//! Every command prints pretty JSON on stdout; logs go to stderr.

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::service::ClassifyService;
use crate::storage::{InsightStore, ALL_INSIGHTS_LIMIT, USER_INSIGHTS_LIMIT};

/// Largest article file accepted.
pub const MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// Fake-news classification with oracle cross-checking and word attribution.
#[derive(Parser, Debug)]
#[command(name = "news-xai", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Article source: inline text or a file.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ArticleInput {
    /// Article text
    #[arg(long)]
    pub text: Option<String>,

    /// Path to a text file holding the article
    #[arg(long)]
    pub file: Option<PathBuf>,
}

/// CLI subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Classify an article and cross-check it with the oracle
    Classify {
        #[command(flatten)]
        input: ArticleInput,

        /// Store the result as an insight for this user
        #[arg(long)]
        user_id: Option<i64>,

        /// Attach word attributions
        #[arg(long)]
        explain: bool,
    },

    /// Narrative explanation and word attribution for an article
    Explain {
        #[command(flatten)]
        input: ArticleInput,
    },

    /// Show a user's stored insights
    Insights {
        #[arg(long)]
        user_id: i64,

        /// Maximum number of insights to show
        #[arg(long, default_value_t = USER_INSIGHTS_LIMIT)]
        limit: i64,
    },

    /// Show every stored insight (article text abbreviated)
    AllInsights {
        /// Maximum number of insights to show
        #[arg(long, default_value_t = ALL_INSIGHTS_LIMIT)]
        limit: i64,
    },

    /// Aggregate statistics over all insights
    Analytics,
}

/// Result of CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    /// Exit code (0 = success)
    pub exit_code: i32,
    /// Output message
    pub message: String,
}

impl CliResult {
    /// Create a success result with the given message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            message: message.into(),
        }
    }

    /// Create an error result with the given message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            message: message.into(),
        }
    }

    fn json<T: Serialize>(value: AppResult<T>) -> Self {
        match value.and_then(|v| {
            serde_json::to_string_pretty(&v).map_err(|e| AppError::Internal {
                message: format!("Failed to serialize output: {}", e),
            })
        }) {
            Ok(output) => Self::success(output),
            Err(e) => Self::error(e.to_string()),
        }
    }
}

/// Execute a CLI command.
pub async fn execute_command(
    command: Commands,
    service: &ClassifyService,
    storage: &dyn InsightStore,
) -> CliResult {
    match command {
        Commands::Classify {
            input,
            user_id,
            explain,
        } => match read_input(&input).await {
            Ok(text) => CliResult::json(service.classify(&text, user_id, explain).await),
            Err(e) => CliResult::error(e.to_string()),
        },
        Commands::Explain { input } => match read_input(&input).await {
            Ok(text) => CliResult::json(service.explain_article(&text).await),
            Err(e) => CliResult::error(e.to_string()),
        },
        Commands::Insights { user_id, limit } => CliResult::json(
            storage
                .user_insights(user_id, limit)
                .await
                .map_err(AppError::from),
        ),
        Commands::AllInsights { limit } => {
            CliResult::json(storage.all_insights(limit).await.map_err(AppError::from))
        }
        Commands::Analytics => CliResult::json(storage.analytics().await.map_err(AppError::from)),
    }
}

async fn read_input(input: &ArticleInput) -> AppResult<String> {
    match (&input.text, &input.file) {
        (Some(text), _) => Ok(text.clone()),
        (None, Some(path)) => read_article_file(path).await,
        (None, None) => Err(AppError::Validation {
            field: "text".to_string(),
            reason: "either --text or --file is required".to_string(),
        }),
    }
}

/// Read an article file: at most [`MAX_FILE_BYTES`], UTF-8 with a Latin-1 fallback.
pub async fn read_article_file(path: &Path) -> AppResult<String> {
    let io_error = |e: std::io::Error| AppError::Validation {
        field: "file".to_string(),
        reason: format!("{}: {}", path.display(), e),
    };

    let size = tokio::fs::metadata(path).await.map_err(io_error)?.len();
    if size > MAX_FILE_BYTES {
        return Err(AppError::Validation {
            field: "file".to_string(),
            reason: format!("{} bytes exceeds the {} byte limit", size, MAX_FILE_BYTES),
        });
    }

    let bytes = tokio::fs::read(path).await.map_err(io_error)?;
    Ok(decode_text(bytes))
}

fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().into_iter().map(char::from).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_classify() {
        let cli = Cli::try_parse_from([
            "news-xai", "classify", "--text", "Earth is flat", "--user-id", "5", "--explain",
        ])
        .unwrap();
        match cli.command {
            Commands::Classify {
                input,
                user_id,
                explain,
            } => {
                assert_eq!(input.text.as_deref(), Some("Earth is flat"));
                assert_eq!(user_id, Some(5));
                assert!(explain);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_text_and_file_are_exclusive() {
        assert!(Cli::try_parse_from(["news-xai", "explain"]).is_err());
        assert!(Cli::try_parse_from([
            "news-xai", "explain", "--text", "a", "--file", "b.txt"
        ])
        .is_err());
    }

    #[test]
    fn test_default_limits() {
        let cli = Cli::try_parse_from(["news-xai", "all-insights"]).unwrap();
        assert!(matches!(cli.command, Commands::AllInsights { limit: 100 }));
        let cli = Cli::try_parse_from(["news-xai", "insights", "--user-id", "3"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Insights {
                user_id: 3,
                limit: 50
            }
        ));
    }

    #[test]
    fn test_decode_latin1_fallback() {
        assert_eq!(decode_text("café".as_bytes().to_vec()), "café");
        assert_eq!(decode_text(vec![0x63, 0x61, 0x66, 0xE9]), "café");
    }

    #[tokio::test]
    async fn test_read_article_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"Breaking news").unwrap();
        let text = read_article_file(file.path()).await.unwrap();
        assert_eq!(text, "Breaking news");
    }

    #[tokio::test]
    async fn test_oversized_file_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        file.as_file().set_len(MAX_FILE_BYTES + 1).unwrap();
        let err = read_article_file(file.path()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = read_article_file(Path::new("/nonexistent/article.txt"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("file"));
    }
}
