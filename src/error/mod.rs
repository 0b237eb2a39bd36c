use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation failed: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Verification oracle errors
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle not configured")]
    NotConfigured,

    #[error("Oracle unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Oracle returned an empty response")]
    EmptyResponse,

    #[error("Unparsable oracle response: {0}")]
    Parse(#[from] ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failure to read the tagged VERDICT/SUMMARY/EXPLANATION format
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("missing section: {section}")]
    MissingSection { section: String },

    #[error("response text is empty")]
    EmptyInput,
}

/// Local classifier errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Local model not loaded")]
    ModelUnavailable,

    #[error("Inference failed: {message}")]
    Inference { message: String },

    #[error("Malformed model output: {message}")]
    MalformedOutput { message: String },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for oracle operations
pub type OracleResult<T> = Result<T, OracleError>;

/// Result type alias for local classifier operations
pub type ClassifierResult<T> = Result<T, ClassifierError>;
