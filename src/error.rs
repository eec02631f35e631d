use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Invalid unit '{unit}' for {category}")]
    InvalidUnit { unit: String, category: String },

    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Invalid granularity: {0}")]
    InvalidGranularity(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Missing identifier '{field}' for bucket {bucket}")]
    MissingIdentifier { field: String, bucket: String },

    #[error("Missing required data: {0}")]
    MissingData(String),

    #[error("Parquet write error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Async task error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
