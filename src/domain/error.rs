use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed request: {0}")]
    MalformedRequest(String),

    #[error("authentication: {0}")]
    Authentication(String),

    #[error("configuration: {0}")]
    Configuration(String),

    #[error("store: {0}")]
    Store(String),
}
