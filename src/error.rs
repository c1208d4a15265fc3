use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Malformed model response: {0}")]
    MalformedResponse(String),

    #[error("Run tracing error: {0}")]
    Tracing(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for AssistantError {
    fn from(e: rusqlite::Error) -> Self {
        AssistantError::Dataset(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
