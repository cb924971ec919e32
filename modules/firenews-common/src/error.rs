use thiserror::Error;

pub type Result<T> = std::result::Result<T, FireError>;

#[derive(Error, Debug)]
pub enum FireError {
    /// Bad or missing input. Maps to a client error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Predictor could not run or produced output we could not read.
    #[error("Prediction error: {0}")]
    Prediction(String),

    /// Document store unreachable or rejected the operation. `body` is the raw
    /// transport response, kept for diagnostics.
    #[error("Storage error (status {status:?}): {body}")]
    Storage { status: Option<u16>, body: String },

    #[error("Article not found: {0}")]
    NotFound(String),
}

impl FireError {
    pub fn storage(body: impl Into<String>) -> Self {
        FireError::Storage {
            status: None,
            body: body.into(),
        }
    }

    /// True for errors caused by the caller rather than a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(self, FireError::Validation(_) | FireError::NotFound(_))
    }
}
