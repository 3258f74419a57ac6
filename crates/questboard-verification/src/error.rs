use crate::claim::ClaimAction;
use questboard_client::ClientError;
use thiserror::Error;

pub type VerificationResult<T> = Result<T, VerificationError>;

#[derive(Error, Debug)]
pub enum VerificationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Backend returned {status}: {message}")]
    Backend { status: u16, message: String },

    #[error("{0}")]
    Rejected(String),

    #[error("Unknown task: {0}")]
    UnknownTask(String),

    #[error("Task {0} needs its content confirmed first")]
    ContentConfirmationRequired(String),

    #[error("Task {0} is not a content task")]
    NotAContentTask(String),

    #[error("No content draft for task {0}")]
    NoContentDraft(String),

    #[error("Claim not available: {0}")]
    ClaimBlocked(ClaimAction),

    #[error(transparent)]
    Client(#[from] ClientError),
}
