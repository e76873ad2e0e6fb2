/// Errors that can occur when requesting a completion.
///
/// Cancellation is deliberately absent: an aborted request never produces an
/// error value, the caller simply stops awaiting it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(Box<dyn std::error::Error + Send + Sync>),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("completion response had no message content")]
    EmptyResponse,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
