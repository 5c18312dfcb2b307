//! Session client errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway rejected the request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("gateway rejected the API key")]
    Unauthorized,

    #[error("unexpected gateway response: {0}")]
    Decode(String),

    /// Failure reported by the session itself, passed through verbatim.
    #[error("{0}")]
    Session(String),
}
