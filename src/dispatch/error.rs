use super::types::DeliveryReport;
use axum::http::StatusCode;
use thiserror::Error;

/// Why a send request did not fully go through
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Missing required fields: {}", .fields.join(", "))]
    MissingFields { fields: Vec<&'static str> },

    #[error("WhatsApp session is not ready; message to {number} was not sent")]
    NotReady { number: String },

    #[error("The number {number} is not registered on WhatsApp.")]
    NotRegistered { number: String },

    /// The session failed a lookup or send. `report` tells the caller whether
    /// the text went out before the failure.
    #[error("Error sending to {number}: {detail}")]
    SendFailure {
        number: String,
        detail: String,
        report: DeliveryReport,
    },
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MissingFields { .. } | Self::NotRegistered { .. } => StatusCode::BAD_REQUEST,
            Self::NotReady { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Self::SendFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the HTTP caller.
    pub fn public_message(&self) -> String {
        match self {
            Self::SendFailure { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}
