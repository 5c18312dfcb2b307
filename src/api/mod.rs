//! HTTP API
//!
//! - `GET  /status`        session readiness
//! - `GET  /qr`            latest pairing QR as a `data:` URI
//! - `POST /send-message`  multipart form (`numero`, `mensaje`, optional `pdf`
//!   file) or a JSON `{numero, mensaje}` object

mod form;

pub use form::{FIELD_ATTACHMENT, FIELD_NUMBER, FIELD_TEXT, FormRejection, SendForm, read_send_form};

use crate::config::ServerConfig;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::session::SessionState;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::Instrument;
use uuid::Uuid;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: SessionState,
    pub dispatcher: Arc<Dispatcher>,
}

/// Build the router with all routes.
pub fn router(state: AppState, config: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/status", get(status_handler))
        .route("/qr", get(qr_handler))
        .route("/send-message", post(send_message_handler))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(state);

    if config.cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

/// GET /status
async fn status_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let status = state.session.status().await;
    Json(json!({
        "status": if status.ready { "ready" } else { "not_ready" },
        "phase": status.phase,
    }))
}

/// GET /qr
async fn qr_handler(State(state): State<AppState>) -> Response {
    match state.session.qr().await {
        Some(qr) => Json(json!({ "qr": qr })).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "QR not available yet" })),
        )
            .into_response(),
    }
}

/// POST /send-message
async fn send_message_handler(
    State(state): State<AppState>,
    SendForm(request): SendForm,
) -> Response {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("send_message", %request_id);

    match state.dispatcher.dispatch(request).instrument(span).await {
        Ok(report) => Json(json!({
            "status": "Message sent successfully",
            "text_sent": report.text_sent,
            "attachment_sent": report.attachment_sent,
        }))
        .into_response(),
        Err(e) => e.into_response(),
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            DispatchError::SendFailure { report, .. } => json!({
                "error": self.public_message(),
                "text_sent": report.text_sent,
                "attachment_sent": report.attachment_sent,
            }),
            _ => json!({ "error": self.public_message() }),
        };
        (status, Json(body)).into_response()
    }
}
