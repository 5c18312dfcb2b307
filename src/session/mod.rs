//! Session State
//!
//! Single source of truth for whether the WhatsApp session can send, and for
//! the most recent pairing QR. Lifecycle events from the session client drive
//! a small state machine; HTTP handlers only read.

mod pump;
pub mod qr;

pub use pump::spawn_event_pump;

use crate::event_log::EventLog;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Where the session is in its pairing lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Unauthenticated,
    AwaitingScan,
    Ready,
    Disconnected,
}

/// Lifecycle signal emitted by a session client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Raw pairing payload to be shown as a QR code.
    QrIssued(String),
    Ready,
    Disconnected(String),
    AuthFailure(String),
}

/// Point-in-time view returned to readers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub ready: bool,
    pub phase: SessionPhase,
}

#[derive(Debug, Default)]
struct Inner {
    phase: SessionPhase,
    /// `data:` URI of the latest pairing QR.
    qr_image: Option<String>,
}

/// Cheaply cloneable handle shared by the HTTP layer and the event pump.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    inner: Arc<RwLock<Inner>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Render and store a new pairing QR, replacing any previous one.
    ///
    /// A session that is already ready stays ready.
    pub async fn on_qr_issued(&self, raw: &str) -> Result<(), qr::QrError> {
        let image = qr::render_data_uri(raw)?;
        let mut inner = self.inner.write().await;
        inner.qr_image = Some(image);
        if inner.phase != SessionPhase::Ready {
            inner.phase = SessionPhase::AwaitingScan;
        }
        Ok(())
    }

    pub async fn on_ready(&self) {
        self.inner.write().await.phase = SessionPhase::Ready;
    }

    /// The stored QR survives a disconnect; re-pairing overwrites it.
    pub async fn on_disconnected(&self) {
        self.inner.write().await.phase = SessionPhase::Disconnected;
    }

    /// Informational only: readiness is left untouched.
    pub fn on_auth_failure(&self, reason: &str) {
        tracing::warn!("WhatsApp: authentication failed: {}", reason);
    }

    /// Apply a lifecycle event and record it in the event log.
    pub async fn apply(&self, event: &SessionEvent, log: &EventLog) {
        match event {
            SessionEvent::QrIssued(raw) => match self.on_qr_issued(raw).await {
                Ok(()) => log.record("New QR generated. Scan it with WhatsApp."),
                Err(e) => log.record(format!("Failed to render pairing QR: {e}")),
            },
            SessionEvent::Ready => {
                self.on_ready().await;
                log.record("WhatsApp client is ready.");
            }
            SessionEvent::Disconnected(reason) => {
                self.on_disconnected().await;
                if reason.is_empty() {
                    log.record("WhatsApp client disconnected.");
                } else {
                    log.record(format!("WhatsApp client disconnected: {reason}"));
                }
            }
            SessionEvent::AuthFailure(reason) => {
                self.on_auth_failure(reason);
                log.record(format!("Authentication failed: {reason}"));
            }
        }
    }

    pub async fn status(&self) -> SessionStatus {
        let phase = self.inner.read().await.phase;
        SessionStatus {
            ready: phase == SessionPhase::Ready,
            phase,
        }
    }

    pub async fn is_ready(&self) -> bool {
        self.inner.read().await.phase == SessionPhase::Ready
    }

    /// Latest pairing QR as a `data:` URI.
    pub async fn qr(&self) -> Option<String> {
        self.inner.read().await.qr_image.clone()
    }
}
