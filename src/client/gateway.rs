//! WhatsApp REST gateway client
//!
//! Talks to an Evolution-API style bridge that owns the WhatsApp Web session.
//! Pairing, encryption and session persistence all live in the gateway; this
//! client only polls connection state, fetches pairing codes and posts
//! messages. Every request carries the configured `apikey` header.

use super::error::{ClientError, Result};
use super::{ChatAddress, OutboundPayload, SessionClient};
use crate::config::GatewayConfig;
use crate::session::SessionEvent;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::mpsc;

/// Connection state as reported by the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayState {
    Open,
    Connecting,
    Close,
    Other(String),
}

impl GatewayState {
    fn parse(body: &Value) -> Self {
        let state = body["instance"]["state"]
            .as_str()
            .or_else(|| body["state"].as_str())
            .unwrap_or("");
        match state {
            "open" | "connected" => Self::Open,
            "connecting" => Self::Connecting,
            "close" | "closed" => Self::Close,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

#[derive(Debug, Deserialize)]
struct NumberCheck {
    #[serde(default)]
    exists: bool,
    #[serde(default)]
    number: Option<String>,
}

/// HTTP client for the gateway. Cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayClient {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            path,
            self.config.instance
        )
    }

    async fn get_json(&self, path: &str) -> Result<Value> {
        let resp = self
            .http
            .get(self.url(path))
            .header("apikey", &self.config.api_key)
            .send()
            .await?;
        Self::read_body(resp).await
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let resp = self
            .http
            .post(self.url(path))
            .header("apikey", &self.config.api_key)
            .json(body)
            .send()
            .await?;
        Self::read_body(resp).await
    }

    async fn read_body(resp: reqwest::Response) -> Result<Value> {
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ClientError::Unauthorized);
        }

        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ClientError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub async fn connection_state(&self) -> Result<GatewayState> {
        let body = self.get_json("instance/connectionState").await?;
        Ok(GatewayState::parse(&body))
    }

    /// Raw pairing payload, or `None` when the gateway has nothing to pair.
    pub async fn pairing_code(&self) -> Result<Option<String>> {
        let body = self.get_json("instance/connect").await?;
        Ok(body["code"]
            .as_str()
            .filter(|c| !c.is_empty())
            .map(str::to_string))
    }

    async fn poll_once(&self, watcher: &mut ConnectionWatcher) -> Result<Vec<SessionEvent>> {
        let state = self.connection_state().await?;
        let mut events = Vec::new();
        if let Some(event) = watcher.observe_state(&state) {
            events.push(event);
        }
        if !state.is_open() {
            let code = self.pairing_code().await?;
            if let Some(event) = watcher.observe_qr(code) {
                events.push(event);
            }
        }
        Ok(events)
    }

    async fn watch(self, events: mpsc::Sender<SessionEvent>) {
        let mut watcher = ConnectionWatcher::default();
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.config.poll_interval_secs.max(1)));

        loop {
            ticker.tick().await;
            if events.is_closed() {
                break;
            }

            let pending = match self.poll_once(&mut watcher).await {
                Ok(pending) => {
                    watcher.auth_failed = false;
                    pending
                }
                Err(ClientError::Unauthorized) if !watcher.auth_failed => {
                    watcher.auth_failed = true;
                    vec![SessionEvent::AuthFailure(
                        ClientError::Unauthorized.to_string(),
                    )]
                }
                Err(ClientError::Unauthorized) => Vec::new(),
                Err(e) => {
                    tracing::warn!("WhatsApp: gateway poll failed: {}", e);
                    Vec::new()
                }
            };

            for event in pending {
                if events.send(event).await.is_err() {
                    return;
                }
            }
        }
        tracing::debug!("WhatsApp: gateway watcher stopped");
    }
}

/// Turns successive gateway observations into lifecycle events.
#[derive(Debug, Default)]
struct ConnectionWatcher {
    ready: bool,
    last_code: Option<String>,
    auth_failed: bool,
}

impl ConnectionWatcher {
    fn observe_state(&mut self, state: &GatewayState) -> Option<SessionEvent> {
        match (self.ready, state.is_open()) {
            (false, true) => {
                self.ready = true;
                self.last_code = None;
                Some(SessionEvent::Ready)
            }
            (true, false) => {
                self.ready = false;
                let reason = match state {
                    GatewayState::Other(s) if !s.is_empty() => s.clone(),
                    GatewayState::Connecting => "connecting".to_string(),
                    _ => "close".to_string(),
                };
                Some(SessionEvent::Disconnected(reason))
            }
            _ => None,
        }
    }

    fn observe_qr(&mut self, code: Option<String>) -> Option<SessionEvent> {
        let code = code?;
        if self.last_code.as_deref() == Some(code.as_str()) {
            return None;
        }
        self.last_code = Some(code.clone());
        Some(SessionEvent::QrIssued(code))
    }
}

/// Gateway `mediatype` for a MIME type.
fn media_kind(mime_type: &str) -> &'static str {
    match mime_type.split('/').next() {
        Some("image") => "image",
        Some("video") => "video",
        Some("audio") => "audio",
        _ => "document",
    }
}

#[async_trait]
impl SessionClient for GatewayClient {
    async fn initialize(&self, events: mpsc::Sender<SessionEvent>) -> Result<()> {
        tracing::info!(
            "WhatsApp: watching gateway {} (instance '{}', every {}s)",
            self.config.api_url,
            self.config.instance,
            self.config.poll_interval_secs
        );
        tokio::spawn(self.clone().watch(events));
        Ok(())
    }

    async fn is_registered(&self, address: &ChatAddress) -> Result<bool> {
        let body = json!({ "numbers": [address.number()] });
        let resp = self.post_json("chat/whatsappNumbers", &body).await?;
        let checks: Vec<NumberCheck> =
            serde_json::from_value(resp).map_err(|e| ClientError::Decode(e.to_string()))?;

        // A single entry answers the single number asked, even when the
        // gateway echoes it in a different national format.
        if let [check] = checks.as_slice() {
            return Ok(check.exists);
        }
        Ok(checks
            .iter()
            .find(|c| c.number.as_deref().is_none_or(|n| n == address.number()))
            .is_some_and(|c| c.exists))
    }

    async fn send(&self, address: &ChatAddress, payload: OutboundPayload) -> Result<()> {
        match payload {
            OutboundPayload::Text(text) => {
                let body = json!({ "number": address.number(), "text": text });
                self.post_json("message/sendText", &body).await?;
            }
            OutboundPayload::Media(media) => {
                let body = json!({
                    "number": address.number(),
                    "mediatype": media_kind(&media.mime_type),
                    "mimetype": media.mime_type,
                    "media": media.data,
                    "fileName": media.file_name,
                });
                self.post_json("message/sendMedia", &body).await?;
            }
        }
        Ok(())
    }
}
