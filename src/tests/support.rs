//! Shared test doubles

use crate::client::{self, ChatAddress, ClientError, OutboundPayload, SessionClient};
use crate::event_log::EventLog;
use crate::session::{SessionEvent, SessionState};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Call recorded by [`SpyClient`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    IsRegistered(String),
    Send(String, OutboundPayload),
}

/// Session client that records every call and fails on request
pub struct SpyClient {
    calls: Mutex<Vec<Call>>,
    registered: bool,
    text_error: Option<String>,
    media_error: Option<String>,
    lookup_error: Option<String>,
}

impl SpyClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            registered: true,
            text_error: None,
            media_error: None,
            lookup_error: None,
        }
    }

    pub fn unregistered(mut self) -> Self {
        self.registered = false;
        self
    }

    pub fn failing_text(mut self, message: &str) -> Self {
        self.text_error = Some(message.to_string());
        self
    }

    pub fn failing_media(mut self, message: &str) -> Self {
        self.media_error = Some(message.to_string());
        self
    }

    pub fn failing_lookup(mut self, message: &str) -> Self {
        self.lookup_error = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sends(&self) -> Vec<OutboundPayload> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Send(_, payload) => Some(payload),
                Call::IsRegistered(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl SessionClient for SpyClient {
    async fn initialize(&self, _events: mpsc::Sender<SessionEvent>) -> client::Result<()> {
        Ok(())
    }

    async fn is_registered(&self, address: &ChatAddress) -> client::Result<bool> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::IsRegistered(address.to_string()));
        match &self.lookup_error {
            Some(message) => Err(ClientError::Session(message.clone())),
            None => Ok(self.registered),
        }
    }

    async fn send(&self, address: &ChatAddress, payload: OutboundPayload) -> client::Result<()> {
        let error = match &payload {
            OutboundPayload::Text(_) => self.text_error.clone(),
            OutboundPayload::Media(_) => self.media_error.clone(),
        };
        self.calls
            .lock()
            .unwrap()
            .push(Call::Send(address.to_string(), payload));
        match error {
            Some(message) => Err(ClientError::Session(message)),
            None => Ok(()),
        }
    }
}

pub async fn ready_session() -> SessionState {
    let session = SessionState::new();
    session.on_ready().await;
    session
}

/// Event log backed by a file inside a temp dir; keep the dir alive.
pub fn temp_event_log() -> (tempfile::TempDir, PathBuf, Arc<EventLog>) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("envios.log");
    let log = Arc::new(EventLog::open(&path).unwrap());
    (dir, path, log)
}

pub fn log_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
