//! WhatsApp Session Client
//!
//! The relay never speaks the WhatsApp protocol itself. A [`SessionClient`]
//! owns the authenticated session, reports lifecycle changes as
//! [`SessionEvent`]s and performs the actual sends. [`GatewayClient`] drives a
//! locally-run WhatsApp REST gateway.

mod error;
mod gateway;

pub use error::{ClientError, Result};
pub use gateway::{GatewayClient, GatewayState};

use crate::session::SessionEvent;
use async_trait::async_trait;
use std::fmt;
use tokio::sync::mpsc;

/// Suffix WhatsApp uses for individual chats.
pub const ADDRESS_SUFFIX: &str = "@c.us";

/// Normalized chat address (`<number>@c.us`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatAddress(String);

impl ChatAddress {
    /// No format validation is done here; bad numbers are caught by the
    /// registration lookup or the send itself.
    pub fn from_number(number: &str) -> Self {
        Self(format!("{}{}", number.trim(), ADDRESS_SUFFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The raw number without the chat suffix.
    pub fn number(&self) -> &str {
        self.0.strip_suffix(ADDRESS_SUFFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for ChatAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// File attachment ready for transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub mime_type: String,
    /// Base64-encoded file contents.
    pub data: String,
    pub file_name: String,
}

/// What a single send call delivers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundPayload {
    Text(String),
    Media(MediaPayload),
}

/// Connection to the messaging platform
#[async_trait]
pub trait SessionClient: Send + Sync {
    /// Start the session. Lifecycle changes are pushed into `events` for as
    /// long as the receiver is alive.
    async fn initialize(&self, events: mpsc::Sender<SessionEvent>) -> Result<()>;

    /// Whether `address` belongs to a WhatsApp account.
    async fn is_registered(&self, address: &ChatAddress) -> Result<bool>;

    async fn send(&self, address: &ChatAddress, payload: OutboundPayload) -> Result<()>;
}
