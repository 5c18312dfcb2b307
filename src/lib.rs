//! WhatsApp Relay
//!
//! Small HTTP front for a WhatsApp session: fetch the pairing QR, poll
//! readiness, and send a text message with an optional file attachment.

pub mod api;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod event_log;
pub mod logging;
pub mod server;
pub mod session;

#[cfg(test)]
mod tests;
