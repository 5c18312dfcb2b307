use crate::config::DispatchConfig;
use axum::body::Bytes;
use serde::Serialize;

/// File uploaded alongside a message. Lives only as long as the request.
#[derive(Debug, Clone, Default)]
pub struct Attachment {
    pub bytes: Bytes,
    /// Name the uploader gave the file.
    pub file_name: Option<String>,
    /// Content type the uploader declared for the part.
    pub declared_mime: Option<String>,
}

/// One `/send-message` call
#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub recipient: String,
    pub text: String,
    pub attachment: Option<Attachment>,
}

impl SendRequest {
    pub fn new(recipient: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            text: text.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Names of the required form fields that are empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.recipient.trim().is_empty() {
            missing.push("numero");
        }
        if self.text.trim().is_empty() {
            missing.push("mensaje");
        }
        missing
    }
}

/// Which parts of a request actually went out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub text_sent: bool,
    pub attachment_sent: bool,
}

/// Optional steps of the send pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    pub check_registration: bool,
    pub require_ready: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            check_registration: true,
            require_ready: true,
        }
    }
}

impl From<&DispatchConfig> for DispatchOptions {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            check_registration: config.check_registration,
            require_ready: config.require_ready,
        }
    }
}
