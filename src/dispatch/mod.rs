//! Message Dispatch
//!
//! Validates and executes a single outbound send: readiness gate,
//! registration lookup, text, then the optional attachment. Every step that
//! matters to an operator is appended to the event log.

mod error;
mod types;


pub use error::DispatchError;
pub use types::{Attachment, DeliveryReport, DispatchOptions, SendRequest};

use crate::client::{ChatAddress, ClientError, MediaPayload, OutboundPayload, SessionClient};
use crate::event_log::EventLog;
use crate::session::SessionState;
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use std::sync::Arc;

/// MIME type used when the file name gives no hint.
pub const DEFAULT_ATTACHMENT_MIME: &str = "application/pdf";
/// File name used when the upload carried none.
pub const DEFAULT_ATTACHMENT_NAME: &str = "archivo.pdf";

/// Executes send requests against a session client
pub struct Dispatcher {
    client: Arc<dyn SessionClient>,
    session: SessionState,
    log: Arc<EventLog>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(
        client: Arc<dyn SessionClient>,
        session: SessionState,
        log: Arc<EventLog>,
        options: DispatchOptions,
    ) -> Self {
        Self {
            client,
            session,
            log,
            options,
        }
    }

    /// Send the text and then, only if that worked, the attachment.
    ///
    /// A text that went out is never rolled back; if the attachment fails the
    /// returned [`DispatchError::SendFailure`] reports `text_sent = true`.
    pub async fn dispatch(&self, request: SendRequest) -> Result<DeliveryReport, DispatchError> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(self.fail(DispatchError::MissingFields { fields: missing }));
        }

        let number = request.recipient.trim().to_string();

        if self.options.require_ready && !self.session.is_ready().await {
            return Err(self.fail(DispatchError::NotReady { number }));
        }

        let address = ChatAddress::from_number(&number);
        let mut report = DeliveryReport::default();

        if self.options.check_registration {
            match self.client.is_registered(&address).await {
                Ok(true) => {}
                Ok(false) => return Err(self.fail(DispatchError::NotRegistered { number })),
                Err(e) => return Err(self.fail(send_failure(&number, e, report))),
            }
        }

        if let Err(e) = self
            .client
            .send(&address, OutboundPayload::Text(request.text.clone()))
            .await
        {
            return Err(self.fail(send_failure(&number, e, report)));
        }
        report.text_sent = true;
        self.log
            .record(format!("Message sent to {}: {}", number, request.text));

        if let Some(attachment) = request.attachment {
            let media = encode_attachment(&attachment);
            let file_name = media.file_name.clone();
            tracing::debug!(
                "Attachment {} resolved to {} (declared {:?}, {} bytes)",
                file_name,
                media.mime_type,
                attachment.declared_mime,
                attachment.bytes.len()
            );

            if let Err(e) = self
                .client
                .send(&address, OutboundPayload::Media(media))
                .await
            {
                return Err(self.fail(send_failure(&number, e, report)));
            }
            report.attachment_sent = true;
            self.log
                .record(format!("Attachment sent to {}: {}", number, file_name));
        }

        Ok(report)
    }

    fn fail(&self, error: DispatchError) -> DispatchError {
        self.log.record(error.to_string());
        error
    }
}

fn send_failure(number: &str, error: ClientError, report: DeliveryReport) -> DispatchError {
    let detail = error.to_string();
    DispatchError::SendFailure {
        number: number.to_string(),
        detail: if detail.trim().is_empty() {
            "unknown error".to_string()
        } else {
            detail
        },
        report,
    }
}

/// MIME type for an uploaded file, judged by its extension.
pub fn attachment_mime(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| mime_guess::from_path(name).first())
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_ATTACHMENT_MIME.to_string())
}

fn encode_attachment(attachment: &Attachment) -> MediaPayload {
    let file_name = attachment
        .file_name
        .as_deref()
        .filter(|n| !n.trim().is_empty());

    MediaPayload {
        mime_type: attachment_mime(file_name),
        data: B64.encode(&attachment.bytes),
        file_name: file_name.unwrap_or(DEFAULT_ATTACHMENT_NAME).to_string(),
    }
}
