//! `/send-message` body parsing
//!
//! Accepts `multipart/form-data` (with an optional file) or a JSON object
//! carrying only the text fields. Any other body reads as an empty form, so
//! the dispatcher reports the missing fields.

use crate::dispatch::{Attachment, SendRequest};
use axum::Json;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Multipart, Request};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::{Value, json};

pub const FIELD_NUMBER: &str = "numero";
pub const FIELD_TEXT: &str = "mensaje";
pub const FIELD_ATTACHMENT: &str = "pdf";

/// Send request extracted from either body encoding
#[derive(Debug)]
pub struct SendForm(pub SendRequest);

/// Unreadable request body, answered as `{"error": ...}`
#[derive(Debug)]
pub struct FormRejection {
    status: StatusCode,
    message: String,
}

impl IntoResponse for FormRejection {
    fn into_response(self) -> Response {
        tracing::warn!("Rejected send form: {}", self.message);
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<MultipartRejection> for FormRejection {
    fn from(e: MultipartRejection) -> Self {
        Self {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl From<MultipartError> for FormRejection {
    fn from(e: MultipartError) -> Self {
        Self {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl From<JsonRejection> for FormRejection {
    fn from(e: JsonRejection) -> Self {
        Self {
            status: e.status(),
            message: e.body_text(),
        }
    }
}

impl<S> FromRequest<S> for SendForm
where
    S: Send + Sync,
{
    type Rejection = FormRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let essence = content_type.split(';').next().unwrap_or_default().trim();

        if essence == "multipart/form-data" {
            let multipart = Multipart::from_request(req, state).await?;
            Ok(Self(read_send_form(multipart).await?))
        } else if essence == "application/json" || essence.ends_with("+json") {
            let Json(body) = Json::<JsonSendForm>::from_request(req, state).await?;
            Ok(Self(body.into()))
        } else {
            tracing::debug!("Unsupported body type '{}', reading as empty form", essence);
            Ok(Self(SendRequest::default()))
        }
    }
}

/// Collect the known fields of a send form. Unknown fields are skipped; an
/// empty file part without a name counts as no attachment.
pub async fn read_send_form(mut multipart: Multipart) -> Result<SendRequest, MultipartError> {
    let mut request = SendRequest::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            FIELD_NUMBER => request.recipient = field.text().await?,
            FIELD_TEXT => request.text = field.text().await?,
            FIELD_ATTACHMENT => {
                let file_name = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .map(str::to_string);
                let declared_mime = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;

                if bytes.is_empty() && file_name.is_none() {
                    continue;
                }
                request.attachment = Some(Attachment {
                    bytes,
                    file_name,
                    declared_mime,
                });
            }
            other => tracing::debug!("Ignoring form field '{}'", other),
        }
    }

    Ok(request)
}

/// JSON body: text fields only, no attachment.
#[derive(Debug, Deserialize)]
struct JsonSendForm {
    #[serde(default, rename = "numero")]
    recipient: Option<Value>,
    #[serde(default, rename = "mensaje")]
    text: Option<Value>,
}

impl From<JsonSendForm> for SendRequest {
    fn from(body: JsonSendForm) -> Self {
        SendRequest::new(field_text(body.recipient), field_text(body.text))
    }
}

/// Numbers are often posted as JSON numbers; anything else non-textual is
/// treated as absent.
fn field_text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_fields_accept_strings_and_numbers() {
        let body: JsonSendForm =
            serde_json::from_value(json!({"numero": 5215512345678u64, "mensaje": "hola"}))
                .unwrap();
        let request = SendRequest::from(body);
        assert_eq!(request.recipient, "5215512345678");
        assert_eq!(request.text, "hola");
        assert!(request.attachment.is_none());
    }

    #[test]
    fn test_json_non_text_fields_count_as_missing() {
        let body: JsonSendForm =
            serde_json::from_value(json!({"numero": null, "mensaje": ["hola"], "extra": 1}))
                .unwrap();
        let request = SendRequest::from(body);
        assert_eq!(request.missing_fields(), vec!["numero", "mensaje"]);
    }
}
