//! Uniform response envelope.
//!
//! Every outcome, success or failure, is rendered as
//! `{success, code, message, data, timestamp}`.

use crate::error::{ConflagentError, ErrorCode};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub success: bool,
    pub code: ErrorCode,
    pub message: String,
    pub data: Option<JsonValue>,
    pub timestamp: String,
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl ResponseEnvelope {
    pub fn success(message: impl Into<String>, data: impl Serialize) -> Self {
        // Response models are plain structs; serializing them cannot fail.
        let data = serde_json::to_value(data).unwrap_or(JsonValue::Null);
        Self {
            success: true,
            code: ErrorCode::Ok,
            message: message.into(),
            data: Some(data),
            timestamp: timestamp(),
        }
    }

    pub fn failure(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            success: false,
            code,
            message: message.into(),
            data: None,
            timestamp: timestamp(),
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn into_response(self) -> HttpResponse {
        HttpResponse::build(self.status()).json(self)
    }
}

/// `200 OK` with `data` wrapped in the envelope.
pub fn ok(message: impl Into<String>, data: impl Serialize) -> HttpResponse {
    ResponseEnvelope::success(message, data).into_response()
}

impl ResponseError for ConflagentError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.code().http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        if let ConflagentError::Internal(detail) = self {
            let correlation_id = uuid::Uuid::new_v4();
            log::error!("Internal error [{}]: {}", correlation_id, detail);
        }
        ResponseEnvelope::failure(self.code(), self.public_message()).into_response()
    }
}
