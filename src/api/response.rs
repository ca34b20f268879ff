//! JSON bodies and status codes for pipeline outcomes.
//!
//! Every answer is `{ ok, errors?, error? }` with `Cache-Control: no-store`.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::error::IntakeError;
use crate::pipeline::types::{Accepted, FieldErrors};

pub const METHOD_NOT_ALLOWED_MESSAGE: &str = "Method not allowed";
pub const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please try again shortly.";
pub const STORAGE_FAILED_MESSAGE: &str = "Database error";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Key for messages that belong to no single field.
pub const GLOBAL_ERROR_KEY: &str = "global";

/// Wire shape of every lead endpoint answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadResponse {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LeadResponse {
    pub fn success() -> Self {
        Self {
            ok: true,
            errors: None,
            error: None,
        }
    }

    pub fn field_errors(errors: FieldErrors) -> Self {
        Self {
            ok: false,
            errors: Some(errors),
            error: None,
        }
    }

    pub fn global(message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(GLOBAL_ERROR_KEY.to_string(), message.to_string());
        Self::field_errors(errors)
    }

    pub fn failure(message: &str) -> Self {
        Self {
            ok: false,
            errors: None,
            error: Some(message.to_string()),
        }
    }

    /// Pair the body with a status, marking it uncacheable.
    pub fn with_status(self, status: StatusCode) -> Response {
        let mut resp = (status, Json(self)).into_response();
        resp.headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        resp
    }
}

impl IntakeError {
    pub fn status(&self) -> StatusCode {
        match self {
            IntakeError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            IntakeError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            IntakeError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            IntakeError::Storage(_) | IntakeError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for IntakeError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Store and internal details stay in the logs.
        let body = match self {
            IntakeError::MethodNotAllowed(_) => LeadResponse::global(METHOD_NOT_ALLOWED_MESSAGE),
            IntakeError::RateLimited { .. } => LeadResponse::global(RATE_LIMITED_MESSAGE),
            IntakeError::ValidationFailed(errors) => LeadResponse::field_errors(errors),
            IntakeError::Storage(_) => LeadResponse::failure(STORAGE_FAILED_MESSAGE),
            IntakeError::Internal(_) => LeadResponse::failure(INTERNAL_ERROR_MESSAGE),
        };
        body.with_status(status)
    }
}

impl IntoResponse for Accepted {
    fn into_response(self) -> Response {
        LeadResponse::success().with_status(StatusCode::OK)
    }
}
