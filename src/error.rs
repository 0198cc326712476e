//! Unified relay error type.
//!
//! Every route handler returns `Result<HttpResponse, RelayError>`; the
//! [`ResponseError`] impl is the catch-all boundary that turns any failure
//! into a JSON body with the right status code, so nothing downstream can
//! surface as an unhandled fault.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Returned to the caller when the upstream reply carries no usable message.
const UPSTREAM_FALLBACK_MESSAGE: &str = "Upstream API error";

/// All errors that can occur in the relay request lifecycle.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The caller sent a missing or malformed field.
    #[error("{0}")]
    Validation(String),

    /// A required server-side setting is absent.
    #[error("{0}")]
    Configuration(String),

    /// The upstream API failed a call or returned an unexpected shape.
    #[error("{message}")]
    Upstream {
        /// HTTP status reported by upstream, when the call got that far.
        status: Option<u16>,
        message: String,
    },

    /// The asynchronous run never reached a terminal state in time.
    #[error("run did not complete within {attempts} status checks")]
    Timeout { attempts: u32 },
}

/// Shape of the standard upstream error body: `{"error": {"message": ...}}`.
#[derive(Deserialize)]
struct UpstreamErrorBody {
    error: UpstreamErrorDetail,
}

#[derive(Deserialize)]
struct UpstreamErrorDetail {
    message: String,
}

impl RelayError {
    /// Build an upstream error from a non-success reply, preferring the
    /// message inside the upstream error body over the fixed fallback.
    pub fn from_upstream(status: u16, body: Option<&str>) -> Self {
        let message = body
            .and_then(|text| serde_json::from_str::<UpstreamErrorBody>(text).ok())
            .map(|parsed| parsed.error.message)
            .unwrap_or_else(|| UPSTREAM_FALLBACK_MESSAGE.to_string());
        RelayError::Upstream {
            status: Some(status),
            message,
        }
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(e: reqwest::Error) -> Self {
        RelayError::Upstream {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

impl ResponseError for RelayError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            RelayError::Validation(message) => json!({ "error": message }),
            RelayError::Configuration(message) => {
                error!("Configuration error: {message}");
                json!({ "error": message })
            }
            RelayError::Upstream { status, message } => {
                match status {
                    Some(code) => error!("Upstream call failed with status {code}: {message}"),
                    None => error!("Upstream call failed: {message}"),
                }
                json!({ "error": "Upstream request failed", "details": message })
            }
            RelayError::Timeout { .. } => {
                error!("{self}");
                json!({ "error": "Run timed out", "details": self.to_string() })
            }
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
