//! Error taxonomy for the gateway core and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

/// Errors surfaced by the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
  /// Login failed: network error, rejected credentials, or no session cookie
  /// in the response.
  #[error("authentication failed: {0}")]
  Auth(String),

  /// Upstream answered with a non-success status, after the single post-401
  /// retry where applicable.
  #[error("upstream returned status {status}")]
  Upstream { status: u16, body: String },

  /// Transport-level failure talking to upstream.
  #[error("upstream request failed: {0}")]
  Http(#[from] reqwest::Error),

  /// Upstream returned a body that could not be decoded.
  #[error("failed to decode upstream response: {0}")]
  Decode(#[from] serde_json::Error),

  /// Caller request is missing required fields.
  #[error("missing required fields: {}", .missing.join(", "))]
  Validation { missing: Vec<String> },
}

impl GatewayError {
  /// Map to the HTTP status returned to the gateway's own callers.
  ///
  /// Upstream statuses are relayed as-is; everything that went wrong between
  /// the gateway and upstream is a bad-gateway condition.
  pub fn http_status(&self) -> StatusCode {
    match self {
      GatewayError::Validation { .. } => StatusCode::BAD_REQUEST,
      GatewayError::Upstream { status, .. } => {
        StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
      }
      GatewayError::Auth(_) | GatewayError::Http(_) | GatewayError::Decode(_) => {
        StatusCode::BAD_GATEWAY
      }
    }
  }
}

impl IntoResponse for GatewayError {
  fn into_response(self) -> Response {
    let status = self.http_status();
    let body = match &self {
      GatewayError::Validation { missing } => json!({
        "error": self.to_string(),
        "missing_fields": missing,
      }),
      // Relay the upstream body verbatim when it is JSON, otherwise wrap it.
      GatewayError::Upstream { body, .. } => serde_json::from_str::<Value>(body)
        .unwrap_or_else(|_| {
          if body.is_empty() {
            json!({ "error": self.to_string() })
          } else {
            json!({ "error": body })
          }
        }),
      _ => json!({ "error": self.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}
