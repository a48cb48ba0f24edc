//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  extract::{
    FromRequest, FromRequestParts,
    rejection::{JsonRejection, PathRejection},
  },
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
///
/// Every variant renders as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("authentication required")]
  Unauthorized,

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Validation(String),

  #[error("{0}")]
  Conflict(String),

  #[error("storage unavailable: {0}")]
  StorageUnavailable(String),

  #[error("request timed out")]
  RequestTimeout,

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Validation(_) => StatusCode::BAD_REQUEST,
      ApiError::Conflict(_) => StatusCode::CONFLICT,
      ApiError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      ApiError::RequestTimeout => StatusCode::REQUEST_TIMEOUT,
      ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<outreach_core::Error> for ApiError {
  fn from(err: outreach_core::Error) -> Self {
    use outreach_core::Error as E;
    match err {
      E::NotFound(m) => ApiError::NotFound(m),
      E::Validation(m) => ApiError::Validation(m),
      E::Conflict(m) => ApiError::Conflict(m),
      E::StorageUnavailable(m) => ApiError::StorageUnavailable(m),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { ApiError::Validation(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { ApiError::Validation(rejection.body_text()) }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

// ─── Extractors ──────────────────────────────────────────────────────────────

/// [`axum::Json`] whose rejection is an [`ApiError`], so malformed bodies
/// get the same `{"error": ...}` shape as every other failure.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// [`axum::extract::Path`] with an [`ApiError`] rejection.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);
