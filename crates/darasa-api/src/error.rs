//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use darasa_core::store::StoreError;
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("unauthorized: {0}")]
  Unauthorized(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Classify a store error by the domain error behind it. Anything without
  /// one is an infrastructure failure.
  pub fn from_store<E: StoreError>(e: E) -> Self {
    let Some(domain) = e.domain() else {
      return Self::Store(Box::new(e));
    };
    let message = domain.to_string();
    if domain.is_validation() {
      Self::BadRequest(message)
    } else if domain.is_not_found() {
      Self::NotFound(message)
    } else if domain.is_conflict() {
      Self::Conflict(message)
    } else if domain.is_forbidden() {
      Self::Forbidden(message)
    } else {
      Self::Store(Box::new(e))
    }
  }
}

impl From<darasa_core::Error> for ApiError {
  fn from(e: darasa_core::Error) -> Self {
    let message = e.to_string();
    if e.is_not_found() {
      Self::NotFound(message)
    } else if e.is_conflict() {
      Self::Conflict(message)
    } else if e.is_forbidden() {
      Self::Forbidden(message)
    } else {
      Self::BadRequest(message)
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Store(e) => {
        tracing::error!(error = %e, "store operation failed");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          "operation failed, retry".to_owned(),
        )
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
