//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  #[error("invalid or missing API key")]
  Unauthorized,

  #[error("store error: {0}")]
  Store(String),
}

impl From<pathway_core::Error> for ApiError {
  fn from(e: pathway_core::Error) -> Self {
    use pathway_core::Error as E;
    match &e {
      E::NotFound(_) | E::UnknownParent(_) => Self::NotFound(e.to_string()),
      E::SeqConflict { .. } => Self::Conflict(e.to_string()),
      E::StoreFailure(_) => Self::Store(e.to_string()),
      E::InvalidEnvelope(_)
      | E::UnknownEventKind(_)
      | E::PayloadSchemaMismatch { .. }
      | E::SessionIdShape(_)
      | E::EventIdShape(_)
      | E::Serialization(_) => Self::BadRequest(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unauthorized => {
        (StatusCode::UNAUTHORIZED, self.to_string())
      }
      ApiError::Store(m) => {
        (StatusCode::INTERNAL_SERVER_ERROR, m.clone())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
