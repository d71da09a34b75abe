//! Error types and axum `IntoResponse` implementation.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use criador_core::BoxError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] criador_core::Error),
  #[error("unauthorized")]
  Unauthorized,
  #[error("missing or invalid anti-forgery token")]
  Forbidden,
  #[error("bad request: {0}")]
  BadRequest(String),
  #[error("store error: {0}")]
  Store(#[source] BoxError),
}

impl Error {
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

fn unauthorized() -> Response {
  let mut res =
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": "unauthorized" }))).into_response();
  res
    .headers_mut()
    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
  res
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    use criador_core::Error as Core;

    let (status, message) = match self {
      Error::Unauthorized | Error::Core(Core::Unauthorized) => return unauthorized(),
      Error::Core(Core::Validation(errors)) => {
        return (StatusCode::BAD_REQUEST, Json(json!({ "errors": errors }))).into_response();
      }
      Error::Core(Core::IdentityCreationFailed(reasons)) => {
        let body = json!({ "error": "identity creation failed", "reasons": reasons });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response();
      }
      Error::Core(e @ Core::NotFound) => (StatusCode::NOT_FOUND, e.to_string()),
      Error::Core(e @ Core::Conflict) => (StatusCode::CONFLICT, e.to_string()),
      Error::Core(e @ Core::NotificationFailed(_)) => (StatusCode::BAD_GATEWAY, e.to_string()),
      Error::Core(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
      Error::Forbidden => (StatusCode::FORBIDDEN, "missing or invalid anti-forgery token".into()),
      Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
      Error::Store(e) => {
        tracing::error!(error = %e, "store error");
        (StatusCode::INTERNAL_SERVER_ERROR, "database access error".into())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
