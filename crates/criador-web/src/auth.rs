//! Session extractor: bearer token plus anti-forgery check.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::Utc;
use criador_core::{identity::Session, store::{IdentityStore, Notifier}};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{AppState, Backend, error::Error};

/// Header carrying the session's anti-forgery token on mutating requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// The signed-in principal. Extracting it rejects the request with 401
/// when there is no valid session, and with 403 when a mutating request
/// lacks the session's anti-forgery token.
pub struct Authenticated(pub Session);

impl Authenticated {
  pub fn subject_id(&self) -> Uuid { self.0.subject_id }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, Error> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .ok_or(Error::Unauthorized)
}

/// Check the anti-forgery header against the session.
pub fn verify_csrf(headers: &HeaderMap, session: &Session) -> Result<(), Error> {
  let presented = headers
    .get(CSRF_HEADER)
    .and_then(|v| v.to_str().ok())
    .ok_or(Error::Forbidden)?;
  if !same_token(presented, &session.csrf_token) {
    return Err(Error::Forbidden);
  }
  Ok(())
}

/// Compares the digests of both tokens in constant time.
fn same_token(presented: &str, expected: &str) -> bool {
  let presented = Sha256::digest(presented.as_bytes());
  let expected = Sha256::digest(expected.as_bytes());
  presented
    .iter()
    .zip(expected.iter())
    .fold(0u8, |acc, (a, b)| acc | (a ^ b))
    == 0
}

impl<S, N> FromRequestParts<AppState<S, N>> for Authenticated
where
  S: Backend,
  N: Notifier + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, N>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers)?.to_owned();
    let not_before = state.settings.session_cutoff(Utc::now());
    let session = IdentityStore::resolve_session(&*state.store, token, not_before)
      .await
      .map_err(Error::store)?
      .ok_or(Error::Unauthorized)?;

    if !parts.method.is_safe() {
      verify_csrf(&parts.headers, &session)?;
    }
    Ok(Authenticated(session))
  }
}
