//! Handlers for sign-up, sign-in, sign-out and email confirmation.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/register` | Body: [`RegisterForm`]; 201 |
//! | `POST` | `/login` | Body: `{"email":…,"password":…}` |
//! | `POST` | `/logout` | Ends the caller's session; 204 |
//! | `GET`  | `/confirm-email` | `?subject_id=…&code=…` |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use criador_core::{
  identity::Session,
  onboarding::RegisterForm,
  store::{IdentityStore, Notifier},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{AppState, Backend, auth::Authenticated, error::Error};

// ─── Register ────────────────────────────────────────────────────────────────

/// `POST /register`
pub async fn register<S, N>(
  State(state): State<AppState<S, N>>,
  Json(form): Json<RegisterForm>,
) -> Result<impl IntoResponse, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  let registration = state.onboarding().register(form).await?;
  Ok((StatusCode::CREATED, Json(registration)))
}

// ─── Login ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /login`
pub async fn login<S, N>(
  State(state): State<AppState<S, N>>,
  Json(body): Json<LoginBody>,
) -> Result<Json<Session>, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  let session = state.onboarding().sign_in(&body.email, &body.password).await?;
  tracing::info!(subject_id = %session.subject_id, "signed in");
  Ok(Json(session))
}

/// `POST /logout`
pub async fn logout<S, N>(
  State(state): State<AppState<S, N>>,
  Authenticated(session): Authenticated,
) -> Result<StatusCode, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  let subject_id = session.subject_id;
  IdentityStore::end_session(&*state.store, session.token)
    .await
    .map_err(Error::store)?;
  tracing::info!(%subject_id, "signed out");
  Ok(StatusCode::NO_CONTENT)
}

// ─── Confirm ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ConfirmParams {
  pub subject_id: Uuid,
  pub code:       String,
}

/// `GET /confirm-email?subject_id=…&code=…`
pub async fn confirm_email<S, N>(
  State(state): State<AppState<S, N>>,
  Query(params): Query<ConfirmParams>,
) -> Result<impl IntoResponse, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  state
    .onboarding()
    .confirm_email(params.subject_id, &params.code)
    .await?;
  Ok(Json(json!({ "confirmed": true })))
}
