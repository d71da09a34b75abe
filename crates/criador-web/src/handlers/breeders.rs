//! Handlers for the caller's breeder profiles.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/breeders` | Caller's breeders with their breeds |
//! | `POST` | `/breeders/{id}/edit` | Body: [`BreederEdit`] |

use axum::{
  Json,
  extract::{Path, State},
};
use criador_core::{
  breeder::{BreederEdit, BreederProfile},
  store::Notifier,
};

use crate::{AppState, Backend, auth::Authenticated, error::Error};

/// `GET /breeders`
pub async fn list<S, N>(
  State(state): State<AppState<S, N>>,
  auth: Authenticated,
) -> Result<Json<Vec<BreederProfile>>, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  let breeders = state.profiles().my_breeders(auth.subject_id()).await?;
  Ok(Json(breeders))
}

/// `POST /breeders/{id}/edit`
pub async fn edit<S, N>(
  State(state): State<AppState<S, N>>,
  auth: Authenticated,
  Path(id): Path<i64>,
  Json(edit): Json<BreederEdit>,
) -> Result<Json<BreederProfile>, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  let profile = state
    .profiles()
    .edit_breeder(auth.subject_id(), id, edit)
    .await?;
  Ok(Json(profile))
}
