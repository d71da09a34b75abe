//! HTTP layer for Criador.
//!
//! Exposes an axum [`Router`] over the onboarding, animal and breeder
//! services, backed by any store implementing both [`ProfileRepository`] and
//! [`IdentityStore`].

pub mod attachments;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod notify;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use chrono::TimeDelta;
use criador_core::{
  animals::AnimalManager,
  onboarding::{Onboarding, OnboardingSettings, PasswordPolicy},
  profiles::Profiles,
  store::{IdentityStore, Notifier, ProfileRepository},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use attachments::FsAttachmentStore;
use handlers::{account, animals, breeders};

/// Largest accepted `POST /animals` body.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `CRIADOR_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                      String,
  pub port:                      u16,
  /// Public URL used in confirmation links.
  pub base_url:                  String,
  pub store_path:                PathBuf,
  /// Root under which photos are written (in an `images/` subdirectory).
  pub attachments_dir:           PathBuf,
  pub require_confirmed_account: bool,
  pub password_min_len:          usize,
  pub password_max_len:          usize,
  /// Hours a session stays valid after sign-in.
  pub session_ttl_hours:         u32,
  /// Breeds inserted at startup if missing.
  pub seed_breeds:               Vec<String>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let policy = PasswordPolicy::default();
    Self {
      host:                      "127.0.0.1".to_string(),
      port:                      8080,
      base_url:                  "http://localhost:8080".to_string(),
      store_path:                PathBuf::from("criador.db"),
      attachments_dir:           PathBuf::from("wwwroot"),
      require_confirmed_account: true,
      password_min_len:          policy.min_len,
      password_max_len:          policy.max_len,
      session_ttl_hours:         24 * 7,
      seed_breeds:               Vec::new(),
    }
  }
}

impl ServerConfig {
  pub fn onboarding_settings(&self) -> OnboardingSettings {
    OnboardingSettings {
      base_url:                  self.base_url.clone(),
      require_confirmed_account: self.require_confirmed_account,
      password_policy:           PasswordPolicy {
        min_len: self.password_min_len,
        max_len: self.password_max_len,
      },
      session_ttl:               TimeDelta::hours(i64::from(self.session_ttl_hours)),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// A store that holds both the profiles and the identities.
pub trait Backend: ProfileRepository + IdentityStore + 'static {}

impl<T: ProfileRepository + IdentityStore + 'static> Backend for T {}

/// Shared state threaded through all axum handlers.
pub struct AppState<S, N> {
  pub store:       Arc<S>,
  pub attachments: Arc<FsAttachmentStore>,
  pub notifier:    Arc<N>,
  pub settings:    Arc<OnboardingSettings>,
}

impl<S, N> Clone for AppState<S, N> {
  fn clone(&self) -> Self {
    Self {
      store:       Arc::clone(&self.store),
      attachments: Arc::clone(&self.attachments),
      notifier:    Arc::clone(&self.notifier),
      settings:    Arc::clone(&self.settings),
    }
  }
}

impl<S: Backend, N: Notifier> AppState<S, N> {
  pub fn onboarding(&self) -> Onboarding<'_, S, S, N> {
    Onboarding::new(&*self.store, &*self.store, &*self.notifier, &self.settings)
  }

  pub fn animals(&self) -> AnimalManager<'_, S, FsAttachmentStore> {
    AnimalManager::new(&*self.store, &*self.attachments)
  }

  pub fn profiles(&self) -> Profiles<'_, S> { Profiles::new(&*self.store) }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the Criador server.
pub fn router<S, N>(state: AppState<S, N>) -> Router
where
  S: Backend,
  N: Notifier + 'static,
{
  Router::new()
    // Accounts
    .route("/register",            post(account::register::<S, N>))
    .route("/login",               post(account::login::<S, N>))
    .route("/logout",              post(account::logout::<S, N>))
    .route("/confirm-email",       get(account::confirm_email::<S, N>))
    // Animals
    .route(
      "/animals",
      get(animals::list::<S, N>)
        .post(animals::create::<S, N>)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
    .route("/animals/new",         get(animals::form_options::<S, N>))
    .route("/animals/{id}",        get(animals::detail::<S, N>))
    .route(
      "/animals/{id}/edit",
      get(animals::edit_form::<S, N>).post(animals::edit::<S, N>),
    )
    .route("/animals/{id}/delete", post(animals::delete::<S, N>))
    // Breeders
    .route("/breeders",            get(breeders::list::<S, N>))
    .route("/breeders/{id}/edit",  post(breeders::edit::<S, N>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
