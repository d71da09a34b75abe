//! Port traits consumed by the services.
//!
//! Storage backends (e.g. `criador-store-sqlite`) implement
//! [`ProfileRepository`] and [`IdentityStore`]; the web layer provides the
//! [`AttachmentStore`] and [`Notifier`]. The services depend on these
//! abstractions only.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::{future::Future, path::PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  animal::{Animal, AnimalDetail, AnimalFields, NewAnimal},
  breeder::{Breed, Breeder, BreederForm, NewBreeder},
  identity::{Identity, Session},
};

// ─── Profile repository ──────────────────────────────────────────────────────

/// CRUD and query access to breeders, breeds, animals and photos.
///
/// The repository does not decide who may see what. Methods that filter by
/// owner take the owner's subject id explicitly; the services choose which
/// ones to call.
pub trait ProfileRepository: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Breeds ────────────────────────────────────────────────────────────

  /// All breeds ordered by name.
  fn list_breeds(
    &self,
  ) -> impl Future<Output = Result<Vec<Breed>, Self::Error>> + Send + '_;

  /// Insert a breed, or return the existing one with the same name.
  fn create_breed(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Breed, Self::Error>> + Send + '_;

  fn breed_exists(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Record that `breeder_id` raises `breed_id`. Idempotent.
  fn link_breed(
    &self,
    breeder_id: i64,
    breed_id: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn breeds_of(
    &self,
    breeder_id: i64,
  ) -> impl Future<Output = Result<Vec<Breed>, Self::Error>> + Send + '_;

  // ── Breeders ──────────────────────────────────────────────────────────

  fn create_breeder(
    &self,
    input: NewBreeder,
  ) -> impl Future<Output = Result<Breeder, Self::Error>> + Send + '_;

  /// True when breeder `id` exists and belongs to `owner`.
  fn breeder_owned_by(
    &self,
    id: i64,
    owner: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn breeders_owned_by(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<Vec<Breeder>, Self::Error>> + Send + '_;

  /// Overwrite the editable attributes of a breeder owned by `owner`.
  /// The owner itself is never changed. Returns `None` if no such row.
  fn update_breeder(
    &self,
    id: i64,
    owner: Uuid,
    profile: BreederForm,
  ) -> impl Future<Output = Result<Option<Breeder>, Self::Error>> + Send + '_;

  // ── Animals ───────────────────────────────────────────────────────────

  fn animal_exists(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Animals whose breeder belongs to `owner`, with breed, breeder and
  /// photos loaded in the same read.
  fn animals_owned_by(
    &self,
    owner: Uuid,
  ) -> impl Future<Output = Result<Vec<AnimalDetail>, Self::Error>> + Send + '_;

  fn find_animal_owned_by(
    &self,
    id: i64,
    owner: Uuid,
  ) -> impl Future<Output = Result<Option<AnimalDetail>, Self::Error>> + Send + '_;

  /// Insert the animal and its photo rows in one transaction.
  fn create_animal(
    &self,
    input: NewAnimal,
  ) -> impl Future<Output = Result<Animal, Self::Error>> + Send + '_;

  /// Update an animal if its stored version still equals
  /// `expected_version`, bumping the version.
  ///
  /// Returns `None` when no row matched: either the row was deleted or
  /// someone else updated it first.
  fn update_animal(
    &self,
    id: i64,
    expected_version: i64,
    fields: AnimalFields,
  ) -> impl Future<Output = Result<Option<Animal>, Self::Error>> + Send + '_;

  /// Delete an animal; its photo rows go with it. Returns `false` if the row
  /// did not exist.
  fn delete_animal(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Identity store ──────────────────────────────────────────────────────────

/// Credentials, email confirmation and sessions.
pub trait IdentityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Onboarding refuses to run against a store without email support.
  fn supports_email(&self) -> bool;

  /// Create an identity with the given login email and password. Fails on
  /// a duplicate email.
  fn create_identity(
    &self,
    email: String,
    password: String,
  ) -> impl Future<Output = Result<Identity, Self::Error>> + Send + '_;

  fn delete_identity(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Issue a fresh confirmation token, replacing any earlier one.
  fn generate_confirmation_token(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// Mark the email confirmed if `token` is the outstanding one.
  fn confirm_email(
    &self,
    subject_id: Uuid,
    token: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// The identity for `email` if `password` matches.
  fn verify_credentials(
    &self,
    email: String,
    password: String,
  ) -> impl Future<Output = Result<Option<Identity>, Self::Error>> + Send + '_;

  fn authenticate_session(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// The session for `token`, unless it was opened before `not_before`.
  /// Sessions older than `not_before` are discarded.
  fn resolve_session(
    &self,
    token: String,
    not_before: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + '_;

  /// Forget a session. Unknown tokens are ignored.
  fn end_session(
    &self,
    token: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Attachment store ────────────────────────────────────────────────────────

/// Durable storage for photo bytes. Paths are relative to the store's root.
pub trait AttachmentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn ensure_directory(
    &self,
    dir: PathBuf,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn write_bytes(
    &self,
    path: PathBuf,
    bytes: Bytes,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Notifier ────────────────────────────────────────────────────────────────

/// Outbound email.
pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send(
    &self,
    to: String,
    subject: String,
    html_body: String,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
