//! Error taxonomy shared by every Criador service.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// A type-erased error coming from one of the ports (store, mailer, disk).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// Field-level, user-correctable problems. All messages are reported.
  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  /// The id is absent, or it belongs to another principal.
  #[error("not found")]
  NotFound,

  /// A concurrent edit won the race for the same row.
  #[error("the record was modified by someone else")]
  Conflict,

  #[error("identity creation failed: {}", .0.join("; "))]
  IdentityCreationFailed(Vec<String>),

  #[error("profile creation failed: {0}")]
  ProfileCreationFailed(#[source] BoxError),

  #[error("notification failed: {0}")]
  NotificationFailed(#[source] BoxError),

  /// Any store failure. The cause is logged, not classified.
  #[error("database access error")]
  Persistence(#[source] BoxError),

  #[error("unauthorized")]
  Unauthorized,

  #[error("the identity store does not support email")]
  EmailUnsupported,
}

impl From<ValidationErrors> for Error {
  fn from(errors: ValidationErrors) -> Self { Self::Validation(errors) }
}

/// Log a port failure once and wrap it as [`Error::Persistence`].
pub(crate) fn persistence<E>(err: E) -> Error
where
  E: std::error::Error + Send + Sync + 'static,
{
  tracing::error!(error = %err, "database access error");
  Error::Persistence(Box::new(err))
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
