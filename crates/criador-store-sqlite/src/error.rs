//! Error type for `criador-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored value is outside the domain of its column.
  #[error("invalid value in column {column}: {value:?}")]
  InvalidColumn { column: &'static str, value: String },

  #[error("email {0} is already taken")]
  DuplicateEmail(String),

  #[error("password hashing failed: {0}")]
  Password(String),

  #[error("identity not found: {0}")]
  IdentityNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
