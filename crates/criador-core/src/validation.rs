//! Accumulating field validation.
//!
//! Validation never stops at the first problem: every check pushes into a
//! [`ValidationErrors`] and the caller decides at the end whether to proceed.

use std::{fmt, sync::OnceLock};

use regex::Regex;
use serde::Serialize;

use crate::Error;

pub const BREED_REQUIRED: &str = "breed required";
pub const BREEDER_REQUIRED: &str = "breeder required";
pub const NOT_AN_IMAGE: &str = "must be an image";
pub const UNKNOWN_BREED: &str = "unknown breed";

/// A single rejected field and the reason shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
  pub fn push(&mut self, field: &str, message: impl Into<String>) {
    self.0.push(FieldError {
      field:   field.to_owned(),
      message: message.into(),
    });
  }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &FieldError> { self.0.iter() }

  /// True when any accumulated message equals `message`.
  pub fn contains(&self, message: &str) -> bool {
    self.0.iter().any(|e| e.message == message)
  }

  /// `Ok(())` when nothing was pushed, otherwise [`Error::Validation`].
  pub fn into_result(self) -> Result<(), Error> {
    if self.is_empty() { Ok(()) } else { Err(Error::Validation(self)) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for e in &self.0 {
      if !first {
        f.write_str("; ")?;
      }
      write!(f, "{}: {}", e.field, e.message)?;
      first = false;
    }
    Ok(())
  }
}

static EMAIL_RE: OnceLock<Regex> = OnceLock::new();

/// Loose syntactic check: one `@`, no whitespace, a dot in the domain.
pub fn is_valid_email(address: &str) -> bool {
  EMAIL_RE
    .get_or_init(|| {
      Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .unwrap_or_else(|e| panic!("email regex failed to compile: {e}"))
    })
    .is_match(address)
}

/// Returns the trimmed value, or pushes `message` when it is blank.
pub(crate) fn required<'a>(
  errors: &mut ValidationErrors,
  field: &str,
  value: &'a str,
  message: &str,
) -> Option<&'a str> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    errors.push(field, message);
    None
  } else {
    Some(trimmed)
  }
}
