//! Breeders and breeds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{ValidationErrors, is_valid_email, required};

/// Reference data; never edited through the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breed {
  pub id:   i64,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breeder {
  pub id:               i64,
  pub name:             String,
  pub commercial_name:  Option<String>,
  pub address:          String,
  pub postal_code:      String,
  pub phone:            Option<String>,
  pub email:            String,
  /// `None` for breeders recorded before accounts existed.
  pub owner_subject_id: Option<Uuid>,
}

/// A breeder together with the breeds it raises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreederProfile {
  pub breeder: Breeder,
  pub breeds:  Vec<Breed>,
}

/// Editable breeder attributes as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreederForm {
  pub name:            String,
  #[serde(default)]
  pub commercial_name: Option<String>,
  pub address:         String,
  pub postal_code:     String,
  #[serde(default)]
  pub phone:           Option<String>,
  /// Filled from the login email during registration.
  #[serde(default)]
  pub email:           String,
}

impl BreederForm {
  /// Checks the attributes every breeder must have, except the email.
  pub fn validate_profile(&self, errors: &mut ValidationErrors) {
    required(errors, "breeder.name", &self.name, "name is required");
    required(errors, "breeder.address", &self.address, "address is required");
    required(
      errors,
      "breeder.postal_code",
      &self.postal_code,
      "postal code is required",
    );
  }

  /// Full check used when a breeder edits its profile.
  pub fn validate(&self, errors: &mut ValidationErrors) {
    self.validate_profile(errors);
    if !is_valid_email(self.email.trim()) {
      errors.push("breeder.email", "email must be a valid address");
    }
  }

  /// Blank optional fields are stored as `NULL`.
  pub fn normalized(self) -> Self {
    Self {
      name:            self.name.trim().to_owned(),
      commercial_name: non_blank(self.commercial_name),
      address:         self.address.trim().to_owned(),
      postal_code:     self.postal_code.trim().to_owned(),
      phone:           non_blank(self.phone),
      email:           self.email.trim().to_owned(),
    }
  }
}

/// A profile edit: new attributes plus breeds the breeder starts raising.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreederEdit {
  #[serde(flatten)]
  pub profile:   BreederForm,
  /// Added to the breeder's breeds; breeds already linked stay linked.
  #[serde(default)]
  pub breed_ids: Vec<i64>,
}

/// Input to [`ProfileRepository::create_breeder`](crate::store::ProfileRepository::create_breeder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBreeder {
  pub profile:          BreederForm,
  pub owner_subject_id: Option<Uuid>,
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
  value
    .map(|v| v.trim().to_owned())
    .filter(|v| !v.is_empty())
}
