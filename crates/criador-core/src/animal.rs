//! Animals and their photos.

use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  breeder::{Breed, Breeder},
  price::Price,
};

/// Photo attached when an animal is created without one.
pub const SENTINEL_PHOTO_FILENAME: &str = "noAnimal.jpg";
pub const SENTINEL_PHOTO_LOCATION: &str = "no image";

/// Content types accepted for uploaded photos.
pub const ACCEPTED_PHOTO_TYPES: [&str; 2] = ["image/jpeg", "image/png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
  #[serde(rename = "M")]
  Male,
  #[serde(rename = "F")]
  Female,
}

impl Sex {
  pub fn code(self) -> &'static str {
    match self {
      Self::Male => "M",
      Self::Female => "F",
    }
  }

  pub fn from_code(code: &str) -> Option<Self> {
    match code.trim() {
      "M" | "m" => Some(Self::Male),
      "F" | "f" => Some(Self::Female),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
  pub id:               i64,
  pub animal_id:        i64,
  pub filename:         String,
  /// Empty means the file sits next to the default assets.
  pub storage_location: String,
  /// When the photo was associated, not when it was taken.
  pub captured_at:      DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPhoto {
  pub filename:         String,
  pub storage_location: String,
  pub captured_at:      DateTime<Utc>,
}

impl NewPhoto {
  pub fn sentinel(captured_at: DateTime<Utc>) -> Self {
    Self {
      filename: SENTINEL_PHOTO_FILENAME.to_owned(),
      storage_location: SENTINEL_PHOTO_LOCATION.to_owned(),
      captured_at,
    }
  }
}

/// The persisted, validated attributes of an animal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalFields {
  pub name:            String,
  pub sex:             Sex,
  pub birth_date:      NaiveDate,
  /// `None` means the animal was born at the breeder's premises.
  pub purchase_date:   Option<NaiveDate>,
  pub purchase_price:  Price,
  pub registry_number: Option<String>,
  pub breed_id:        i64,
  pub breeder_id:      i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Animal {
  pub id:      i64,
  #[serde(flatten)]
  pub fields:  AnimalFields,
  /// Row version used to detect concurrent edits.
  pub version: i64,
  pub photos:  Vec<Photo>,
}

/// Animal joined with its breed and owning breeder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalDetail {
  pub animal:  Animal,
  pub breed:   Breed,
  pub breeder: Breeder,
}

/// Input to [`ProfileRepository::create_animal`](crate::store::ProfileRepository::create_animal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAnimal {
  pub fields: AnimalFields,
  pub photos: Vec<NewPhoto>,
}

/// Raw animal attributes as submitted by a client.
///
/// Everything is text (or a zero id) so that malformed input becomes a
/// validation message instead of a rejected request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimalForm {
  pub name:            String,
  pub sex:             String,
  pub birth_date:      Option<String>,
  pub purchase_date:   Option<String>,
  pub purchase_price:  Option<String>,
  pub registry_number: Option<String>,
  pub breed_id:        i64,
  pub breeder_id:      i64,
}

/// An edit: new attributes plus the version the client last saw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalEdit {
  #[serde(flatten)]
  pub form:    AnimalForm,
  pub version: i64,
}

/// A photo uploaded alongside a new animal.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
  pub content_type: String,
  pub file_name:    String,
  pub bytes:        Bytes,
}

impl PhotoUpload {
  pub fn is_image(&self) -> bool {
    ACCEPTED_PHOTO_TYPES.contains(&self.content_type.as_str())
  }

  /// Lower-cased extension of the uploaded file name, with its dot.
  pub fn extension(&self) -> String {
    let path = Path::new(&self.file_name);
    let ext = path
      .extension()
      .map(|e| e.to_string_lossy().into_owned())
      // `Path` reads ".png" as a hidden file without an extension.
      .or_else(|| {
        let name = path.file_name()?.to_str()?;
        name.rsplit_once('.').map(|(_, e)| e.to_owned())
      });
    ext
      .filter(|e| !e.is_empty())
      .map(|e| format!(".{}", e.to_lowercase()))
      .unwrap_or_default()
  }
}

/// Select-list data for the "new animal" form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimalFormOptions {
  pub breeds:   Vec<Breed>,
  pub breeders: Vec<Breeder>,
}
