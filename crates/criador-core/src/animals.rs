//! Animal lifecycle: create, edit, list, show and delete animals on behalf of
//! the breeder's owner.
//!
//! Every operation takes the caller's subject id and only ever touches
//! animals whose breeder belongs to that caller.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  animal::{
    Animal, AnimalDetail, AnimalEdit, AnimalFields, AnimalForm, AnimalFormOptions,
    NewAnimal, NewPhoto, PhotoUpload, Sex,
  },
  breeder::non_blank,
  error::persistence,
  price::Price,
  store::{AttachmentStore, ProfileRepository},
  validation::{BREED_REQUIRED, BREEDER_REQUIRED, NOT_AN_IMAGE, ValidationErrors, required},
};

/// Directory, relative to the attachment root, holding animal photos.
pub const PHOTO_DIRECTORY: &str = "images";

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct AnimalManager<'a, P, A> {
  profiles:    &'a P,
  attachments: &'a A,
}

/// Photo bytes waiting for the database write to succeed.
struct PendingPhoto {
  filename: String,
  bytes:    Bytes,
}

impl<'a, P, A> AnimalManager<'a, P, A>
where
  P: ProfileRepository,
  A: AttachmentStore,
{
  pub fn new(profiles: &'a P, attachments: &'a A) -> Self {
    Self { profiles, attachments }
  }

  /// Animals owned by the caller's breeders, ordered by name.
  pub async fn list_animals(&self, caller: Uuid) -> Result<Vec<AnimalDetail>> {
    self.profiles.animals_owned_by(caller).await.map_err(persistence)
  }

  pub async fn animal_detail(&self, caller: Uuid, id: i64) -> Result<AnimalDetail> {
    self
      .profiles
      .find_animal_owned_by(id, caller)
      .await
      .map_err(persistence)?
      .ok_or(Error::NotFound)
  }

  /// Breeds to choose from and the caller's own breeders.
  pub async fn form_options(&self, caller: Uuid) -> Result<AnimalFormOptions> {
    let breeds = self.profiles.list_breeds().await.map_err(persistence)?;
    let breeders = self
      .profiles
      .breeders_owned_by(caller)
      .await
      .map_err(persistence)?;
    Ok(AnimalFormOptions { breeds, breeders })
  }

  /// Validate and store a new animal with zero or one uploaded photo.
  ///
  /// Without an upload the animal gets the sentinel photo. Photo bytes are
  /// written only after the rows are committed; a failure at that point
  /// leaves the rows in place.
  pub async fn create_animal(
    &self,
    caller: Uuid,
    form: AnimalForm,
    upload: Option<PhotoUpload>,
  ) -> Result<Animal> {
    let mut errors = ValidationErrors::default();
    let now = Utc::now();

    let mut photo = None;
    let mut pending = None;
    if self.check_references(caller, &form, &mut errors).await? {
      match upload {
        None => photo = Some(NewPhoto::sentinel(now)),
        Some(upload) if !upload.is_image() => errors.push("photo", NOT_AN_IMAGE),
        Some(upload) => {
          let filename =
            format!("{}_{}{}", form.breeder_id, Uuid::new_v4(), upload.extension());
          photo = Some(NewPhoto {
            filename:         filename.clone(),
            storage_location: String::new(),
            captured_at:      now,
          });
          pending = Some(PendingPhoto { filename, bytes: upload.bytes });
        }
      }
    }

    let fields = parse_fields(&form, Price::ZERO, &mut errors);
    let fields = match fields {
      Some(fields) if errors.is_empty() => fields,
      _ => return Err(errors.into()),
    };

    let animal = self
      .profiles
      .create_animal(NewAnimal { fields, photos: photo.into_iter().collect() })
      .await
      .map_err(persistence)?;
    tracing::info!(animal_id = animal.id, breeder_id = animal.fields.breeder_id, "animal created");

    if let Some(pending) = pending {
      self.store_photo(pending).await?;
    }
    Ok(animal)
  }

  /// Apply an edit made against version `edit.version` of the animal.
  ///
  /// If the versioned update matches no row the animal is looked up once
  /// more: a vanished row is reported as not found, anything else as a
  /// conflict.
  pub async fn edit_animal(&self, caller: Uuid, id: i64, edit: AnimalEdit) -> Result<Animal> {
    let current = self.animal_detail(caller, id).await?;

    let mut errors = ValidationErrors::default();
    self.check_references(caller, &edit.form, &mut errors).await?;
    let fields = parse_fields(&edit.form, current.animal.fields.purchase_price, &mut errors);
    let fields = match fields {
      Some(fields) if errors.is_empty() => fields,
      _ => return Err(errors.into()),
    };

    let updated = self
      .profiles
      .update_animal(id, edit.version, fields)
      .await
      .map_err(persistence)?;
    if let Some(animal) = updated {
      tracing::info!(animal_id = id, version = animal.version, "animal updated");
      return Ok(animal);
    }

    if self.profiles.animal_exists(id).await.map_err(persistence)? {
      tracing::warn!(animal_id = id, version = edit.version, "concurrent edit lost");
      Err(Error::Conflict)
    } else {
      Err(Error::NotFound)
    }
  }

  /// Delete an animal and its photo rows. Files already written are kept.
  pub async fn delete_animal(&self, caller: Uuid, id: i64) -> Result<()> {
    self.animal_detail(caller, id).await?;
    if !self.profiles.delete_animal(id).await.map_err(persistence)? {
      return Err(Error::NotFound);
    }
    tracing::info!(animal_id = id, "animal deleted");
    Ok(())
  }

  /// Breed first, then the breeder, and the breeder only if the breed is
  /// fine. Returns whether both passed.
  async fn check_references(
    &self,
    caller: Uuid,
    form: &AnimalForm,
    errors: &mut ValidationErrors,
  ) -> Result<bool> {
    if form.breed_id == 0
      || !self.profiles.breed_exists(form.breed_id).await.map_err(persistence)?
    {
      errors.push("breed_id", BREED_REQUIRED);
      return Ok(false);
    }
    if form.breeder_id == 0
      || !self
        .profiles
        .breeder_owned_by(form.breeder_id, caller)
        .await
        .map_err(persistence)?
    {
      errors.push("breeder_id", BREEDER_REQUIRED);
      return Ok(false);
    }
    Ok(true)
  }

  async fn store_photo(&self, pending: PendingPhoto) -> Result<()> {
    self
      .attachments
      .ensure_directory(PathBuf::from(PHOTO_DIRECTORY))
      .await
      .map_err(persistence)?;
    self
      .attachments
      .write_bytes(Path::new(PHOTO_DIRECTORY).join(&pending.filename), pending.bytes)
      .await
      .map_err(persistence)?;
    tracing::debug!(filename = %pending.filename, "photo stored");
    Ok(())
  }
}

/// Field checks that need no store access. `None` if any of them failed.
fn parse_fields(
  form: &AnimalForm,
  default_price: Price,
  errors: &mut ValidationErrors,
) -> Option<AnimalFields> {
  let name = required(errors, "name", &form.name, "name is required").map(str::to_owned);

  let sex = Sex::from_code(&form.sex);
  if sex.is_none() {
    errors.push("sex", "sex must be M or F");
  }

  let birth_date = match form.birth_date.as_deref().map(str::trim) {
    None | Some("") => {
      errors.push("birth_date", "birth date is required");
      None
    }
    Some(text) => parse_date(text, "birth_date", errors),
  };

  let purchase_date = match form.purchase_date.as_deref().map(str::trim) {
    None | Some("") => Some(None),
    Some(text) => parse_date(text, "purchase_date", errors).map(Some),
  };

  let purchase_price = match form.purchase_price.as_deref().map(str::trim) {
    None | Some("") => Some(default_price),
    Some(text) => match Price::parse(text) {
      Ok(p) => Some(p),
      Err(e) => {
        errors.push("purchase_price", e.to_string());
        None
      }
    },
  };

  Some(AnimalFields {
    name: name?,
    sex: sex?,
    birth_date: birth_date?,
    purchase_date: purchase_date?,
    purchase_price: purchase_price?,
    registry_number: non_blank(form.registry_number.clone()),
    breed_id: form.breed_id,
    breeder_id: form.breeder_id,
  })
}

fn parse_date(text: &str, field: &str, errors: &mut ValidationErrors) -> Option<NaiveDate> {
  match NaiveDate::parse_from_str(text, DATE_FORMAT) {
    Ok(d) => Some(d),
    Err(_) => {
      errors.push(field, "date must be formatted as YYYY-MM-DD");
      None
    }
  }
}
