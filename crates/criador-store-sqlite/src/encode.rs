//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, calendar dates are `YYYY-MM-DD`, UUIDs
//! are hyphenated lowercase strings and prices are integer cents.

use chrono::{DateTime, NaiveDate, Utc};
use criador_core::{
  animal::{Animal, AnimalDetail, AnimalFields, Photo, Sex},
  breeder::{Breed, Breeder},
  identity::{Identity, Session},
  price::Price,
};
use rusqlite::Row;
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(d: NaiveDate) -> String { d.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Sex / Price ─────────────────────────────────────────────────────────────

pub fn decode_sex(s: &str) -> Result<Sex> {
  Sex::from_code(s).ok_or_else(|| Error::InvalidColumn {
    column: "sex",
    value:  s.to_owned(),
  })
}

pub fn decode_price(cents: i64) -> Result<Price> {
  Price::from_cents(cents).ok_or_else(|| Error::InvalidColumn {
    column: "purchase_price",
    value:  cents.to_string(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read from a `breeders` row, starting at column `at`.
pub struct RawBreeder {
  pub id:               i64,
  pub name:             String,
  pub commercial_name:  Option<String>,
  pub address:          String,
  pub postal_code:      String,
  pub phone:            Option<String>,
  pub email:            String,
  pub owner_subject_id: Option<String>,
}

impl RawBreeder {
  pub const COLUMNS: &'static str = "b.id, b.name, b.commercial_name, b.address, \
                                     b.postal_code, b.phone, b.email, b.owner_subject_id";

  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(at)?,
      name:             row.get(at + 1)?,
      commercial_name:  row.get(at + 2)?,
      address:          row.get(at + 3)?,
      postal_code:      row.get(at + 4)?,
      phone:            row.get(at + 5)?,
      email:            row.get(at + 6)?,
      owner_subject_id: row.get(at + 7)?,
    })
  }

  pub fn into_breeder(self) -> Result<Breeder> {
    Ok(Breeder {
      id:               self.id,
      name:             self.name,
      commercial_name:  self.commercial_name,
      address:          self.address,
      postal_code:      self.postal_code,
      phone:            self.phone,
      email:            self.email,
      owner_subject_id: self
        .owner_subject_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
    })
  }
}

pub struct RawPhoto {
  pub id:               i64,
  pub animal_id:        i64,
  pub filename:         String,
  pub storage_location: String,
  pub captured_at:      String,
}

impl RawPhoto {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:               row.get(0)?,
      animal_id:        row.get(1)?,
      filename:         row.get(2)?,
      storage_location: row.get(3)?,
      captured_at:      row.get(4)?,
    })
  }

  pub fn into_photo(self) -> Result<Photo> {
    Ok(Photo {
      id:               self.id,
      animal_id:        self.animal_id,
      filename:         self.filename,
      storage_location: self.storage_location,
      captured_at:      decode_dt(&self.captured_at)?,
    })
  }
}

/// Raw values read from an `animals` row plus its photo rows.
pub struct RawAnimal {
  pub id:              i64,
  pub name:            String,
  pub sex:             String,
  pub birth_date:      String,
  pub purchase_date:   Option<String>,
  pub purchase_price:  i64,
  pub registry_number: Option<String>,
  pub breed_id:        i64,
  pub breeder_id:      i64,
  pub version:         i64,
  pub photos:          Vec<RawPhoto>,
}

impl RawAnimal {
  pub const COLUMNS: &'static str = "a.id, a.name, a.sex, a.birth_date, a.purchase_date, \
                                     a.purchase_price, a.registry_number, a.breed_id, \
                                     a.breeder_id, a.version";

  /// Number of columns consumed by [`RawAnimal::from_row`].
  pub const WIDTH: usize = 10;

  /// Reads the animal columns; photos are filled in separately.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:              row.get(0)?,
      name:            row.get(1)?,
      sex:             row.get(2)?,
      birth_date:      row.get(3)?,
      purchase_date:   row.get(4)?,
      purchase_price:  row.get(5)?,
      registry_number: row.get(6)?,
      breed_id:        row.get(7)?,
      breeder_id:      row.get(8)?,
      version:         row.get(9)?,
      photos:          Vec::new(),
    })
  }

  pub fn into_animal(self) -> Result<Animal> {
    Ok(Animal {
      id:      self.id,
      fields:  AnimalFields {
        name:            self.name,
        sex:             decode_sex(&self.sex)?,
        birth_date:      decode_date(&self.birth_date)?,
        purchase_date:   self.purchase_date.as_deref().map(decode_date).transpose()?,
        purchase_price:  decode_price(self.purchase_price)?,
        registry_number: self.registry_number,
        breed_id:        self.breed_id,
        breeder_id:      self.breeder_id,
      },
      version: self.version,
      photos:  self
        .photos
        .into_iter()
        .map(RawPhoto::into_photo)
        .collect::<Result<_>>()?,
    })
  }
}

/// An animal joined with its breed name and breeder.
pub struct RawAnimalDetail {
  pub animal:     RawAnimal,
  pub breed_name: String,
  pub breeder:    RawBreeder,
}

impl RawAnimalDetail {
  pub fn into_detail(self) -> Result<AnimalDetail> {
    let breed = Breed { id: self.animal.breed_id, name: self.breed_name };
    Ok(AnimalDetail {
      animal: self.animal.into_animal()?,
      breed,
      breeder: self.breeder.into_breeder()?,
    })
  }
}

pub struct RawIdentity {
  pub subject_id:      String,
  pub email:           String,
  pub email_confirmed: bool,
  pub created_at:      String,
}

impl RawIdentity {
  pub fn into_identity(self) -> Result<Identity> {
    Ok(Identity {
      subject_id:      decode_uuid(&self.subject_id)?,
      email:           self.email,
      email_confirmed: self.email_confirmed,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

pub struct RawSession {
  pub token:      String,
  pub csrf_token: String,
  pub subject_id: String,
  pub created_at: String,
}

impl RawSession {
  pub fn into_session(self) -> Result<Session> {
    Ok(Session {
      token:      self.token,
      csrf_token: self.csrf_token,
      subject_id: decode_uuid(&self.subject_id)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
