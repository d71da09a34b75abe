//! [`SqliteStore`]: the SQLite implementation of [`ProfileRepository`] and
//! [`IdentityStore`].

use std::path::Path;

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use chrono::{DateTime, Utc};
use rand_core::{OsRng, RngCore as _};
use rusqlite::{Connection, OptionalExtension as _};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use criador_core::{
  animal::{Animal, AnimalDetail, AnimalFields, NewAnimal, Photo},
  breeder::{Breed, Breeder, BreederForm, NewBreeder},
  identity::{Identity, Session},
  store::{IdentityStore, ProfileRepository},
};

use crate::{
  Error, Result,
  encode::{
    RawAnimal, RawAnimalDetail, RawBreeder, RawIdentity, RawPhoto, RawSession,
    encode_date, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Criador store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) async fn photo_count(&self) -> Result<i64> {
    let n = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM photos", [], |r| r.get(0))?))
      .await?;
    Ok(n)
  }

  #[cfg(test)]
  pub(crate) async fn session_count(&self) -> Result<i64> {
    let n = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM sessions", [], |r| r.get(0))?))
      .await?;
    Ok(n)
  }

  async fn details(&self, owner: Uuid, id: Option<i64>) -> Result<Vec<AnimalDetail>> {
    let owner = encode_uuid(owner);
    let raws = self
      .conn
      .call(move |conn| Ok(select_details(conn, &owner, id)?))
      .await?;
    raws.into_iter().map(RawAnimalDetail::into_detail).collect()
  }
}

// ─── Row helpers (run on the connection thread) ──────────────────────────────

fn load_photos(conn: &Connection, animal: &mut RawAnimal) -> rusqlite::Result<()> {
  let mut stmt = conn.prepare(
    "SELECT id, animal_id, filename, storage_location, captured_at
     FROM photos WHERE animal_id = ?1 ORDER BY id",
  )?;
  animal.photos = stmt
    .query_map(rusqlite::params![animal.id], RawPhoto::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(())
}

/// Animals owned by `owner`, optionally narrowed to one id, each joined with
/// its breed, breeder and photos.
fn select_details(
  conn: &Connection,
  owner: &str,
  id: Option<i64>,
) -> rusqlite::Result<Vec<RawAnimalDetail>> {
  let sql = format!(
    "SELECT {}, r.name, {}
     FROM animals a
     JOIN breeds   r ON r.id = a.breed_id
     JOIN breeders b ON b.id = a.breeder_id
     WHERE b.owner_subject_id = ?1 AND (?2 IS NULL OR a.id = ?2)
     ORDER BY a.name, a.id",
    RawAnimal::COLUMNS,
    RawBreeder::COLUMNS,
  );
  let mut stmt = conn.prepare(&sql)?;
  let mut details = stmt
    .query_map(rusqlite::params![owner, id], |row| {
      Ok(RawAnimalDetail {
        animal:     RawAnimal::from_row(row)?,
        breed_name: row.get(RawAnimal::WIDTH)?,
        breeder:    RawBreeder::from_row(row, RawAnimal::WIDTH + 1)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  for detail in &mut details {
    load_photos(conn, &mut detail.animal)?;
  }
  Ok(details)
}

fn select_animal(conn: &Connection, id: i64) -> rusqlite::Result<Option<RawAnimal>> {
  let sql = format!("SELECT {} FROM animals a WHERE a.id = ?1", RawAnimal::COLUMNS);
  let Some(mut animal) = conn
    .query_row(&sql, rusqlite::params![id], RawAnimal::from_row)
    .optional()?
  else {
    return Ok(None);
  };
  load_photos(conn, &mut animal)?;
  Ok(Some(animal))
}

fn select_breeder(conn: &Connection, id: i64) -> rusqlite::Result<Option<RawBreeder>> {
  let sql = format!("SELECT {} FROM breeders b WHERE b.id = ?1", RawBreeder::COLUMNS);
  conn
    .query_row(&sql, rusqlite::params![id], |row| RawBreeder::from_row(row, 0))
    .optional()
}

// ─── Credential helpers ──────────────────────────────────────────────────────

fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| Error::Password(e.to_string()))
}

/// 32 random bytes, hex encoded.
fn random_token() -> String {
  let mut buf = [0u8; 32];
  OsRng.fill_bytes(&mut buf);
  hex::encode(buf)
}

fn digest(token: &str) -> String { hex::encode(Sha256::digest(token.as_bytes())) }

// ─── ProfileRepository impl ──────────────────────────────────────────────────

impl ProfileRepository for SqliteStore {
  type Error = Error;

  // ── Breeds ────────────────────────────────────────────────────────────────

  async fn list_breeds(&self) -> Result<Vec<Breed>> {
    let breeds = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT id, name FROM breeds ORDER BY name")?;
        let rows = stmt
          .query_map([], |row| Ok(Breed { id: row.get(0)?, name: row.get(1)? }))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(breeds)
  }

  async fn create_breed(&self, name: String) -> Result<Breed> {
    let breed = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO breeds (name) VALUES (?1) ON CONFLICT (name) DO NOTHING",
          rusqlite::params![name],
        )?;
        Ok(conn.query_row(
          "SELECT id, name FROM breeds WHERE name = ?1",
          rusqlite::params![name],
          |row| Ok(Breed { id: row.get(0)?, name: row.get(1)? }),
        )?)
      })
      .await?;
    Ok(breed)
  }

  async fn breed_exists(&self, id: i64) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row("SELECT 1 FROM breeds WHERE id = ?1", rusqlite::params![id], |_| {
              Ok(())
            })
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn link_breed(&self, breeder_id: i64, breed_id: i64) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO breeder_breeds (breeder_id, breed_id) VALUES (?1, ?2)",
          rusqlite::params![breeder_id, breed_id],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn breeds_of(&self, breeder_id: i64) -> Result<Vec<Breed>> {
    let breeds = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT r.id, r.name FROM breeds r
           JOIN breeder_breeds bb ON bb.breed_id = r.id
           WHERE bb.breeder_id = ?1
           ORDER BY r.name",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![breeder_id], |row| {
            Ok(Breed { id: row.get(0)?, name: row.get(1)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(breeds)
  }

  // ── Breeders ──────────────────────────────────────────────────────────────

  async fn create_breeder(&self, input: NewBreeder) -> Result<Breeder> {
    let p = input.profile;
    let owner_str = input.owner_subject_id.map(encode_uuid);
    let (name, commercial_name, address, postal_code, phone, email) = (
      p.name.clone(),
      p.commercial_name.clone(),
      p.address.clone(),
      p.postal_code.clone(),
      p.phone.clone(),
      p.email.clone(),
    );

    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO breeders (
             name, commercial_name, address, postal_code, phone, email, owner_subject_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            name,
            commercial_name,
            address,
            postal_code,
            phone,
            email,
            owner_str,
          ],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    Ok(Breeder {
      id,
      name: p.name,
      commercial_name: p.commercial_name,
      address: p.address,
      postal_code: p.postal_code,
      phone: p.phone,
      email: p.email,
      owner_subject_id: input.owner_subject_id,
    })
  }

  async fn breeder_owned_by(&self, id: i64, owner: Uuid) -> Result<bool> {
    let owner = encode_uuid(owner);
    let owned = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT 1 FROM breeders WHERE id = ?1 AND owner_subject_id = ?2",
              rusqlite::params![id, owner],
              |_| Ok(()),
            )
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(owned)
  }

  async fn breeders_owned_by(&self, owner: Uuid) -> Result<Vec<Breeder>> {
    let owner = encode_uuid(owner);
    let raws: Vec<RawBreeder> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM breeders b WHERE b.owner_subject_id = ?1 ORDER BY b.name, b.id",
          RawBreeder::COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![owner], |row| RawBreeder::from_row(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawBreeder::into_breeder).collect()
  }

  async fn update_breeder(
    &self,
    id: i64,
    owner: Uuid,
    profile: BreederForm,
  ) -> Result<Option<Breeder>> {
    let owner = encode_uuid(owner);
    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE breeders SET
             name = ?1, commercial_name = ?2, address = ?3,
             postal_code = ?4, phone = ?5, email = ?6
           WHERE id = ?7 AND owner_subject_id = ?8",
          rusqlite::params![
            profile.name,
            profile.commercial_name,
            profile.address,
            profile.postal_code,
            profile.phone,
            profile.email,
            id,
            owner,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_breeder(conn, id)?)
      })
      .await?;
    raw.map(RawBreeder::into_breeder).transpose()
  }

  // ── Animals ───────────────────────────────────────────────────────────────

  async fn animal_exists(&self, id: i64) -> Result<bool> {
    let exists = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row("SELECT 1 FROM animals WHERE id = ?1", rusqlite::params![id], |_| {
              Ok(())
            })
            .optional()?
            .is_some(),
        )
      })
      .await?;
    Ok(exists)
  }

  async fn animals_owned_by(&self, owner: Uuid) -> Result<Vec<AnimalDetail>> {
    self.details(owner, None).await
  }

  async fn find_animal_owned_by(&self, id: i64, owner: Uuid) -> Result<Option<AnimalDetail>> {
    Ok(self.details(owner, Some(id)).await?.into_iter().next())
  }

  async fn create_animal(&self, input: NewAnimal) -> Result<Animal> {
    let fields = input.fields;
    let name            = fields.name.clone();
    let sex             = fields.sex.code();
    let birth_date      = encode_date(fields.birth_date);
    let purchase_date   = fields.purchase_date.map(encode_date);
    let purchase_price  = fields.purchase_price.cents();
    let registry_number = fields.registry_number.clone();
    let (breed_id, breeder_id) = (fields.breed_id, fields.breeder_id);
    let photo_rows: Vec<(String, String, String)> = input
      .photos
      .iter()
      .map(|p| (p.filename.clone(), p.storage_location.clone(), encode_dt(p.captured_at)))
      .collect();

    let (id, photo_ids) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO animals (
             name, sex, birth_date, purchase_date, purchase_price,
             registry_number, breed_id, breeder_id
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            name,
            sex,
            birth_date,
            purchase_date,
            purchase_price,
            registry_number,
            breed_id,
            breeder_id,
          ],
        )?;
        let id = tx.last_insert_rowid();

        let mut photo_ids = Vec::with_capacity(photo_rows.len());
        for (filename, location, captured_at) in &photo_rows {
          tx.execute(
            "INSERT INTO photos (animal_id, filename, storage_location, captured_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, filename, location, captured_at],
          )?;
          photo_ids.push(tx.last_insert_rowid());
        }
        tx.commit()?;
        Ok((id, photo_ids))
      })
      .await?;

    let photos = input
      .photos
      .into_iter()
      .zip(photo_ids)
      .map(|(p, photo_id)| Photo {
        id:               photo_id,
        animal_id:        id,
        filename:         p.filename,
        storage_location: p.storage_location,
        captured_at:      p.captured_at,
      })
      .collect();
    Ok(Animal { id, fields, version: 1, photos })
  }

  async fn update_animal(
    &self,
    id: i64,
    expected_version: i64,
    fields: AnimalFields,
  ) -> Result<Option<Animal>> {
    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE animals SET
             name = ?1, sex = ?2, birth_date = ?3, purchase_date = ?4,
             purchase_price = ?5, registry_number = ?6, breed_id = ?7,
             breeder_id = ?8, version = version + 1
           WHERE id = ?9 AND version = ?10",
          rusqlite::params![
            fields.name,
            fields.sex.code(),
            encode_date(fields.birth_date),
            fields.purchase_date.map(encode_date),
            fields.purchase_price.cents(),
            fields.registry_number,
            fields.breed_id,
            fields.breeder_id,
            id,
            expected_version,
          ],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_animal(conn, id)?)
      })
      .await?;
    raw.map(RawAnimal::into_animal).transpose()
  }

  async fn delete_animal(&self, id: i64) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM animals WHERE id = ?1", rusqlite::params![id])?)
      })
      .await?;
    Ok(changed > 0)
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = Error;

  fn supports_email(&self) -> bool { true }

  async fn create_identity(&self, email: String, password: String) -> Result<Identity> {
    let identity = Identity {
      subject_id:      Uuid::new_v4(),
      email:           email.clone(),
      email_confirmed: false,
      created_at:      Utc::now(),
    };
    let password_hash = hash_password(&password)?;

    let id_str    = encode_uuid(identity.subject_id);
    let at_str    = encode_dt(identity.created_at);
    let email_str = email.clone();

    let inserted = self
      .conn
      .call(move |conn| {
        let taken = conn
          .query_row(
            "SELECT 1 FROM identities WHERE email = ?1",
            rusqlite::params![email_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(false);
        }
        conn.execute(
          "INSERT INTO identities (subject_id, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, email_str, password_hash, at_str],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateEmail(email));
    }
    Ok(identity)
  }

  async fn delete_identity(&self, subject_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(subject_id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM identities WHERE subject_id = ?1",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn generate_confirmation_token(&self, subject_id: Uuid) -> Result<String> {
    let token = random_token();
    let hash = digest(&token);
    let id_str = encode_uuid(subject_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE identities SET confirmation_hash = ?1 WHERE subject_id = ?2",
          rusqlite::params![hash, id_str],
        )?)
      })
      .await?;

    if changed == 0 {
      return Err(Error::IdentityNotFound(subject_id));
    }
    Ok(token)
  }

  async fn confirm_email(&self, subject_id: Uuid, token: String) -> Result<bool> {
    let hash = digest(&token);
    let id_str = encode_uuid(subject_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE identities SET email_confirmed = 1, confirmation_hash = NULL
           WHERE subject_id = ?1 AND confirmation_hash = ?2",
          rusqlite::params![id_str, hash],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn verify_credentials(
    &self,
    email: String,
    password: String,
  ) -> Result<Option<Identity>> {
    let row: Option<(RawIdentity, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_id, email, email_confirmed, created_at, password_hash
               FROM identities WHERE email = ?1",
              rusqlite::params![email],
              |row| {
                Ok((
                  RawIdentity {
                    subject_id:      row.get(0)?,
                    email:           row.get(1)?,
                    email_confirmed: row.get(2)?,
                    created_at:      row.get(3)?,
                  },
                  row.get(4)?,
                ))
              },
            )
            .optional()?,
        )
      })
      .await?;

    let Some((raw, stored_hash)) = row else {
      return Ok(None);
    };
    let parsed = PasswordHash::new(&stored_hash).map_err(|e| Error::Password(e.to_string()))?;
    if Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_err()
    {
      return Ok(None);
    }
    raw.into_identity().map(Some)
  }

  async fn authenticate_session(&self, subject_id: Uuid) -> Result<Session> {
    let session = Session {
      token: random_token(),
      csrf_token: random_token(),
      subject_id,
      created_at: Utc::now(),
    };

    let token  = session.token.clone();
    let csrf   = session.csrf_token.clone();
    let id_str = encode_uuid(subject_id);
    let at_str = encode_dt(session.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token, csrf_token, subject_id, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![token, csrf, id_str, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(session)
  }

  async fn resolve_session(
    &self,
    token: String,
    not_before: DateTime<Utc>,
  ) -> Result<Option<Session>> {
    let cutoff = encode_dt(not_before);
    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE created_at < ?1",
          rusqlite::params![cutoff],
        )?;
        Ok(
          conn
            .query_row(
              "SELECT token, csrf_token, subject_id, created_at
               FROM sessions WHERE token = ?1",
              rusqlite::params![token],
              |row| {
                Ok(RawSession {
                  token:      row.get(0)?,
                  csrf_token: row.get(1)?,
                  subject_id: row.get(2)?,
                  created_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    let session = raw.map(RawSession::into_session).transpose()?;
    Ok(session.filter(|s| s.created_at >= not_before))
  }

  async fn end_session(&self, token: String) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE token = ?1", rusqlite::params![token])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
