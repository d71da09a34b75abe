//! In-memory implementations of the ports, for service tests.

use std::{
  collections::BTreeMap,
  path::PathBuf,
  sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
  },
};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  animal::{Animal, AnimalDetail, AnimalFields, NewAnimal, Photo},
  breeder::{Breed, Breeder, BreederForm, NewBreeder},
  identity::{Identity, Session},
  store::{AttachmentStore, IdentityStore, Notifier, ProfileRepository},
};

#[derive(Debug, Error)]
#[error("{0}")]
pub struct FakeError(pub String);

// ─── Profiles ────────────────────────────────────────────────────────────────

#[derive(Default)]
struct ProfilesState {
  next_id:  i64,
  breeds:   BTreeMap<i64, Breed>,
  breeders: BTreeMap<i64, Breeder>,
  links:    Vec<(i64, i64)>,
  animals:  BTreeMap<i64, Animal>,
}

impl ProfilesState {
  fn next(&mut self) -> i64 {
    self.next_id += 1;
    self.next_id
  }

  fn detail(&self, animal: &Animal) -> Option<AnimalDetail> {
    Some(AnimalDetail {
      animal:  animal.clone(),
      breed:   self.breeds.get(&animal.fields.breed_id)?.clone(),
      breeder: self.breeders.get(&animal.fields.breeder_id)?.clone(),
    })
  }

  fn owned(&self, animal: &Animal, owner: Uuid) -> bool {
    self
      .breeders
      .get(&animal.fields.breeder_id)
      .is_some_and(|b| b.owner_subject_id == Some(owner))
  }
}

#[derive(Default)]
pub struct MemoryProfiles {
  state:                    Mutex<ProfilesState>,
  pub fail_create_breeder:  AtomicBool,
  pub fail_create_animal:   AtomicBool,
  /// Simulates another process deleting the row right before an update.
  pub delete_before_update: AtomicBool,
}

impl MemoryProfiles {
  pub fn animal_count(&self) -> usize { self.state.lock().unwrap().animals.len() }

  pub fn breeder_count(&self) -> usize { self.state.lock().unwrap().breeders.len() }

  pub fn add_breeder(&self, name: &str, owner: Option<Uuid>) -> Breeder {
    let mut state = self.state.lock().unwrap();
    let breeder = Breeder {
      id:               state.next(),
      name:             name.into(),
      commercial_name:  None,
      address:          "Rua 1".into(),
      postal_code:      "1000-001".into(),
      phone:            None,
      email:            "x@y.com".into(),
      owner_subject_id: owner,
    };
    state.breeders.insert(breeder.id, breeder.clone());
    breeder
  }
}

impl ProfileRepository for MemoryProfiles {
  type Error = FakeError;

  async fn list_breeds(&self) -> Result<Vec<Breed>, FakeError> {
    let mut breeds: Vec<_> = self.state.lock().unwrap().breeds.values().cloned().collect();
    breeds.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(breeds)
  }

  async fn create_breed(&self, name: String) -> Result<Breed, FakeError> {
    let mut state = self.state.lock().unwrap();
    if let Some(b) = state.breeds.values().find(|b| b.name == name) {
      return Ok(b.clone());
    }
    let breed = Breed { id: state.next(), name };
    state.breeds.insert(breed.id, breed.clone());
    Ok(breed)
  }

  async fn breed_exists(&self, id: i64) -> Result<bool, FakeError> {
    Ok(self.state.lock().unwrap().breeds.contains_key(&id))
  }

  async fn link_breed(&self, breeder_id: i64, breed_id: i64) -> Result<(), FakeError> {
    let mut state = self.state.lock().unwrap();
    if !state.links.contains(&(breeder_id, breed_id)) {
      state.links.push((breeder_id, breed_id));
    }
    Ok(())
  }

  async fn breeds_of(&self, breeder_id: i64) -> Result<Vec<Breed>, FakeError> {
    let state = self.state.lock().unwrap();
    Ok(
      state
        .links
        .iter()
        .filter(|(b, _)| *b == breeder_id)
        .filter_map(|(_, r)| state.breeds.get(r).cloned())
        .collect(),
    )
  }

  async fn create_breeder(&self, input: NewBreeder) -> Result<Breeder, FakeError> {
    if self.fail_create_breeder.load(Ordering::SeqCst) {
      return Err(FakeError("disk full".into()));
    }
    let mut state = self.state.lock().unwrap();
    let p = input.profile;
    let breeder = Breeder {
      id:               state.next(),
      name:             p.name,
      commercial_name:  p.commercial_name,
      address:          p.address,
      postal_code:      p.postal_code,
      phone:            p.phone,
      email:            p.email,
      owner_subject_id: input.owner_subject_id,
    };
    state.breeders.insert(breeder.id, breeder.clone());
    Ok(breeder)
  }

  async fn breeder_owned_by(&self, id: i64, owner: Uuid) -> Result<bool, FakeError> {
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .breeders
        .get(&id)
        .is_some_and(|b| b.owner_subject_id == Some(owner)),
    )
  }

  async fn breeders_owned_by(&self, owner: Uuid) -> Result<Vec<Breeder>, FakeError> {
    Ok(
      self
        .state
        .lock()
        .unwrap()
        .breeders
        .values()
        .filter(|b| b.owner_subject_id == Some(owner))
        .cloned()
        .collect(),
    )
  }

  async fn update_breeder(
    &self,
    id: i64,
    owner: Uuid,
    profile: BreederForm,
  ) -> Result<Option<Breeder>, FakeError> {
    let mut state = self.state.lock().unwrap();
    let Some(b) = state
      .breeders
      .get_mut(&id)
      .filter(|b| b.owner_subject_id == Some(owner))
    else {
      return Ok(None);
    };
    b.name = profile.name;
    b.commercial_name = profile.commercial_name;
    b.address = profile.address;
    b.postal_code = profile.postal_code;
    b.phone = profile.phone;
    b.email = profile.email;
    Ok(Some(b.clone()))
  }

  async fn animal_exists(&self, id: i64) -> Result<bool, FakeError> {
    Ok(self.state.lock().unwrap().animals.contains_key(&id))
  }

  async fn animals_owned_by(&self, owner: Uuid) -> Result<Vec<AnimalDetail>, FakeError> {
    let state = self.state.lock().unwrap();
    Ok(
      state
        .animals
        .values()
        .filter(|a| state.owned(a, owner))
        .filter_map(|a| state.detail(a))
        .collect(),
    )
  }

  async fn find_animal_owned_by(
    &self,
    id: i64,
    owner: Uuid,
  ) -> Result<Option<AnimalDetail>, FakeError> {
    let state = self.state.lock().unwrap();
    Ok(
      state
        .animals
        .get(&id)
        .filter(|a| state.owned(a, owner))
        .and_then(|a| state.detail(a)),
    )
  }

  async fn create_animal(&self, input: NewAnimal) -> Result<Animal, FakeError> {
    if self.fail_create_animal.load(Ordering::SeqCst) {
      return Err(FakeError("connection reset".into()));
    }
    let mut state = self.state.lock().unwrap();
    let id = state.next();
    let mut photos = Vec::new();
    for p in input.photos {
      photos.push(Photo {
        id:               state.next(),
        animal_id:        id,
        filename:         p.filename,
        storage_location: p.storage_location,
        captured_at:      p.captured_at,
      });
    }
    let animal = Animal { id, fields: input.fields, version: 1, photos };
    state.animals.insert(id, animal.clone());
    Ok(animal)
  }

  async fn update_animal(
    &self,
    id: i64,
    expected_version: i64,
    fields: AnimalFields,
  ) -> Result<Option<Animal>, FakeError> {
    let mut state = self.state.lock().unwrap();
    if self.delete_before_update.load(Ordering::SeqCst) {
      state.animals.remove(&id);
    }
    let Some(animal) = state
      .animals
      .get_mut(&id)
      .filter(|a| a.version == expected_version)
    else {
      return Ok(None);
    };
    animal.fields = fields;
    animal.version += 1;
    Ok(Some(animal.clone()))
  }

  async fn delete_animal(&self, id: i64) -> Result<bool, FakeError> {
    Ok(self.state.lock().unwrap().animals.remove(&id).is_some())
  }
}

// ─── Identities ──────────────────────────────────────────────────────────────

struct StoredIdentity {
  identity: Identity,
  password: String,
  token:    Option<String>,
}

pub struct MemoryIdentities {
  identities:         Mutex<BTreeMap<Uuid, StoredIdentity>>,
  sessions:           Mutex<Vec<Session>>,
  pub email_supported: bool,
}

impl Default for MemoryIdentities {
  fn default() -> Self {
    Self {
      identities:      Mutex::default(),
      sessions:        Mutex::default(),
      email_supported: true,
    }
  }
}

impl MemoryIdentities {
  pub fn count(&self) -> usize { self.identities.lock().unwrap().len() }
}

impl IdentityStore for MemoryIdentities {
  type Error = FakeError;

  fn supports_email(&self) -> bool { self.email_supported }

  async fn create_identity(&self, email: String, password: String) -> Result<Identity, FakeError> {
    let mut ids = self.identities.lock().unwrap();
    if ids.values().any(|s| s.identity.email.eq_ignore_ascii_case(&email)) {
      return Err(FakeError(format!("email {email} is already taken")));
    }
    let identity = Identity {
      subject_id:      Uuid::new_v4(),
      email,
      email_confirmed: false,
      created_at:      Utc::now(),
    };
    ids.insert(identity.subject_id, StoredIdentity {
      identity: identity.clone(),
      password,
      token: None,
    });
    Ok(identity)
  }

  async fn delete_identity(&self, subject_id: Uuid) -> Result<(), FakeError> {
    self.identities.lock().unwrap().remove(&subject_id);
    Ok(())
  }

  async fn generate_confirmation_token(&self, subject_id: Uuid) -> Result<String, FakeError> {
    let mut ids = self.identities.lock().unwrap();
    let stored = ids
      .get_mut(&subject_id)
      .ok_or_else(|| FakeError("no such identity".into()))?;
    let token = Uuid::new_v4().simple().to_string();
    stored.token = Some(token.clone());
    Ok(token)
  }

  async fn confirm_email(&self, subject_id: Uuid, token: String) -> Result<bool, FakeError> {
    let mut ids = self.identities.lock().unwrap();
    match ids.get_mut(&subject_id) {
      Some(s) if s.token.as_deref() == Some(token.as_str()) => {
        s.identity.email_confirmed = true;
        s.token = None;
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn verify_credentials(
    &self,
    email: String,
    password: String,
  ) -> Result<Option<Identity>, FakeError> {
    Ok(
      self
        .identities
        .lock()
        .unwrap()
        .values()
        .find(|s| s.identity.email.eq_ignore_ascii_case(&email) && s.password == password)
        .map(|s| s.identity.clone()),
    )
  }

  async fn authenticate_session(&self, subject_id: Uuid) -> Result<Session, FakeError> {
    let session = Session {
      token: Uuid::new_v4().simple().to_string(),
      csrf_token: Uuid::new_v4().simple().to_string(),
      subject_id,
      created_at: Utc::now(),
    };
    self.sessions.lock().unwrap().push(session.clone());
    Ok(session)
  }

  async fn resolve_session(
    &self,
    token: String,
    not_before: DateTime<Utc>,
  ) -> Result<Option<Session>, FakeError> {
    let mut sessions = self.sessions.lock().unwrap();
    sessions.retain(|s| s.created_at >= not_before);
    Ok(sessions.iter().find(|s| s.token == token).cloned())
  }

  async fn end_session(&self, token: String) -> Result<(), FakeError> {
    self.sessions.lock().unwrap().retain(|s| s.token != token);
    Ok(())
  }
}

// ─── Attachments ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryAttachments {
  pub dirs:  Mutex<Vec<PathBuf>>,
  pub files: Mutex<BTreeMap<PathBuf, Bytes>>,
  pub fail:  AtomicBool,
}

impl AttachmentStore for MemoryAttachments {
  type Error = FakeError;

  async fn ensure_directory(&self, dir: PathBuf) -> Result<(), FakeError> {
    self.dirs.lock().unwrap().push(dir);
    Ok(())
  }

  async fn write_bytes(&self, path: PathBuf, bytes: Bytes) -> Result<(), FakeError> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(FakeError("read-only file system".into()));
    }
    self.files.lock().unwrap().insert(path, bytes);
    Ok(())
  }
}

// ─── Outbox ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SentMail {
  pub to:        String,
  pub subject:   String,
  pub html_body: String,
}

#[derive(Default)]
pub struct MemoryOutbox {
  pub sent: Mutex<Vec<SentMail>>,
  pub fail: AtomicBool,
}

impl Notifier for MemoryOutbox {
  type Error = FakeError;

  async fn send(&self, to: String, subject: String, html_body: String) -> Result<(), FakeError> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(FakeError("smtp unavailable".into()));
    }
    self.sent.lock().unwrap().push(SentMail { to, subject, html_body });
    Ok(())
  }
}
