//! Breeder profiles as seen by their owner.

use uuid::Uuid;

use crate::{
  Error, Result,
  breeder::{BreederEdit, BreederProfile},
  error::persistence,
  store::ProfileRepository,
  validation::{UNKNOWN_BREED, ValidationErrors},
};

pub struct Profiles<'a, P> {
  profiles: &'a P,
}

impl<'a, P: ProfileRepository> Profiles<'a, P> {
  pub fn new(profiles: &'a P) -> Self { Self { profiles } }

  /// The caller's breeders, each with the breeds it raises.
  pub async fn my_breeders(&self, caller: Uuid) -> Result<Vec<BreederProfile>> {
    let breeders = self
      .profiles
      .breeders_owned_by(caller)
      .await
      .map_err(persistence)?;

    let mut out = Vec::with_capacity(breeders.len());
    for breeder in breeders {
      let breeds = self.profiles.breeds_of(breeder.id).await.map_err(persistence)?;
      out.push(BreederProfile { breeder, breeds });
    }
    Ok(out)
  }

  /// Edit one of the caller's breeders and link the breeds it names.
  /// Ownership is never reassigned.
  pub async fn edit_breeder(
    &self,
    caller: Uuid,
    id: i64,
    edit: BreederEdit,
  ) -> Result<BreederProfile> {
    let BreederEdit { profile, mut breed_ids } = edit;
    breed_ids.sort_unstable();
    breed_ids.dedup();

    let mut errors = ValidationErrors::default();
    profile.validate(&mut errors);
    for &breed_id in &breed_ids {
      if !self.profiles.breed_exists(breed_id).await.map_err(persistence)? {
        errors.push("breed_ids", UNKNOWN_BREED);
      }
    }
    errors.into_result()?;

    let breeder = self
      .profiles
      .update_breeder(id, caller, profile.normalized())
      .await
      .map_err(persistence)?
      .ok_or(Error::NotFound)?;

    for breed_id in breed_ids {
      self
        .profiles
        .link_breed(breeder.id, breed_id)
        .await
        .map_err(persistence)?;
    }
    let breeds = self.profiles.breeds_of(breeder.id).await.map_err(persistence)?;
    tracing::info!(breeder_id = id, breeds = breeds.len(), "breeder updated");
    Ok(BreederProfile { breeder, breeds })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{breeder::BreederForm, testing::MemoryProfiles};

  fn form() -> BreederForm {
    BreederForm {
      name:            "Canil do Vale".into(),
      commercial_name: Some(" ".into()),
      address:         "Rua 2".into(),
      postal_code:     "2000-002".into(),
      phone:           None,
      email:           "vale@example.com".into(),
    }
  }

  fn edit(breed_ids: &[i64]) -> BreederEdit {
    BreederEdit { profile: form(), breed_ids: breed_ids.to_vec() }
  }

  #[tokio::test]
  async fn lists_only_own_breeders_with_breeds() {
    let profiles = MemoryProfiles::default();
    let owner = Uuid::new_v4();
    let mine = profiles.add_breeder("Ana", Some(owner));
    profiles.add_breeder("Bruno", Some(Uuid::new_v4()));
    profiles.add_breeder("Legacy", None);
    let breed = profiles.create_breed("Podengo".into()).await.unwrap();
    profiles.link_breed(mine.id, breed.id).await.unwrap();
    profiles.link_breed(mine.id, breed.id).await.unwrap();

    let listed = Profiles::new(&profiles).my_breeders(owner).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].breeder.id, mine.id);
    assert_eq!(listed[0].breeds, vec![breed]);
  }

  #[tokio::test]
  async fn edit_keeps_owner_and_normalizes() {
    let profiles = MemoryProfiles::default();
    let owner = Uuid::new_v4();
    let breeder = profiles.add_breeder("Ana", Some(owner));

    let edited = Profiles::new(&profiles)
      .edit_breeder(owner, breeder.id, edit(&[]))
      .await
      .unwrap();
    assert_eq!(edited.breeder.name, "Canil do Vale");
    assert_eq!(edited.breeder.commercial_name, None);
    assert_eq!(edited.breeder.owner_subject_id, Some(owner));
    assert!(edited.breeds.is_empty());
  }

  #[tokio::test]
  async fn edit_of_foreign_breeder_is_not_found() {
    let profiles = MemoryProfiles::default();
    let breeder = profiles.add_breeder("Ana", Some(Uuid::new_v4()));

    let err = Profiles::new(&profiles)
      .edit_breeder(Uuid::new_v4(), breeder.id, edit(&[]))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::NotFound));
  }

  #[tokio::test]
  async fn edit_rejects_invalid_form() {
    let profiles = MemoryProfiles::default();
    let owner = Uuid::new_v4();
    let breeder = profiles.add_breeder("Ana", Some(owner));

    let err = Profiles::new(&profiles)
      .edit_breeder(owner, breeder.id, BreederEdit {
        profile: BreederForm { email: "nope".into(), ..form() },
        ..edit(&[])
      })
      .await
      .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[tokio::test]
  async fn edit_links_named_breeds() {
    let profiles = MemoryProfiles::default();
    let owner = Uuid::new_v4();
    let breeder = profiles.add_breeder("Ana", Some(owner));
    let podengo = profiles.create_breed("Podengo".into()).await.unwrap();
    let serra = profiles.create_breed("Serra da Estrela".into()).await.unwrap();
    let service = Profiles::new(&profiles);

    let edited = service
      .edit_breeder(owner, breeder.id, edit(&[podengo.id, podengo.id]))
      .await
      .unwrap();
    assert_eq!(edited.breeds, vec![podengo.clone()]);

    let edited = service
      .edit_breeder(owner, breeder.id, edit(&[serra.id]))
      .await
      .unwrap();
    assert_eq!(edited.breeds, vec![podengo.clone(), serra]);

    let listed = service.my_breeders(owner).await.unwrap();
    assert_eq!(listed[0].breeds.len(), 2);
  }

  #[tokio::test]
  async fn edit_with_unknown_breed_changes_nothing() {
    let profiles = MemoryProfiles::default();
    let owner = Uuid::new_v4();
    let breeder = profiles.add_breeder("Ana", Some(owner));
    let podengo = profiles.create_breed("Podengo".into()).await.unwrap();

    let err = Profiles::new(&profiles)
      .edit_breeder(owner, breeder.id, edit(&[podengo.id, 999]))
      .await
      .unwrap_err();
    let Error::Validation(errors) = err else {
      panic!("expected validation error, got {err:?}");
    };
    assert!(errors.contains(UNKNOWN_BREED));
    assert_eq!(errors.iter().count(), 1);

    assert!(profiles.breeds_of(breeder.id).await.unwrap().is_empty());
    let listed = Profiles::new(&profiles).my_breeders(owner).await.unwrap();
    assert_eq!(listed[0].breeder.name, "Ana");
  }
}
