//! Handlers for `/animals` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/animals` | Caller's animals, by name |
//! | `POST` | `/animals` | `multipart/form-data`, optional `photo` file; 201 |
//! | `GET`  | `/animals/new` | Breeds and the caller's breeders |
//! | `GET`  | `/animals/{id}` | 404 if absent or not the caller's |
//! | `GET`  | `/animals/{id}/edit` | Current values, version and select lists |
//! | `POST` | `/animals/{id}/edit` | Body: [`AnimalEdit`] |
//! | `POST` | `/animals/{id}/delete` | 204 |

use axum::{
  Json,
  extract::{Multipart, Path, State, multipart::MultipartError},
  http::StatusCode,
  response::IntoResponse,
};
use criador_core::{
  animal::{Animal, AnimalDetail, AnimalEdit, AnimalForm, AnimalFormOptions, PhotoUpload},
  store::Notifier,
};
use serde::Serialize;

use crate::{AppState, Backend, auth::Authenticated, error::Error};

/// Multipart field holding the uploaded photo.
pub const PHOTO_FIELD: &str = "photo";

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /animals`
pub async fn list<S, N>(
  State(state): State<AppState<S, N>>,
  auth: Authenticated,
) -> Result<Json<Vec<AnimalDetail>>, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(state.animals().list_animals(auth.subject_id()).await?))
}

/// `GET /animals/new`
pub async fn form_options<S, N>(
  State(state): State<AppState<S, N>>,
  auth: Authenticated,
) -> Result<Json<AnimalFormOptions>, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(state.animals().form_options(auth.subject_id()).await?))
}

/// `GET /animals/{id}`
pub async fn detail<S, N>(
  State(state): State<AppState<S, N>>,
  auth: Authenticated,
  Path(id): Path<i64>,
) -> Result<Json<AnimalDetail>, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  Ok(Json(state.animals().animal_detail(auth.subject_id(), id).await?))
}

#[derive(Debug, Serialize)]
pub struct EditView {
  pub animal:  AnimalDetail,
  pub options: AnimalFormOptions,
}

/// `GET /animals/{id}/edit`
pub async fn edit_form<S, N>(
  State(state): State<AppState<S, N>>,
  auth: Authenticated,
  Path(id): Path<i64>,
) -> Result<Json<EditView>, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  let animals = state.animals();
  let animal = animals.animal_detail(auth.subject_id(), id).await?;
  let options = animals.form_options(auth.subject_id()).await?;
  Ok(Json(EditView { animal, options }))
}

// ─── Writes ──────────────────────────────────────────────────────────────────

/// `POST /animals`
pub async fn create<S, N>(
  State(state): State<AppState<S, N>>,
  auth: Authenticated,
  multipart: Multipart,
) -> Result<impl IntoResponse, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  let (form, photo) = read_animal_form(multipart).await?;
  let animal = state
    .animals()
    .create_animal(auth.subject_id(), form, photo)
    .await?;
  Ok((StatusCode::CREATED, Json(animal)))
}

/// `POST /animals/{id}/edit`
pub async fn edit<S, N>(
  State(state): State<AppState<S, N>>,
  auth: Authenticated,
  Path(id): Path<i64>,
  Json(edit): Json<AnimalEdit>,
) -> Result<Json<Animal>, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  let animal = state
    .animals()
    .edit_animal(auth.subject_id(), id, edit)
    .await?;
  Ok(Json(animal))
}

/// `POST /animals/{id}/delete`
pub async fn delete<S, N>(
  State(state): State<AppState<S, N>>,
  auth: Authenticated,
  Path(id): Path<i64>,
) -> Result<StatusCode, Error>
where
  S: Backend,
  N: Notifier + 'static,
{
  state.animals().delete_animal(auth.subject_id(), id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Multipart ───────────────────────────────────────────────────────────────

fn bad_multipart(e: MultipartError) -> Error { Error::BadRequest(e.body_text()) }

/// Ids that are blank or not numbers read as 0, i.e. "nothing selected".
fn parse_id(value: &str) -> i64 { value.trim().parse().unwrap_or(0) }

/// Collect the text fields into an [`AnimalForm`] and the optional photo.
///
/// A `photo` part with an empty file name is what browsers send when no
/// file was chosen; it counts as no upload.
async fn read_animal_form(
  mut multipart: Multipart,
) -> Result<(AnimalForm, Option<PhotoUpload>), Error> {
  let mut form = AnimalForm::default();
  let mut photo = None;

  while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
    let Some(name) = field.name().map(str::to_owned) else {
      continue;
    };

    if name == PHOTO_FIELD {
      let file_name = field.file_name().unwrap_or_default().to_owned();
      let content_type = field.content_type().unwrap_or_default().to_owned();
      let bytes = field.bytes().await.map_err(bad_multipart)?;
      if !file_name.is_empty() {
        photo = Some(PhotoUpload { content_type, file_name, bytes });
      }
      continue;
    }

    let value = field.text().await.map_err(bad_multipart)?;
    match name.as_str() {
      "name" => form.name = value,
      "sex" => form.sex = value,
      "birth_date" => form.birth_date = Some(value),
      "purchase_date" => form.purchase_date = Some(value),
      "purchase_price" => form.purchase_price = Some(value),
      "registry_number" => form.registry_number = Some(value),
      "breed_id" => form.breed_id = parse_id(&value),
      "breeder_id" => form.breeder_id = parse_id(&value),
      other => tracing::debug!(field = other, "ignoring unknown form field"),
    }
  }
  Ok((form, photo))
}
