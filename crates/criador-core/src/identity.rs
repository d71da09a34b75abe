//! Authentication principals and their sessions.
//!
//! The domain only ever looks at an identity's `subject_id` and `email`;
//! credentials stay inside the [`IdentityStore`](crate::store::IdentityStore).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
  pub subject_id:      Uuid,
  pub email:           String,
  pub email_confirmed: bool,
  pub created_at:      DateTime<Utc>,
}

/// An authenticated session. `csrf_token` must accompany every mutating
/// request made with `token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub token:      String,
  pub csrf_token: String,
  pub subject_id: Uuid,
  pub created_at: DateTime<Utc>,
}
