//! Onboarding: turning a sign-up form into an identity plus a breeder.
//!
//! The identity store and the profile repository are separate systems, so
//! registration is not one transaction. The order is fixed: identity, then
//! breeder, then confirmation email, then (optionally) a session. If the
//! breeder cannot be written the fresh identity is deleted again so no
//! account is left without a profile.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  breeder::{Breeder, BreederForm, NewBreeder},
  error::persistence,
  identity::{Identity, Session},
  store::{IdentityStore, Notifier, ProfileRepository},
  validation::{ValidationErrors, is_valid_email},
};

pub const CONFIRMATION_SUBJECT: &str = "Confirm your email";

// ─── Settings ────────────────────────────────────────────────────────────────

/// Length bounds for new passwords, counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
  pub min_len: usize,
  pub max_len: usize,
}

impl Default for PasswordPolicy {
  fn default() -> Self { Self { min_len: 6, max_len: 100 } }
}

impl PasswordPolicy {
  /// Every rule the password breaks; empty when it is acceptable.
  pub fn check(&self, password: &str) -> Vec<String> {
    let len = password.chars().count();
    if len < self.min_len || len > self.max_len {
      vec![format!(
        "password must be between {} and {} characters long",
        self.min_len, self.max_len
      )]
    } else {
      Vec::new()
    }
  }
}

#[derive(Debug, Clone)]
pub struct OnboardingSettings {
  /// Public base URL used to build the confirmation link.
  pub base_url:                  String,
  /// When set, new accounts must confirm their email before signing in.
  pub require_confirmed_account: bool,
  pub password_policy:           PasswordPolicy,
  /// How long a session stays valid after it is opened.
  pub session_ttl:               TimeDelta,
}

impl OnboardingSettings {
  /// Sessions opened before the returned instant have expired at `now`.
  pub fn session_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
    now
      .checked_sub_signed(self.session_ttl)
      .unwrap_or(DateTime::<Utc>::MIN_UTC)
  }
}

// ─── Input / output ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterForm {
  pub email:            String,
  pub password:         String,
  pub confirm_password: String,
  pub breeder:          BreederForm,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Registration {
  PendingConfirmation {
    identity: Identity,
    breeder:  Breeder,
  },
  SignedIn {
    identity: Identity,
    breeder:  Breeder,
    session:  Session,
  },
}

impl Registration {
  pub fn breeder(&self) -> &Breeder {
    match self {
      Self::PendingConfirmation { breeder, .. } | Self::SignedIn { breeder, .. } => {
        breeder
      }
    }
  }
}

// ─── Orchestrator ────────────────────────────────────────────────────────────

pub struct Onboarding<'a, I, P, N> {
  identities: &'a I,
  profiles:   &'a P,
  notifier:   &'a N,
  settings:   &'a OnboardingSettings,
}

impl<'a, I, P, N> Onboarding<'a, I, P, N>
where
  I: IdentityStore,
  P: ProfileRepository,
  N: Notifier,
{
  pub fn new(
    identities: &'a I,
    profiles: &'a P,
    notifier: &'a N,
    settings: &'a OnboardingSettings,
  ) -> Self {
    Self { identities, profiles, notifier, settings }
  }

  /// Register a new account and its breeder profile.
  pub async fn register(&self, form: RegisterForm) -> Result<Registration> {
    if !self.identities.supports_email() {
      return Err(Error::EmailUnsupported);
    }

    let email = form.email.trim().to_owned();
    let mut errors = ValidationErrors::default();
    if !is_valid_email(&email) {
      errors.push("email", "email must be a valid address");
    }
    if form.password != form.confirm_password {
      errors.push("confirm_password", "password and confirmation do not match");
    }
    form.breeder.validate_profile(&mut errors);
    errors.into_result()?;

    let reasons = self.settings.password_policy.check(&form.password);
    if !reasons.is_empty() {
      return Err(Error::IdentityCreationFailed(reasons));
    }

    let identity = self
      .identities
      .create_identity(email.clone(), form.password)
      .await
      .map_err(|e| Error::IdentityCreationFailed(vec![e.to_string()]))?;
    tracing::info!(subject_id = %identity.subject_id, "identity created");

    let new_breeder = NewBreeder {
      profile:          BreederForm { email: email.clone(), ..form.breeder }.normalized(),
      owner_subject_id: Some(identity.subject_id),
    };
    let breeder = match self.profiles.create_breeder(new_breeder).await {
      Ok(b) => b,
      Err(e) => {
        self.discard_identity(identity.subject_id).await;
        return Err(Error::ProfileCreationFailed(Box::new(e)));
      }
    };
    tracing::info!(breeder_id = breeder.id, subject_id = %identity.subject_id, "breeder created");

    self.send_confirmation(&identity).await?;

    if self.settings.require_confirmed_account {
      return Ok(Registration::PendingConfirmation { identity, breeder });
    }

    let session = self
      .identities
      .authenticate_session(identity.subject_id)
      .await
      .map_err(persistence)?;
    Ok(Registration::SignedIn { identity, breeder, session })
  }

  /// Redeem the code from a confirmation link.
  pub async fn confirm_email(&self, subject_id: Uuid, code: &str) -> Result<()> {
    let token = URL_SAFE_NO_PAD
      .decode(code.trim())
      .ok()
      .and_then(|raw| String::from_utf8(raw).ok());

    let confirmed = match token {
      Some(token) => self
        .identities
        .confirm_email(subject_id, token)
        .await
        .map_err(persistence)?,
      None => false,
    };

    if !confirmed {
      let mut errors = ValidationErrors::default();
      errors.push("code", "invalid confirmation code");
      return Err(errors.into());
    }
    tracing::info!(%subject_id, "email confirmed");
    Ok(())
  }

  /// Open a session for an existing account.
  pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session> {
    let identity = self
      .identities
      .verify_credentials(email.trim().to_owned(), password.to_owned())
      .await
      .map_err(persistence)?
      .ok_or(Error::Unauthorized)?;

    if self.settings.require_confirmed_account && !identity.email_confirmed {
      tracing::info!(subject_id = %identity.subject_id, "sign-in refused: email not confirmed");
      return Err(Error::Unauthorized);
    }

    self
      .identities
      .authenticate_session(identity.subject_id)
      .await
      .map_err(persistence)
  }

  async fn send_confirmation(&self, identity: &Identity) -> Result<()> {
    let token = self
      .identities
      .generate_confirmation_token(identity.subject_id)
      .await
      .map_err(persistence)?;
    let code = URL_SAFE_NO_PAD.encode(token.as_bytes());
    let callback = format!(
      "{}/confirm-email?subject_id={}&code={}",
      self.settings.base_url.trim_end_matches('/'),
      identity.subject_id,
      code,
    );
    let body = format!(
      "Please confirm your account by <a href='{}'>clicking here</a>.",
      html_escape(&callback)
    );

    self
      .notifier
      .send(identity.email.clone(), CONFIRMATION_SUBJECT.to_owned(), body)
      .await
      .map_err(|e| {
        tracing::warn!(error = %e, subject_id = %identity.subject_id, "confirmation email not sent");
        Error::NotificationFailed(Box::new(e))
      })
  }

  async fn discard_identity(&self, subject_id: Uuid) {
    match self.identities.delete_identity(subject_id).await {
      Ok(()) => tracing::warn!(%subject_id, "breeder not created; identity removed"),
      Err(e) => tracing::error!(
        error = %e, %subject_id,
        "breeder not created and the identity could not be removed"
      ),
    }
  }
}

fn html_escape(text: &str) -> String {
  let mut out = String::with_capacity(text.len());
  for c in text.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#x27;"),
      c => out.push(c),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use std::sync::atomic::Ordering;

  use super::*;
  use crate::testing::{MemoryIdentities, MemoryOutbox, MemoryProfiles};

  struct Fixture {
    identities: MemoryIdentities,
    profiles:   MemoryProfiles,
    outbox:     MemoryOutbox,
    settings:   OnboardingSettings,
  }

  impl Fixture {
    fn new(require_confirmed_account: bool) -> Self {
      Self {
        identities: MemoryIdentities::default(),
        profiles:   MemoryProfiles::default(),
        outbox:     MemoryOutbox::default(),
        settings:   OnboardingSettings {
          base_url: "http://localhost:8080/".into(),
          require_confirmed_account,
          password_policy: PasswordPolicy::default(),
          session_ttl: TimeDelta::hours(1),
        },
      }
    }

    fn onboarding(&self) -> Onboarding<'_, MemoryIdentities, MemoryProfiles, MemoryOutbox> {
      Onboarding::new(&self.identities, &self.profiles, &self.outbox, &self.settings)
    }
  }

  fn form(email: &str, password: &str) -> RegisterForm {
    RegisterForm {
      email:            email.into(),
      password:         password.into(),
      confirm_password: password.into(),
      breeder:          BreederForm {
        name: "Ana".into(),
        address: "Rua 1".into(),
        postal_code: "1000-001".into(),
        email: "x@y.com".into(),
        ..Default::default()
      },
    }
  }

  #[tokio::test]
  async fn register_pending_confirmation() {
    let fx = Fixture::new(true);
    let reg = fx.onboarding().register(form("x@y.com", "abcdef")).await.unwrap();

    let Registration::PendingConfirmation { identity, breeder } = reg else {
      panic!("expected pending confirmation");
    };
    assert_eq!(breeder.owner_subject_id, Some(identity.subject_id));
    assert_eq!(breeder.email, "x@y.com");
    assert_eq!(fx.identities.count(), 1);
    assert_eq!(fx.profiles.breeder_count(), 1);

    let sent = fx.outbox.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "x@y.com");
    assert_eq!(sent[0].subject, CONFIRMATION_SUBJECT);
    assert!(
      sent[0].html_body.contains("http://localhost:8080/confirm-email?subject_id="),
      "{}",
      sent[0].html_body
    );
    assert!(sent[0].html_body.contains("&amp;code="));
  }

  #[tokio::test]
  async fn register_signs_in_without_confirmation() {
    let fx = Fixture::new(false);
    let reg = fx.onboarding().register(form("x@y.com", "abcdef")).await.unwrap();

    let Registration::SignedIn { identity, session, .. } = reg else {
      panic!("expected signed in");
    };
    assert_eq!(session.subject_id, identity.subject_id);
    assert!(!session.csrf_token.is_empty());
  }

  #[tokio::test]
  async fn profile_email_is_the_login_email() {
    let fx = Fixture::new(true);
    let mut f = form("login@y.com", "abcdef");
    f.breeder.email = "other@z.com".into();
    let reg = fx.onboarding().register(f).await.unwrap();
    assert_eq!(reg.breeder().email, "login@y.com");
  }

  #[tokio::test]
  async fn duplicate_email_creates_no_breeder() {
    let fx = Fixture::new(true);
    fx.onboarding().register(form("x@y.com", "abcdef")).await.unwrap();

    let err = fx
      .onboarding()
      .register(form("X@y.com", "abcdef"))
      .await
      .unwrap_err();
    assert!(matches!(err, Error::IdentityCreationFailed(_)), "{err:?}");
    assert_eq!(fx.profiles.breeder_count(), 1);
    assert_eq!(fx.outbox.sent.lock().unwrap().len(), 1);
  }

  #[tokio::test]
  async fn weak_password_is_an_identity_failure() {
    let fx = Fixture::new(true);
    let err = fx.onboarding().register(form("x@y.com", "abc")).await.unwrap_err();
    let Error::IdentityCreationFailed(reasons) = err else {
      panic!("expected identity failure");
    };
    assert!(reasons[0].contains("between 6 and 100"));
    assert_eq!(fx.identities.count(), 0);
    assert_eq!(fx.profiles.breeder_count(), 0);
  }

  #[tokio::test]
  async fn form_errors_accumulate() {
    let fx = Fixture::new(true);
    let mut f = form("not-an-email", "abcdef");
    f.confirm_password = "abcdeg".into();
    f.breeder.address = " ".into();

    let Err(Error::Validation(errors)) = fx.onboarding().register(f).await else {
      panic!("expected validation errors");
    };
    assert_eq!(errors.iter().count(), 3);
    assert_eq!(fx.identities.count(), 0);
  }

  #[tokio::test]
  async fn failed_profile_removes_identity() {
    let fx = Fixture::new(true);
    fx.profiles.fail_create_breeder.store(true, Ordering::SeqCst);

    let err = fx.onboarding().register(form("x@y.com", "abcdef")).await.unwrap_err();
    assert!(matches!(err, Error::ProfileCreationFailed(_)), "{err:?}");
    assert_eq!(fx.identities.count(), 0);
    assert!(fx.outbox.sent.lock().unwrap().is_empty());
  }

  #[tokio::test]
  async fn notification_failure_keeps_account() {
    let fx = Fixture::new(true);
    fx.outbox.fail.store(true, Ordering::SeqCst);

    let err = fx.onboarding().register(form("x@y.com", "abcdef")).await.unwrap_err();
    assert!(matches!(err, Error::NotificationFailed(_)), "{err:?}");
    assert_eq!(fx.identities.count(), 1);
    assert_eq!(fx.profiles.breeder_count(), 1);
  }

  #[tokio::test]
  async fn refuses_without_email_support() {
    let mut fx = Fixture::new(true);
    fx.identities.email_supported = false;
    let err = fx.onboarding().register(form("x@y.com", "abcdef")).await.unwrap_err();
    assert!(matches!(err, Error::EmailUnsupported));
  }

  #[tokio::test]
  async fn confirmation_link_confirms_and_unlocks_sign_in() {
    let fx = Fixture::new(true);
    let reg = fx.onboarding().register(form("x@y.com", "abcdef")).await.unwrap();
    let subject_id = match reg {
      Registration::PendingConfirmation { identity, .. } => identity.subject_id,
      Registration::SignedIn { .. } => panic!("expected pending confirmation"),
    };

    let err = fx.onboarding().sign_in("x@y.com", "abcdef").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));

    let body = fx.outbox.sent.lock().unwrap()[0].html_body.clone();
    let code = body
      .split("code=")
      .nth(1)
      .and_then(|rest| rest.split('\'').next())
      .unwrap()
      .to_owned();

    let bad = fx.onboarding().confirm_email(subject_id, "bm9wZQ").await;
    assert!(matches!(bad, Err(Error::Validation(_))));

    fx.onboarding().confirm_email(subject_id, &code).await.unwrap();
    let session = fx.onboarding().sign_in("x@y.com", "abcdef").await.unwrap();
    assert_eq!(session.subject_id, subject_id);
  }

  #[tokio::test]
  async fn sign_in_with_wrong_password() {
    let fx = Fixture::new(false);
    fx.onboarding().register(form("x@y.com", "abcdef")).await.unwrap();
    let err = fx.onboarding().sign_in("x@y.com", "zzzzzz").await.unwrap_err();
    assert!(matches!(err, Error::Unauthorized));
  }

  #[test]
  fn escapes_html() {
    assert_eq!(html_escape("a&b<'\">"), "a&amp;b&lt;&#x27;&quot;&gt;");
  }

  #[test]
  fn session_cutoff_is_ttl_before_now() {
    let mut settings = Fixture::new(false).settings;
    let now = Utc::now();
    assert_eq!(settings.session_cutoff(now), now - TimeDelta::hours(1));

    settings.session_ttl = TimeDelta::MAX;
    assert_eq!(settings.session_cutoff(now), DateTime::<Utc>::MIN_UTC);
  }
}
