//! Users and sessions — the identity side of the store.
//!
//! Campaigns reference a user as their owner. The user record is written
//! by the sign-up flow and patched through the profile endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An authenticated identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
  pub id:             String,
  pub name:           String,
  pub email:          String,
  pub email_verified: bool,
  pub image:          Option<String>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// Input to [`crate::store::OutreachStore::create_user`].
///
/// The password arrives already hashed; the store never sees plaintext.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:          String,
  pub email:         String,
  pub password_hash: String,
}

impl NewUser {
  /// Trim and check the required fields.
  pub fn validate(mut self) -> crate::Result<Self> {
    self.name = self.name.trim().to_owned();
    self.email = self.email.trim().to_lowercase();
    if self.name.is_empty() || self.email.is_empty() {
      return Err(crate::Error::validation("name and email are required"));
    }
    if !self.email.contains('@') {
      return Err(crate::Error::validation(format!(
        "invalid email address: {:?}",
        self.email
      )));
    }
    Ok(self)
  }
}

/// A profile update; absent fields are left unchanged. A blank `image`
/// clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPatch {
  pub name:  Option<String>,
  pub email: Option<String>,
  pub image: Option<String>,
}

impl UserPatch {
  pub fn validate(mut self) -> crate::Result<Self> {
    if self.name.is_none() && self.email.is_none() && self.image.is_none() {
      return Err(crate::Error::validation("no profile fields to update"));
    }
    if let Some(name) = &mut self.name {
      *name = name.trim().to_owned();
      if name.is_empty() {
        return Err(crate::Error::validation("name must not be blank"));
      }
    }
    if let Some(email) = &mut self.email {
      *email = email.trim().to_lowercase();
      if !email.contains('@') {
        return Err(crate::Error::validation(format!("invalid email address: {email:?}")));
      }
    }
    self.image = self.image.map(|i| i.trim().to_owned());
    Ok(self)
  }
}

/// A user together with the password hash of their credential account.
#[derive(Debug, Clone)]
pub struct Credential {
  pub user:          User,
  /// argon2 PHC string.
  pub password_hash: String,
}

/// A login session. The bearer token itself is never stored; only its
/// digest is, so this type carries no secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub id:         String,
  pub user_id:    String,
  pub expires_at: DateTime<Utc>,
  pub created_at: DateTime<Utc>,
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
}

impl Session {
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}

/// Input to [`crate::store::OutreachStore::create_session`].
#[derive(Debug, Clone)]
pub struct NewSession {
  pub user_id:    String,
  /// Hex SHA-256 digest of the bearer token.
  pub token_hash: String,
  pub expires_at: DateTime<Utc>,
  pub ip_address: Option<String>,
  pub user_agent: Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_user(name: &str, email: &str) -> NewUser {
    NewUser {
      name:          name.into(),
      email:         email.into(),
      password_hash: "$argon2id$stub".into(),
    }
  }

  #[test]
  fn validate_normalises_email() {
    let u = new_user("  Ada ", " Ada@Example.COM ").validate().unwrap();
    assert_eq!(u.name, "Ada");
    assert_eq!(u.email, "ada@example.com");
  }

  #[test]
  fn profile_patch_normalises_and_rejects() {
    assert!(UserPatch::default().validate().is_err());
    let p = UserPatch { email: Some(" Grace@Example.COM ".into()), ..Default::default() }
      .validate()
      .unwrap();
    assert_eq!(p.email.as_deref(), Some("grace@example.com"));
    assert!(UserPatch { name: Some("  ".into()), ..Default::default() }.validate().is_err());
    assert!(UserPatch { email: Some("nope".into()), ..Default::default() }.validate().is_err());
  }

  #[test]
  fn validate_rejects_missing_fields() {
    assert!(new_user("", "a@b.c").validate().is_err());
    assert!(new_user("Ada", "not-an-email").validate().is_err());
  }
}
