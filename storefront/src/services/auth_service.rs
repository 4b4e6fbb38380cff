// storefront/src/services/auth_service.rs

//! Account sign-up and sign-in on top of Argon2 password hashes and
//! [`TokenService`] bearer tokens.

use crate::errors::{AppError, Result};
use crate::models::{Role, User};
use crate::services::tokens::{IssuedToken, TokenService};
use crate::store::{Store, StoreError};
use argon2::{
  password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
  Argon2,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

static EMAIL: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("static email pattern"));

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn is_valid_email(email: &str) -> bool {
  EMAIL.is_match(email)
}

#[instrument(name = "auth_service::hash_password", skip(password), err(Display))]
pub fn hash_password(password: &str) -> Result<String> {
  if password.is_empty() {
    return Err(AppError::Validation("Password cannot be empty".to_string()));
  }
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| {
      error!(error = %e, "Argon2 password hashing failed.");
      AppError::Internal(format!("Password hashing failed: {}", e))
    })
}

/// `Ok(false)` on a mismatch; errors only for unreadable stored hashes.
#[instrument(name = "auth_service::verify_password", skip_all, err(Display))]
pub fn verify_password(stored_hash: &str, provided: &str) -> Result<bool> {
  if provided.is_empty() {
    return Ok(false);
  }
  let parsed = PasswordHash::new(stored_hash).map_err(|e| {
    error!(error = %e, "Stored password hash is malformed.");
    AppError::Internal(format!("Invalid stored password hash: {}", e))
  })?;
  match Argon2::default().verify_password(provided.as_bytes(), &parsed) {
    Ok(()) => Ok(true),
    Err(argon2::password_hash::Error::Password) => Ok(false),
    Err(e) => Err(AppError::Internal(format!("Password verification failed: {}", e))),
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
  pub name: String,
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SigninRequest {
  pub email: String,
  pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSuccess {
  #[serde(flatten)]
  pub token: IssuedToken,
  pub user: User,
}

#[derive(Clone)]
pub struct AuthService {
  store: Arc<dyn Store>,
  tokens: Arc<TokenService>,
}

impl AuthService {
  pub fn new(store: Arc<dyn Store>, tokens: Arc<TokenService>) -> Self {
    Self { store, tokens }
  }

  #[instrument(name = "AuthService::signup", skip(self, req), fields(email = %req.email), err(Display))]
  pub async fn signup(&self, req: SignupRequest) -> Result<AuthSuccess> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() || req.password.is_empty() {
      return Err(AppError::Validation("Name, email and password are required".to_string()));
    }
    if !is_valid_email(&email) {
      return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if req.password.len() < MIN_PASSWORD_LEN {
      return Err(AppError::Validation(format!(
        "Password must be at least {} characters",
        MIN_PASSWORD_LEN
      )));
    }

    let user = User::new(name, email, hash_password(&req.password)?, Role::Customer);
    self.store.insert_user(&user).await.map_err(|e| match e {
      StoreError::Conflict(_) => AppError::Conflict("User already exists".to_string()),
      other => other.into(),
    })?;
    info!(user_id = %user.id, "User registered.");

    let token = self.tokens.issue(user.id, user.role)?;
    Ok(AuthSuccess { token, user })
  }

  /// Customer sign-in. Admin accounts must use [`AuthService::admin_signin`].
  pub async fn signin(&self, req: SigninRequest) -> Result<AuthSuccess> {
    self.signin_as(req, Role::Customer).await
  }

  pub async fn admin_signin(&self, req: SigninRequest) -> Result<AuthSuccess> {
    self.signin_as(req, Role::Admin).await
  }

  #[instrument(name = "AuthService::signin", skip(self, req), fields(email = %req.email, role = role.as_str()), err(Display))]
  async fn signin_as(&self, req: SigninRequest, role: Role) -> Result<AuthSuccess> {
    let invalid = || AppError::Auth("Invalid email or password".to_string());
    let email = req.email.trim().to_lowercase();

    let user = self.store.user_by_email(&email).await?.ok_or_else(invalid)?;
    if !verify_password(&user.password_hash, &req.password)? {
      debug!(user_id = %user.id, "Password mismatch.");
      return Err(invalid());
    }
    if user.role != role {
      warn!(user_id = %user.id, "Sign-in attempted through the wrong portal.");
      return Err(invalid());
    }

    let token = self.tokens.issue(user.id, user.role)?;
    info!(user_id = %user.id, "User signed in.");
    Ok(AuthSuccess { token, user })
  }

  /// Creates the admin account if it does not exist yet.
  pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> Result<User> {
    let email = email.trim().to_lowercase();
    if let Some(existing) = self.store.user_by_email(&email).await? {
      return Ok(existing);
    }
    let admin = User::new(name.to_string(), email, hash_password(password)?, Role::Admin);
    self.store.insert_user(&admin).await?;
    info!(user_id = %admin.id, "Admin account created.");
    Ok(admin)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn hash_then_verify() {
    let hash = hash_password("hunter22").unwrap();
    assert!(verify_password(&hash, "hunter22").unwrap());
    assert!(!verify_password(&hash, "hunter23").unwrap());
    assert!(!verify_password(&hash, "").unwrap());
  }

  #[test]
  fn empty_password_cannot_be_hashed() {
    assert!(matches!(hash_password(""), Err(AppError::Validation(_))));
  }

  #[test]
  fn email_shape() {
    assert!(is_valid_email("asha@example.in"));
    assert!(!is_valid_email("asha@example"));
    assert!(!is_valid_email("asha example.in"));
  }
}
