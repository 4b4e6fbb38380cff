// storefront/src/checkout/session.rs

//! Client-side sign-in state. One [`AuthSession`] is created by the client
//! and handed to whatever needs the token; nothing reads ambient globals.

use crate::errors::{AppError, Result};
use crate::models::Role;
use crate::services::auth_service::AuthSuccess;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
  pub token: String,
  pub expires_at: DateTime<Utc>,
  pub user_id: Uuid,
  pub name: String,
  pub email: String,
  pub role: Role,
}

/// Shared handle; clones see the same session.
#[derive(Debug, Clone, Default)]
pub struct AuthSession {
  inner: Arc<RwLock<Option<SessionUser>>>,
}

impl AuthSession {
  pub fn new() -> Self {
    Self::default()
  }

  /// Replaces any previous session with the result of a sign-in.
  pub fn login(&self, auth: &AuthSuccess) -> SessionUser {
    let user = SessionUser {
      token: auth.token.token.clone(),
      expires_at: auth.token.expires_at,
      user_id: auth.user.id,
      name: auth.user.name.clone(),
      email: auth.user.email.clone(),
      role: auth.user.role,
    };
    info!(user_id = %user.user_id, "Session started.");
    *self.inner.write() = Some(user.clone());
    user
  }

  pub fn logout(&self) {
    if let Some(previous) = self.inner.write().take() {
      info!(user_id = %previous.user_id, "Session ended.");
    }
  }

  /// The signed-in user, if the session has not expired.
  pub fn current(&self) -> Option<SessionUser> {
    self.current_at(Utc::now())
  }

  pub fn current_at(&self, now: DateTime<Utc>) -> Option<SessionUser> {
    self.inner.read().clone().filter(|u| u.expires_at > now)
  }

  pub fn token(&self) -> Result<String> {
    self
      .current()
      .map(|u| u.token)
      .ok_or_else(|| AppError::Auth("Please sign in to continue".to_string()))
  }
}
