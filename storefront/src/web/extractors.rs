// storefront/src/web/extractors.rs

//! Request extractors for bearer-token authentication.

use crate::errors::AppError;
use crate::models::User;
use crate::services::Principal;
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use tracing::warn;
use uuid::Uuid;

/// A signed-in user whose token verified and whose account still exists.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
  pub principal: Principal,
  pub user: User,
}

impl AuthenticatedUser {
  pub fn user_id(&self) -> Uuid {
    self.principal.user_id
  }
}

/// An [`AuthenticatedUser`] with the admin role. Other roles get 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

fn bearer_token(req: &HttpRequest) -> Option<String> {
  let value = req.headers().get(AUTHORIZATION)?.to_str().ok()?;
  let token = value.strip_prefix("Bearer ").or_else(|| value.strip_prefix("bearer "))?;
  let token = token.trim();
  (!token.is_empty()).then(|| token.to_string())
}

async fn authenticate(state: Option<web::Data<AppState>>, token: Option<String>) -> Result<AuthenticatedUser, AppError> {
  let state = state.ok_or_else(|| AppError::Internal("Application state is not registered".to_string()))?;
  let token = token.ok_or_else(|| AppError::Auth("Authentication required".to_string()))?;
  let principal = state.tokens.verify(&token)?;

  let user = state
    .store
    .user_by_id(principal.user_id)
    .await?
    .ok_or_else(|| AppError::Auth("Account no longer exists".to_string()))?;
  if user.role != principal.role {
    warn!(user_id = %user.id, "Token role no longer matches the account.");
    return Err(AppError::Auth("Invalid or expired token".to_string()));
  }
  Ok(AuthenticatedUser { principal, user })
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = bearer_token(req);
    Box::pin(authenticate(state, token))
  }
}

impl FromRequest for AdminUser {
  type Error = AppError;
  type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    let state = req.app_data::<web::Data<AppState>>().cloned();
    let token = bearer_token(req);
    Box::pin(async move {
      let user = authenticate(state, token).await?;
      if !user.principal.is_admin() {
        warn!(user_id = %user.user_id(), "Non-admin attempted an admin operation.");
        return Err(AppError::Forbidden("Admin access required".to_string()));
      }
      Ok(AdminUser(user))
    })
  }
}
