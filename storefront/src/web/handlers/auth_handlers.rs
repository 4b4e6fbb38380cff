// storefront/src/web/handlers/auth_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::auth_service::{SigninRequest, SignupRequest};
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[instrument(name = "handler::signup", skip(app_state, payload), fields(email = %payload.email))]
pub async fn signup_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
  let session = app_state.auth().signup(payload.into_inner()).await?;
  info!(user_id = %session.user.id, "Signup successful.");
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "message": "Account created",
    "token": session.token.token,
    "expiresAt": session.token.expires_at,
    "user": session.user,
  })))
}

#[instrument(name = "handler::signin", skip(app_state, payload), fields(email = %payload.email))]
pub async fn signin_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SigninRequest>,
) -> Result<HttpResponse, AppError> {
  let session = app_state.auth().signin(payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "token": session.token.token,
    "expiresAt": session.token.expires_at,
    "user": session.user,
  })))
}

#[instrument(name = "handler::admin_signin", skip(app_state, payload), fields(email = %payload.email))]
pub async fn admin_signin_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SigninRequest>,
) -> Result<HttpResponse, AppError> {
  let session = app_state.auth().admin_signin(payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "token": session.token.token,
    "expiresAt": session.token.expires_at,
    "user": session.user,
  })))
}

pub async fn me_handler(auth_user: AuthenticatedUser) -> Result<HttpResponse, AppError> {
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "user": auth_user.user,
    "role": auth_user.principal.role,
  })))
}
