// storefront/src/web/handlers/address_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::AddressDraft;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

pub async fn list_addresses_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let addresses = app_state.addresses().list(auth_user.user_id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "addresses": addresses })))
}

pub async fn get_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let address = app_state.addresses().get(auth_user.user_id(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "address": address })))
}

#[instrument(name = "handler::create_address", skip(app_state, auth_user, payload), fields(user_id = %auth_user.user_id()))]
pub async fn create_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<AddressDraft>,
) -> Result<HttpResponse, AppError> {
  let address = app_state
    .addresses()
    .create(auth_user.user_id(), payload.into_inner())
    .await?;
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "message": "Address saved",
    "address": address,
  })))
}

#[instrument(name = "handler::update_address", skip(app_state, auth_user, payload), fields(user_id = %auth_user.user_id()))]
pub async fn update_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  payload: web::Json<AddressDraft>,
) -> Result<HttpResponse, AppError> {
  let address = app_state
    .addresses()
    .update(auth_user.user_id(), path.into_inner(), payload.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Address updated",
    "address": address,
  })))
}

pub async fn set_default_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let address = app_state
    .addresses()
    .set_default(auth_user.user_id(), path.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Default address updated",
    "address": address,
  })))
}

#[instrument(name = "handler::delete_address", skip(app_state, auth_user), fields(user_id = %auth_user.user_id()))]
pub async fn delete_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let removal = app_state
    .addresses()
    .delete(auth_user.user_id(), path.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Address deleted",
    "promotedDefault": removal.promoted,
  })))
}
