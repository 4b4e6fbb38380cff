// storefront/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::{CartItem, ProductInput, ProductSnapshot, WishlistItem};
use crate::pricing;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartPayload {
  #[serde(flatten)]
  pub product: ProductInput,
  #[serde(default = "one")]
  pub quantity: i64,
}

fn one() -> i64 {
  1
}

#[derive(Debug, Deserialize)]
pub struct QuantityPayload {
  pub quantity: i64,
}

fn checked_snapshot(input: &ProductInput) -> Result<ProductSnapshot, AppError> {
  let snapshot = input.snapshot();
  if snapshot.name.is_empty() {
    return Err(AppError::Validation("Product name is required".to_string()));
  }
  if !(1..=pricing::MAX_UNIT_PRICE).contains(&snapshot.price) {
    return Err(AppError::Validation(format!("Invalid price for '{}'", snapshot.name)));
  }
  Ok(snapshot)
}

fn checked_quantity(quantity: i64) -> Result<i64, AppError> {
  if !(1..=pricing::MAX_QUANTITY).contains(&quantity) {
    return Err(AppError::Validation(format!(
      "Quantity must be between 1 and {}",
      pricing::MAX_QUANTITY
    )));
  }
  Ok(quantity)
}

fn cart_body(items: &[CartItem]) -> serde_json::Value {
  let subtotal = items.iter().fold(0i64, |acc, i| acc.saturating_add(i.line_total()));
  let count = items.iter().fold(0i64, |acc, i| acc.saturating_add(i.quantity));
  json!({ "success": true, "items": items, "itemCount": count, "subtotal": subtotal })
}

pub async fn view_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let items = app_state.store.cart_items(auth_user.user_id()).await?;
  Ok(HttpResponse::Ok().json(cart_body(&items)))
}

#[instrument(
  name = "handler::add_to_cart",
  skip(app_state, payload, auth_user),
  fields(user_id = %auth_user.user_id(), product = %payload.product.name, quantity = payload.quantity)
)]
pub async fn add_to_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<AddToCartPayload>,
) -> Result<HttpResponse, AppError> {
  let snapshot = checked_snapshot(&payload.product)?;
  let quantity = checked_quantity(payload.quantity)?;
  let line = app_state
    .store
    .add_to_cart(&CartItem::new(auth_user.user_id(), snapshot, quantity))
    .await?;
  info!(quantity = line.quantity, "Cart line updated.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Item added to cart",
    "cartItem": line,
  })))
}

pub async fn update_cart_quantity_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<String>,
  payload: web::Json<QuantityPayload>,
) -> Result<HttpResponse, AppError> {
  let quantity = checked_quantity(payload.quantity)?;
  let line = app_state
    .store
    .set_cart_quantity(auth_user.user_id(), path.as_str(), quantity)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "cartItem": line })))
}

pub async fn remove_from_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  app_state
    .store
    .remove_from_cart(auth_user.user_id(), path.as_str())
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Item removed from cart" })))
}

pub async fn clear_cart_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let removed = app_state.store.clear_cart(auth_user.user_id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "removed": removed })))
}

pub async fn view_wishlist_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let items = app_state.store.wishlist_items(auth_user.user_id()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "items": items })))
}

pub async fn add_to_wishlist_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<ProductInput>,
) -> Result<HttpResponse, AppError> {
  let snapshot = checked_snapshot(&payload)?;
  let item = WishlistItem::new(auth_user.user_id(), snapshot);
  app_state.store.add_to_wishlist(&item).await?;
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "message": "Added to wishlist",
    "item": item,
  })))
}

pub async fn remove_from_wishlist_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  app_state
    .store
    .remove_from_wishlist(auth_user.user_id(), path.as_str())
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "message": "Removed from wishlist" })))
}
