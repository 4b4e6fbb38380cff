// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::coupon::NewCoupon;
use crate::models::Order;
use crate::services::orders::{CompleteOrderRequest, CreateOrderRequest, StatusUpdateRequest, VerifyPaymentRequest};
use crate::state::AppState;
use crate::store::{Page, Paged};
use crate::web::extractors::{AdminUser, AuthenticatedUser};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
  pub page: Option<u32>,
  pub limit: Option<u32>,
  pub status: Option<String>,
}

impl PageQuery {
  fn page(&self) -> Page {
    Page::new(self.page, self.limit)
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponPayload {
  #[serde(default)]
  pub code: String,
  pub order_amount: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableCouponsQuery {
  pub order_amount: Option<i64>,
}

fn paged_orders(paged: Paged<Order>) -> HttpResponse {
  HttpResponse::Ok().json(json!({
    "success": true,
    "orders": paged.items,
    "pagination": {
      "page": paged.page,
      "limit": paged.limit,
      "total": paged.total,
      "totalPages": paged.total_pages,
    },
  }))
}

#[instrument(name = "handler::create_order", skip(app_state, auth_user, payload), fields(user_id = %auth_user.user_id()))]
pub async fn create_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let created = app_state.orders().create(auth_user.user_id(), payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "message": "Order created",
    "orderId": created.order_id,
    "orderNumber": created.order_number,
    "totalAmount": created.total_amount,
    "paymentMethod": created.payment_method,
    "paypalOrder": created.gateway,
    "order": created.order,
  })))
}

#[instrument(name = "handler::verify_payment", skip(app_state, auth_user, payload), fields(user_id = %auth_user.user_id(), order_id = %payload.order_id))]
pub async fn verify_payment_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<VerifyPaymentRequest>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .orders()
    .verify_payment(auth_user.user_id(), payload.into_inner())
    .await?;
  info!(order_number = %order.order_number(), "Payment verified.");
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Payment verified",
    "order": order,
  })))
}

#[instrument(name = "handler::complete_order", skip(app_state, auth_user, payload), fields(user_id = %auth_user.user_id(), order_id = %payload.order_id))]
pub async fn complete_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<CompleteOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orders().complete(auth_user.user_id(), payload.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": "Order confirmed",
    "order": order,
  })))
}

pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let paged = app_state.orders().list_for(auth_user.user_id(), query.page()).await?;
  Ok(paged_orders(paged))
}

pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orders().get(auth_user.user_id(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "order": order })))
}

#[instrument(name = "handler::validate_coupon", skip(app_state, auth_user, payload), fields(code = %payload.code))]
pub async fn validate_coupon_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<ValidateCouponPayload>,
) -> Result<HttpResponse, AppError> {
  let quote = app_state
    .coupons()
    .validate(&payload.code, payload.order_amount, auth_user.user_id())
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "valid": true,
    "discount": quote.discount,
    "coupon": quote,
  })))
}

pub async fn available_coupons_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  query: web::Query<AvailableCouponsQuery>,
) -> Result<HttpResponse, AppError> {
  let coupons = app_state
    .coupons()
    .available_for(auth_user.user_id(), query.order_amount)
    .await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "coupons": coupons })))
}

/// Public: anyone holding the order number can follow the order.
pub async fn track_order_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let view = app_state.orders().track(&path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(json!({ "success": true, "tracking": view })))
}

#[instrument(name = "handler::admin_update_status", skip(app_state, admin, payload), fields(admin_id = %admin.0.user_id(), status = %payload.status))]
pub async fn admin_update_status_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  path: web::Path<Uuid>,
  payload: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .orders()
    .update_status(path.into_inner(), payload.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "success": true,
    "message": format!("Order status updated to {}", order.status),
    "order": order,
  })))
}

pub async fn admin_list_orders_handler(
  app_state: web::Data<AppState>,
  _admin: AdminUser,
  query: web::Query<PageQuery>,
) -> Result<HttpResponse, AppError> {
  let paged = app_state
    .orders()
    .list_all(query.status.as_deref(), query.page())
    .await?;
  Ok(paged_orders(paged))
}

#[instrument(name = "handler::admin_create_coupon", skip(app_state, admin, payload), fields(admin_id = %admin.0.user_id(), code = %payload.code))]
pub async fn admin_create_coupon_handler(
  app_state: web::Data<AppState>,
  admin: AdminUser,
  payload: web::Json<NewCoupon>,
) -> Result<HttpResponse, AppError> {
  let coupon = app_state.coupons().create(payload.into_inner()).await?;
  Ok(HttpResponse::Created().json(json!({
    "success": true,
    "message": "Coupon created",
    "coupon": coupon,
  })))
}
