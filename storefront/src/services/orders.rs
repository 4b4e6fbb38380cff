// storefront/src/services/orders.rs

//! Order operations. The write paths (create, settle, status changes) are
//! expressed as flows registered in [`crate::pipelines`]; this module builds
//! their contexts, runs them through the registry and shapes the results.

use crate::errors::{AppError, Result};
use crate::models::{CustomerInfo, Order, OrderStatus, PaymentMethod, ShippingAddress, TimelineEntry, Tracking};
use crate::pipelines::contexts::{CreateOrderCtx, SettleCtx, SettleMode, StatusUpdateCtx};
use crate::pricing::Price;
use crate::services::paypal::{GatewayOrderDraft, PaypalCapture};
use crate::state::AppState;
use crate::store::{Page, Paged};
use bazar_flow::{FlowData, Outcome};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

fn default_quantity() -> i64 {
  1
}

/// A product line as the client sends it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
  #[serde(default)]
  pub name: String,
  pub price: Price,
  #[serde(default)]
  pub image: String,
  #[serde(default)]
  pub category: String,
  #[serde(default)]
  pub rating: Option<f64>,
  #[serde(default = "default_quantity")]
  pub quantity: i64,
}

/// Body of `POST /api/orders/create`. Any pricing the client computed is
/// ignored; totals are always recomputed on the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
  #[serde(default)]
  pub customer_info: Option<CustomerInfo>,
  #[serde(default)]
  pub shipping_address: Option<ShippingAddress>,
  #[serde(default)]
  pub products: Vec<OrderLineInput>,
  #[serde(default)]
  pub payment_method: String,
  #[serde(default)]
  pub coupon_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
  pub order_id: Uuid,
  pub order_number: String,
  pub total_amount: i64,
  pub payment_method: PaymentMethod,
  /// Payload the client hands to the PayPal widget.
  pub gateway: Option<GatewayOrderDraft>,
  pub order: Order,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
  pub order_id: Uuid,
  #[serde(flatten)]
  pub capture: PaypalCapture,
  #[serde(default)]
  pub clear_cart: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteOrderRequest {
  pub order_id: Uuid,
  #[serde(default)]
  pub clear_cart: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
  pub status: String,
  #[serde(default)]
  pub carrier: Option<String>,
  #[serde(default)]
  pub tracking_number: Option<String>,
  #[serde(default)]
  pub estimated_delivery: Option<DateTime<Utc>>,
  #[serde(default)]
  pub note: Option<String>,
}

/// Public view of an order, looked up by order number.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingView {
  pub order_number: String,
  pub status: OrderStatus,
  pub tracking: Tracking,
  pub total_amount: i64,
  pub item_count: i64,
  pub created_at: DateTime<Utc>,
  pub timeline: Vec<TimelineEntry>,
}

impl From<&Order> for TrackingView {
  fn from(order: &Order) -> Self {
    Self {
      order_number: order.order_number().to_string(),
      status: order.status,
      tracking: order.tracking.clone(),
      total_amount: order.pricing.total_amount,
      item_count: order.products.iter().map(|l| l.quantity).sum(),
      created_at: order.created_at,
      timeline: order.timeline(),
    }
  }
}

#[derive(Clone)]
pub struct OrderService {
  state: AppState,
}

impl OrderService {
  pub fn new(state: AppState) -> Self {
    Self { state }
  }

  #[instrument(name = "OrderService::create", skip(self, request), fields(%user_id), err(Display))]
  pub async fn create(&self, user_id: Uuid, request: CreateOrderRequest) -> Result<CreatedOrder> {
    let data = FlowData::new(CreateOrderCtx::new(self.state.clone(), user_id, request));
    self.state.flows.run(data.clone()).await?;

    let (order, draft) = {
      let guard = data.read();
      let order = guard
        .order
        .clone()
        .ok_or_else(|| AppError::Internal("Order flow finished without an order".to_string()))?;
      let draft = guard.paypal.read().draft.clone();
      (order, draft)
    };
    info!(order_number = %order.order_number(), total = order.pricing.total_amount, "Order created.");
    Ok(CreatedOrder {
      order_id: order.id,
      order_number: order.order_number().to_string(),
      total_amount: order.pricing.total_amount,
      payment_method: order.payment.method,
      gateway: draft,
      order,
    })
  }

  /// Confirms a PayPal order from the capture the client reported.
  #[instrument(name = "OrderService::verify_payment", skip(self, request), fields(%user_id, order_id = %request.order_id), err(Display))]
  pub async fn verify_payment(&self, user_id: Uuid, request: VerifyPaymentRequest) -> Result<Order> {
    let mode = SettleMode::Gateway(request.capture);
    self.settle(user_id, request.order_id, mode, request.clear_cart).await
  }

  /// Confirms a card or cash-on-delivery order.
  #[instrument(name = "OrderService::complete", skip(self, request), fields(%user_id, order_id = %request.order_id), err(Display))]
  pub async fn complete(&self, user_id: Uuid, request: CompleteOrderRequest) -> Result<Order> {
    self
      .settle(user_id, request.order_id, SettleMode::Offline, request.clear_cart)
      .await
  }

  async fn settle(&self, user_id: Uuid, order_id: Uuid, mode: SettleMode, clear_cart: bool) -> Result<Order> {
    let data = FlowData::new(SettleCtx::new(self.state.clone(), user_id, order_id, mode, clear_cart));
    let outcome = self.state.flows.run(data.clone()).await?;
    let guard = data.read();
    if outcome == Outcome::Halted && guard.already_settled {
      info!(%order_id, "Order already settled; returning it unchanged.");
    }
    guard
      .order
      .clone()
      .ok_or_else(|| AppError::Internal("Settlement flow finished without an order".to_string()))
  }

  #[instrument(name = "OrderService::update_status", skip(self, update), fields(%order_id, status = %update.status), err(Display))]
  pub async fn update_status(&self, order_id: Uuid, update: StatusUpdateRequest) -> Result<Order> {
    let data = FlowData::new(StatusUpdateCtx::new(self.state.clone(), order_id, update));
    self.state.flows.run(data.clone()).await?;
    let guard = data.read();
    guard
      .order
      .clone()
      .ok_or_else(|| AppError::Internal("Status flow finished without an order".to_string()))
  }

  /// An order of `user_id`. Orders of other users are reported as missing.
  pub async fn get(&self, user_id: Uuid, order_id: Uuid) -> Result<Order> {
    match self.state.store.order_by_id(order_id).await? {
      Some(order) if order.user_id == user_id => Ok(order),
      _ => Err(AppError::NotFound("Order not found".to_string())),
    }
  }

  pub async fn list_for(&self, user_id: Uuid, page: Page) -> Result<Paged<Order>> {
    Ok(self.state.store.orders_for_user(user_id, page).await?)
  }

  pub async fn list_all(&self, status: Option<&str>, page: Page) -> Result<Paged<Order>> {
    let status = match status.map(str::trim).filter(|s| !s.is_empty() && *s != "all") {
      Some(raw) => Some(raw.parse::<OrderStatus>().map_err(AppError::Validation)?),
      None => None,
    };
    Ok(self.state.store.all_orders(status, page).await?)
  }

  pub async fn track(&self, order_number: &str) -> Result<TrackingView> {
    let number = order_number.trim().to_uppercase();
    let order = self
      .state
      .store
      .order_by_number(&number)
      .await?
      .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
    Ok(TrackingView::from(&order))
  }
}
