// storefront/src/checkout/api.rs

//! What the checkout client needs from the server, behind a trait so the
//! orchestrator can run against the in-process services or a remote API.

use crate::errors::Result;
use crate::models::Order;
use crate::services::orders::{CompleteOrderRequest, CreateOrderRequest, CreatedOrder, VerifyPaymentRequest};
use crate::services::Principal;
use crate::state::AppState;
use async_trait::async_trait;
use tracing::{debug, instrument};
use uuid::Uuid;

#[async_trait]
pub trait OrderApi: Send + Sync {
  async fn create_order(&self, token: &str, request: CreateOrderRequest) -> Result<CreatedOrder>;
  async fn verify_payment(&self, token: &str, request: VerifyPaymentRequest) -> Result<Order>;
  async fn complete_order(&self, token: &str, request: CompleteOrderRequest) -> Result<Order>;
  /// Returns how many cart lines were removed.
  async fn clear_cart(&self, token: &str) -> Result<u64>;
  async fn get_order(&self, token: &str, order_id: Uuid) -> Result<Order>;
}

/// Calls the services directly, checking the bearer token the same way the
/// HTTP layer does.
#[derive(Clone)]
pub struct LocalOrderApi {
  state: AppState,
}

impl LocalOrderApi {
  pub fn new(state: AppState) -> Self {
    Self { state }
  }

  fn principal(&self, token: &str) -> Result<Principal> {
    let principal = self.state.tokens.verify(token)?;
    debug!(user_id = %principal.user_id, "Checkout call authenticated.");
    Ok(principal)
  }
}

#[async_trait]
impl OrderApi for LocalOrderApi {
  #[instrument(name = "LocalOrderApi::create_order", skip_all, err(Display))]
  async fn create_order(&self, token: &str, request: CreateOrderRequest) -> Result<CreatedOrder> {
    let principal = self.principal(token)?;
    self.state.orders().create(principal.user_id, request).await
  }

  #[instrument(name = "LocalOrderApi::verify_payment", skip_all, fields(order_id = %request.order_id), err(Display))]
  async fn verify_payment(&self, token: &str, request: VerifyPaymentRequest) -> Result<Order> {
    let principal = self.principal(token)?;
    self.state.orders().verify_payment(principal.user_id, request).await
  }

  #[instrument(name = "LocalOrderApi::complete_order", skip_all, fields(order_id = %request.order_id), err(Display))]
  async fn complete_order(&self, token: &str, request: CompleteOrderRequest) -> Result<Order> {
    let principal = self.principal(token)?;
    self.state.orders().complete(principal.user_id, request).await
  }

  async fn clear_cart(&self, token: &str) -> Result<u64> {
    let principal = self.principal(token)?;
    Ok(self.state.store.clear_cart(principal.user_id).await?)
  }

  async fn get_order(&self, token: &str, order_id: Uuid) -> Result<Order> {
    let principal = self.principal(token)?;
    self.state.orders().get(principal.user_id, order_id).await
  }
}
