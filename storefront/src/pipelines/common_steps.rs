// storefront/src/pipelines/common_steps.rs

//! Pieces shared by several order flows.

use crate::errors::{AppError, Result};
use crate::models::Order;
use crate::services::notifier::{self, Notification};
use crate::state::AppState;
use bazar_flow::FlowError;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Loads an order. With `owner` set, orders of other users are reported as
/// missing so their existence is not revealed.
#[instrument(name = "common_step::fetch_order", skip(state), err(Display))]
pub async fn fetch_order(state: &AppState, order_id: Uuid, owner: Option<Uuid>) -> Result<Order> {
  let order = state
    .store
    .order_by_id(order_id)
    .await?
    .filter(|o| owner.map_or(true, |user| o.user_id == user))
    .ok_or_else(|| AppError::NotFound("Order not found".to_string()))?;
  debug!(order_number = %order.order_number(), status = %order.status, "Order loaded.");
  Ok(order)
}

pub fn order_not_loaded() -> AppError {
  AppError::Internal("Order not loaded before this stage".to_string())
}

/// Extractor-side variant of [`order_not_loaded`].
pub fn order_not_loaded_for_route() -> FlowError {
  FlowError::from(anyhow::anyhow!("order not loaded before branching"))
}

/// Fire-and-forget send through the configured notifier.
pub fn notify(state: &AppState, notification: Notification) {
  debug!(to = %notification.to, subject = %notification.subject, "Queueing notification.");
  drop(notifier::dispatch(state.notifier.clone(), notification));
}
