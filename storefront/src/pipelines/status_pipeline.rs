// storefront/src/pipelines/status_pipeline.rs
use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus, PaymentMethod, PaymentStatus};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::StatusUpdateCtx;
use crate::services::notifier;
use crate::services::orders::StatusUpdateRequest;
use bazar_flow::{Control, Flow, FlowData, Registry, StageDef};
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

/// Delivery estimate applied when an order ships without one.
pub const DEFAULT_DELIVERY_DAYS: i64 = 5;

fn non_blank(value: &Option<String>) -> Option<String> {
  value.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Applies an admin update to `order` and returns the status it had before.
fn apply_update(order: &mut Order, update: &StatusUpdateRequest, now: DateTime<Utc>) -> Result<OrderStatus> {
  let next: OrderStatus = update.status.parse().map_err(AppError::Validation)?;
  let previous = order.status;

  if previous != next {
    if !previous.can_transition_to(next) {
      return Err(AppError::Validation(format!(
        "Cannot change order status from {} to {}",
        previous, next
      )));
    }
    order.set_status(next, now, non_blank(&update.note));
    match next {
      OrderStatus::Delivered if order.payment.method == PaymentMethod::Cod => {
        order.payment.status = PaymentStatus::Completed;
        order.payment.paid_at.get_or_insert(now);
      }
      OrderStatus::Refunded => order.payment.status = PaymentStatus::Refunded,
      _ => {}
    }
  }

  if let Some(carrier) = non_blank(&update.carrier) {
    order.tracking.carrier = Some(carrier);
  }
  if let Some(number) = non_blank(&update.tracking_number) {
    order.tracking.tracking_number = Some(number);
  }
  if let Some(eta) = update.estimated_delivery {
    order.tracking.estimated_delivery = Some(eta);
  }
  if order.status == OrderStatus::Shipped && order.tracking.estimated_delivery.is_none() {
    order.tracking.estimated_delivery = Some(now + Duration::days(DEFAULT_DELIVERY_DAYS));
  }
  order.updated_at = now;
  Ok(previous)
}

pub fn register_status_pipeline(registry: &Registry<AppError>) {
  let mut flow = Flow::<StatusUpdateCtx, AppError>::new(vec![
    StageDef::required("load_order"),
    StageDef::required("apply_status"),
    StageDef::required("persist_status"),
    StageDef::optional("notify_status_change").skip_when(|ctx: &StatusUpdateCtx| !ctx.changed),
  ]);

  flow.on("load_order", |data: FlowData<StatusUpdateCtx>| async move {
    let (state, order_id) = {
      let guard = data.read();
      (guard.state.clone(), guard.order_id)
    };
    let order = common_steps::fetch_order(&state, order_id, None).await?;
    data.write().order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("apply_status", |data: FlowData<StatusUpdateCtx>| async move {
    let mut guard = data.write();
    let update = guard.update.clone();
    let order = guard.order.as_mut().ok_or_else(common_steps::order_not_loaded)?;
    let previous = apply_update(order, &update, Utc::now())?;
    let changed = previous != order.status;
    debug!(%previous, next = %order.status, changed, "Status update applied.");
    guard.previous = Some(previous);
    guard.changed = changed;
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("persist_status", |data: FlowData<StatusUpdateCtx>| async move {
    let (state, order) = {
      let guard = data.read();
      let order = guard.order.clone().ok_or_else(common_steps::order_not_loaded)?;
      (guard.state.clone(), order)
    };
    state.store.update_order(&order).await?;
    info!(order_id = %order.id, status = %order.status, "Order status saved.");
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("notify_status_change", |data: FlowData<StatusUpdateCtx>| async move {
    let guard = data.read();
    if let (Some(order), Some(previous)) = (guard.order.as_ref(), guard.previous) {
      common_steps::notify(&guard.state, notifier::status_changed(order, previous));
    }
    Ok::<_, AppError>(Control::Continue)
  });

  registry.register(flow);
}
