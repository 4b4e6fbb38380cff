// storefront/src/pipelines/settle_pipeline.rs

//! Settlement of a pending order: gateway verification for PayPal, direct
//! confirmation for card and cash on delivery.

use crate::errors::AppError;
use crate::models::{CouponUsage, OrderStatus, PaymentMethod, PaymentStatus};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::{SettleCtx, SettleMode};
use crate::pipelines::factories;
use crate::services::notifier;
use crate::store::{CouponRedemption, StoreError};
use bazar_flow::{Control, Flow, FlowData, Registry, StageDef};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

fn confirmation_note(method: PaymentMethod) -> &'static str {
  match method {
    PaymentMethod::Paypal => "Payment verified via PayPal",
    PaymentMethod::Card => "Card payment received",
    PaymentMethod::Cod => "Cash on delivery order confirmed",
  }
}

pub fn register_settle_pipeline(registry: &Registry<AppError>) {
  let mut flow = Flow::<SettleCtx, AppError>::new(vec![
    StageDef::required("load_order"),
    StageDef::required("check_settlement"),
    StageDef::required("capture_payment"),
    StageDef::required("record_confirmation"),
    StageDef::optional("clear_cart").skip_when(|ctx: &SettleCtx| !ctx.clear_cart),
    StageDef::optional("notify_customer"),
  ]);

  flow.on("load_order", |data: FlowData<SettleCtx>| async move {
    let (state, order_id, user_id) = {
      let guard = data.read();
      (guard.state.clone(), guard.order_id, guard.user_id)
    };
    let order = common_steps::fetch_order(&state, order_id, Some(user_id)).await?;
    data.write().order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  // An order that is already confirmed (or further along) is handed back
  // unchanged so a repeated call never counts the payment twice.
  flow.on("check_settlement", |data: FlowData<SettleCtx>| async move {
    let mut guard = data.write();
    let (method, status) = guard
      .order
      .as_ref()
      .map(|o| (o.payment.method, o.status))
      .ok_or_else(common_steps::order_not_loaded)?;

    if !guard.mode.accepts(method) {
      let message = match guard.mode {
        SettleMode::Gateway(_) => "This order was not placed with PayPal",
        SettleMode::Offline => "PayPal orders must be confirmed through payment verification",
      };
      return Err(AppError::Validation(message.to_string()));
    }

    match status {
      OrderStatus::Pending => Ok::<_, AppError>(Control::Continue),
      OrderStatus::Cancelled | OrderStatus::Refunded => {
        Err(AppError::Validation(format!("Order is {} and cannot be paid", status)))
      }
      _ => {
        info!(order_id = %guard.order_id, %status, "Order already settled.");
        guard.already_settled = true;
        Ok(Control::Halt)
      }
    }
  });

  let card = Arc::new(factories::card_settlement_flow());
  let cod = Arc::new(factories::cod_settlement_flow());
  flow
    .branch("capture_payment")
    .route(Arc::new(factories::gateway_capture_flow()), |data: FlowData<SettleCtx>| {
      let guard = data.read();
      let order = guard.order.as_ref().ok_or_else(common_steps::order_not_loaded_for_route)?;
      {
        let mut leg = guard.capture.write();
        leg.drafted_order_id = order.payment.gateway_order_id.clone();
        leg.total_amount = order.pricing.total_amount;
      }
      Ok(guard.capture.clone())
    })
    .when(|ctx: &SettleCtx| ctx.is_gateway())
    .route_with(
      move |data: FlowData<SettleCtx>| factories::offline_settlement_factory(data, card.clone(), cod.clone()),
      |data: FlowData<SettleCtx>| {
        let guard = data.read();
        let order = guard.order.as_ref().ok_or_else(common_steps::order_not_loaded_for_route)?;
        guard.offline.write().method = order.payment.method;
        Ok(guard.offline.clone())
      },
    )
    .always()
    .or_fail()
    .seal(false);

  flow.after("capture_payment", |data: FlowData<SettleCtx>| async move {
    let (state, order, failure) = {
      let mut guard = data.write();
      let is_gateway = guard.is_gateway();
      let (verified, failure) = {
        let leg = guard.capture.read();
        (leg.verified.clone(), leg.failure.clone())
      };
      let offline = guard.offline.snapshot();
      let now = Utc::now();

      let order = guard.order.as_mut().ok_or_else(common_steps::order_not_loaded)?;
      if failure.is_some() {
        order.payment.status = PaymentStatus::Failed;
        order.updated_at = now;
      } else if let Some(verified) = verified {
        order.payment.status = PaymentStatus::Completed;
        order.payment.transaction_id = Some(verified.capture_id);
        order.payment.payer_email = verified.payer_email;
        order.payment.paid_at = Some(now);
      } else if !is_gateway && offline.collected {
        order.payment.status = PaymentStatus::Completed;
        order.payment.paid_at = offline.settled_at;
      }
      let order = order.clone();
      (guard.state.clone(), order, failure)
    };

    if let Some(reason) = failure {
      state.store.update_order(&order).await?;
      warn!(order_id = %order.id, %reason, "Payment verification failed; payment marked failed.");
      data.write().order = Some(order);
      return Err(AppError::Payment(reason));
    }
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("record_confirmation", |data: FlowData<SettleCtx>| async move {
    let (state, mut order) = {
      let guard = data.read();
      let order = guard.order.clone().ok_or_else(common_steps::order_not_loaded)?;
      (guard.state.clone(), order)
    };
    let now = Utc::now();
    let note = confirmation_note(order.payment.method).to_string();
    order.set_status(OrderStatus::Confirmed, now, Some(note));

    let redemption = order
      .pricing
      .coupon_code
      .clone()
      .filter(|_| order.pricing.discount > 0)
      .map(|code| CouponRedemption {
        code,
        usage: CouponUsage {
          user_id: order.user_id,
          order_id: Some(order.id),
          used_at: now,
          order_amount: order.pricing.subtotal,
          discount_amount: order.pricing.discount,
        },
      });

    match state.store.confirm_order(&order, redemption.as_ref()).await {
      Ok(()) => {
        info!(
          order_id = %order.id,
          order_number = %order.order_number(),
          coupon = ?redemption.as_ref().map(|r| r.code.as_str()),
          "Order confirmed."
        );
        data.write().order = Some(order);
        Ok::<_, AppError>(Control::Continue)
      }
      Err(StoreError::Conflict(reason)) => {
        info!(order_id = %order.id, %reason, "Order was settled concurrently.");
        let current = state.store.order_by_id(order.id).await?;
        let mut guard = data.write();
        guard.already_settled = true;
        if current.is_some() {
          guard.order = current;
        }
        Ok(Control::Halt)
      }
      Err(e) => Err(AppError::from(e)),
    }
  });

  flow.on("clear_cart", |data: FlowData<SettleCtx>| async move {
    let (state, user_id) = {
      let guard = data.read();
      (guard.state.clone(), guard.user_id)
    };
    match state.store.clear_cart(user_id).await {
      Ok(removed) => {
        info!(%user_id, removed, "Cart cleared after checkout.");
        data.update(|ctx| ctx.cart_cleared = true);
      }
      Err(e) => warn!(%user_id, error = %e, "Could not clear cart after checkout."),
    }
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("notify_customer", |data: FlowData<SettleCtx>| async move {
    let guard = data.read();
    if let Some(order) = guard.order.as_ref() {
      common_steps::notify(&guard.state, notifier::order_confirmed(order));
    }
    Ok::<_, AppError>(Control::Continue)
  });

  registry.register(flow);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn every_method_has_a_confirmation_note() {
    for method in [PaymentMethod::Card, PaymentMethod::Cod, PaymentMethod::Paypal] {
      assert!(!confirmation_note(method).is_empty());
    }
  }
}
