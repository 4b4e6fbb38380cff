// storefront/src/pipelines/factories.rs

//! Sub-flows used by the payment branches of the order flows.

use crate::errors::AppError;
use crate::models::PaymentMethod;
use crate::pipelines::contexts::{CaptureLeg, OfflineLeg, PaypalDraftLeg, SettleCtx};
use crate::services::paypal::NOT_CONFIGURED;
use bazar_flow::{Control, Flow, FlowData, FlowError, StageDef};
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Checks the gateway is configured, then drafts the PayPal order.
pub fn paypal_draft_flow() -> Flow<PaypalDraftLeg, AppError> {
  let mut flow = Flow::<PaypalDraftLeg, AppError>::new(vec![
    StageDef::required("require_gateway"),
    StageDef::required("draft_gateway_order"),
  ]);

  flow.on("require_gateway", |leg: FlowData<PaypalDraftLeg>| async move {
    if leg.read().gateway.is_none() {
      warn!("PayPal order requested but PayPal is not configured.");
      return Err(AppError::Config(NOT_CONFIGURED.to_string()));
    }
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("draft_gateway_order", |leg: FlowData<PaypalDraftLeg>| async move {
    let draft = {
      let guard = leg.read();
      let gateway = guard
        .gateway
        .clone()
        .ok_or_else(|| AppError::Config(NOT_CONFIGURED.to_string()))?;
      gateway.draft_order(&guard.order_number, guard.total_amount)?
    };
    leg.write().draft = Some(draft);
    Ok::<_, AppError>(Control::Continue)
  });

  flow
}

/// Verifies the capture reported by the client. A rejected capture is
/// recorded on the leg rather than failing, so the parent can mark the
/// payment failed before giving up.
pub fn gateway_capture_flow() -> Flow<CaptureLeg, AppError> {
  let mut flow = Flow::<CaptureLeg, AppError>::new(vec![
    StageDef::required("require_gateway"),
    StageDef::required("verify_capture"),
  ]);

  flow.on("require_gateway", |leg: FlowData<CaptureLeg>| async move {
    if leg.read().gateway.is_none() {
      return Err(AppError::Config(NOT_CONFIGURED.to_string()));
    }
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("verify_capture", |leg: FlowData<CaptureLeg>| async move {
    let mut guard = leg.write();
    let gateway = guard
      .gateway
      .clone()
      .ok_or_else(|| AppError::Config(NOT_CONFIGURED.to_string()))?;
    let reported = guard.reported.clone().unwrap_or_default();
    match gateway.verify_capture(&reported, guard.drafted_order_id.as_deref(), guard.total_amount) {
      Ok(verified) => {
        info!(capture_id = %verified.capture_id, "PayPal capture verified.");
        guard.verified = Some(verified);
      }
      Err(e) => guard.failure = Some(e.public_message()),
    }
    Ok::<_, AppError>(Control::Continue)
  });

  flow
}

pub fn card_settlement_flow() -> Flow<OfflineLeg, AppError> {
  let mut flow = Flow::<OfflineLeg, AppError>::new(vec![StageDef::required("collect_card_payment")]);
  flow.on("collect_card_payment", |leg: FlowData<OfflineLeg>| async move {
    let mut guard = leg.write();
    guard.collected = true;
    guard.settled_at = Some(Utc::now());
    info!("Card payment recorded as collected.");
    Ok::<_, AppError>(Control::Continue)
  });
  flow
}

pub fn cod_settlement_flow() -> Flow<OfflineLeg, AppError> {
  let mut flow = Flow::<OfflineLeg, AppError>::new(vec![StageDef::required("schedule_cash_collection")]);
  flow.on("schedule_cash_collection", |leg: FlowData<OfflineLeg>| async move {
    let mut guard = leg.write();
    guard.collected = false;
    guard.settled_at = None;
    info!("Cash on delivery: payment stays pending until delivery.");
    Ok::<_, AppError>(Control::Continue)
  });
  flow
}

/// Picks the offline sub-flow for the method the order was placed with.
#[instrument(name = "factory::offline_settlement", skip_all, err(Display))]
pub async fn offline_settlement_factory(
  data: FlowData<SettleCtx>,
  card: Arc<Flow<OfflineLeg, AppError>>,
  cod: Arc<Flow<OfflineLeg, AppError>>,
) -> Result<Arc<Flow<OfflineLeg, AppError>>, FlowError> {
  let method = data.read().order.as_ref().map(|o| o.payment.method);
  match method {
    Some(PaymentMethod::Card) => Ok(card),
    Some(PaymentMethod::Cod) => Ok(cod),
    other => Err(FlowError::Configuration {
      stage: "capture_payment".to_string(),
      message: format!("No offline settlement for payment method {:?}", other),
    }),
  }
}
