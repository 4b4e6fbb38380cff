// storefront/src/pipelines/contexts.rs

//! Root and sub-contexts of the order flows. Each root context carries the
//! [`AppState`] so handlers reach the store and services without globals.

use crate::models::{Order, OrderLine, OrderStatus, PaymentMethod, PricingBreakdown};
use crate::services::orders::{CreateOrderRequest, StatusUpdateRequest};
use crate::services::paypal::{GatewayOrderDraft, PaypalCapture, VerifiedCapture};
use crate::services::PaypalGateway;
use crate::state::AppState;
use bazar_flow::FlowData;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

// --- Order creation ---

#[derive(Clone)]
pub struct CreateOrderCtx {
  pub state: AppState,
  pub user_id: Uuid,
  pub request: CreateOrderRequest,
  pub payment_method: Option<PaymentMethod>,
  pub lines: Vec<OrderLine>,
  pub pricing: Option<PricingBreakdown>,
  pub order: Option<Order>,
  pub paypal: FlowData<PaypalDraftLeg>,
}

impl CreateOrderCtx {
  pub fn new(state: AppState, user_id: Uuid, request: CreateOrderRequest) -> Self {
    let gateway = state.paypal.clone();
    Self {
      state,
      user_id,
      request,
      payment_method: None,
      lines: Vec::new(),
      pricing: None,
      order: None,
      paypal: FlowData::new(PaypalDraftLeg {
        gateway,
        ..Default::default()
      }),
    }
  }
}

/// Sub-context of the PayPal route of `route_payment`.
#[derive(Debug, Clone, Default)]
pub struct PaypalDraftLeg {
  pub gateway: Option<Arc<PaypalGateway>>,
  pub order_number: String,
  pub total_amount: i64,
  pub draft: Option<GatewayOrderDraft>,
}

// --- Settlement (verify-payment and complete) ---

#[derive(Debug, Clone)]
pub enum SettleMode {
  /// A gateway payment reported by the client.
  Gateway(PaypalCapture),
  /// Card or cash on delivery, finalized without a gateway callback.
  Offline,
}

impl SettleMode {
  pub fn accepts(&self, method: PaymentMethod) -> bool {
    match self {
      SettleMode::Gateway(_) => method == PaymentMethod::Paypal,
      SettleMode::Offline => method.is_offline(),
    }
  }
}

#[derive(Clone)]
pub struct SettleCtx {
  pub state: AppState,
  pub user_id: Uuid,
  pub order_id: Uuid,
  pub mode: SettleMode,
  pub clear_cart: bool,
  pub order: Option<Order>,
  /// Set when the order was confirmed before this run.
  pub already_settled: bool,
  pub capture: FlowData<CaptureLeg>,
  pub offline: FlowData<OfflineLeg>,
  pub cart_cleared: bool,
}

impl SettleCtx {
  pub fn new(state: AppState, user_id: Uuid, order_id: Uuid, mode: SettleMode, clear_cart: bool) -> Self {
    let gateway = state.paypal.clone();
    let reported = match &mode {
      SettleMode::Gateway(capture) => Some(capture.clone()),
      SettleMode::Offline => None,
    };
    Self {
      state,
      user_id,
      order_id,
      mode,
      clear_cart,
      order: None,
      already_settled: false,
      capture: FlowData::new(CaptureLeg {
        gateway,
        reported,
        ..Default::default()
      }),
      offline: FlowData::default(),
      cart_cleared: false,
    }
  }

  pub fn is_gateway(&self) -> bool {
    matches!(self.mode, SettleMode::Gateway(_))
  }
}

/// Sub-context of the gateway route of `capture_payment`.
#[derive(Debug, Clone, Default)]
pub struct CaptureLeg {
  pub gateway: Option<Arc<PaypalGateway>>,
  pub reported: Option<PaypalCapture>,
  pub drafted_order_id: Option<String>,
  pub total_amount: i64,
  pub verified: Option<VerifiedCapture>,
  /// Why verification failed; the parent marks the payment failed.
  pub failure: Option<String>,
}

/// Sub-context of the offline route of `capture_payment`.
#[derive(Debug, Clone)]
pub struct OfflineLeg {
  pub method: PaymentMethod,
  pub settled_at: Option<DateTime<Utc>>,
  /// Whether money changed hands now (card) or is due on delivery (COD).
  pub collected: bool,
}

impl Default for OfflineLeg {
  fn default() -> Self {
    Self {
      method: PaymentMethod::Cod,
      settled_at: None,
      collected: false,
    }
  }
}

// --- Admin status updates ---

#[derive(Clone)]
pub struct StatusUpdateCtx {
  pub state: AppState,
  pub order_id: Uuid,
  pub update: StatusUpdateRequest,
  pub order: Option<Order>,
  pub previous: Option<OrderStatus>,
  pub changed: bool,
}

impl StatusUpdateCtx {
  pub fn new(state: AppState, order_id: Uuid, update: StatusUpdateRequest) -> Self {
    Self {
      state,
      order_id,
      update,
      order: None,
      previous: None,
      changed: false,
    }
  }
}
