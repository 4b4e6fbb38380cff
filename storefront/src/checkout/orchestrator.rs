// storefront/src/checkout/orchestrator.rs

//! Drives a submitted checkout from the payment step to the confirmation
//! screen as a flow:
//!
//! `prepare_payment -> create_order -> settle_payment -> clear_cart -> confirm`
//!
//! `settle_payment` branches on the payment method. PayPal opens a payment
//! session for the drafted gateway order and verifies the approved capture;
//! card and cash on delivery go straight to the complete endpoint. Any
//! failure sends the wizard back to the payment step with the form intact.

use crate::checkout::api::OrderApi;
use crate::checkout::payment::{PaymentSession, PaymentSessionOutcome};
use crate::checkout::session::AuthSession;
use crate::checkout::wizard::CheckoutWizard;
use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus, PaymentMethod, PaymentStatus, PricingBreakdown};
use crate::services::orders::{
  CompleteOrderRequest, CreateOrderRequest, CreatedOrder, OrderLineInput, VerifyPaymentRequest,
};
use crate::services::paypal::{GatewayOrderDraft, PaypalCapture};
use bazar_flow::{Control, Flow, FlowData, FlowError, StageDef};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// How long the "preparing payment" screen stays up before the order is placed.
pub const DEFAULT_PREPARE_DELAY: Duration = Duration::from_millis(1500);

/// What is being bought.
#[derive(Debug, Clone)]
pub enum Basket {
  /// Everything in the cart; the cart is emptied after a successful checkout.
  Cart(Vec<OrderLineInput>),
  /// A single product bought directly from its page; the cart is left alone.
  BuyNow(OrderLineInput),
}

impl Basket {
  fn is_direct(&self) -> bool {
    matches!(self, Basket::BuyNow(_))
  }

  fn into_lines(self) -> Vec<OrderLineInput> {
    match self {
      Basket::Cart(lines) => lines,
      Basket::BuyNow(line) => vec![line],
    }
  }
}

/// Shown on the success screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
  pub order_id: Uuid,
  pub order_number: String,
  pub payment_method: PaymentMethod,
  pub total_amount: i64,
  pub pricing: PricingBreakdown,
  pub status: OrderStatus,
  pub payment_status: PaymentStatus,
}

impl From<&Order> for Confirmation {
  fn from(order: &Order) -> Self {
    Self {
      order_id: order.id,
      order_number: order.order_number().to_string(),
      payment_method: order.payment.method,
      total_amount: order.pricing.total_amount,
      pricing: order.pricing.clone(),
      status: order.status,
      payment_status: order.payment.status,
    }
  }
}

/// An order left pending by an unfinished attempt, with the request that placed it.
#[derive(Clone)]
struct PendingAttempt {
  submitted: CreateOrderRequest,
  created: CreatedOrder,
}

/// Sub-context of the PayPal route.
struct GatewaySettlement {
  api: Arc<dyn OrderApi>,
  payments: Arc<dyn PaymentSession>,
  token: String,
  order_id: Uuid,
  draft: Option<GatewayOrderDraft>,
  capture: Option<PaypalCapture>,
  order: Option<Order>,
}

/// Sub-context of the card / cash on delivery route.
struct DirectSettlement {
  api: Arc<dyn OrderApi>,
  token: String,
  order_id: Uuid,
  order: Option<Order>,
}

/// Root context of one checkout submission.
struct CheckoutRun {
  api: Arc<dyn OrderApi>,
  token: String,
  request: CreateOrderRequest,
  method: PaymentMethod,
  direct_purchase: bool,
  prepare_delay: Duration,
  pending: Arc<Mutex<Option<PendingAttempt>>>,
  created: Option<CreatedOrder>,
  reused_pending: bool,
  gateway: FlowData<GatewaySettlement>,
  direct: FlowData<DirectSettlement>,
  settled: Option<Order>,
  cart_cleared: bool,
  confirmation: Option<Confirmation>,
}

fn normalized_coupon(code: Option<&str>) -> Option<String> {
  code.map(str::trim).filter(|c| !c.is_empty()).map(str::to_uppercase)
}

fn line_keys(request: &CreateOrderRequest) -> Vec<(&str, i64, i64)> {
  request
    .products
    .iter()
    .map(|l| (l.name.trim(), l.quantity, l.price.amount()))
    .collect()
}

/// True when `retry` asks for what `earlier` did. The coupon is compared as
/// typed, since the server may have dropped it from the placed order.
fn same_submission(earlier: &CreateOrderRequest, retry: &CreateOrderRequest) -> bool {
  earlier.payment_method == retry.payment_method
    && line_keys(earlier) == line_keys(retry)
    && normalized_coupon(earlier.coupon_code.as_deref()) == normalized_coupon(retry.coupon_code.as_deref())
    && earlier.customer_info == retry.customer_info
    && earlier.shipping_address == retry.shipping_address
}

fn missing(what: &str) -> AppError {
  AppError::Internal(format!("checkout run reached a stage without {}", what))
}

fn missing_for_route(stage: &str, what: &str) -> FlowError {
  FlowError::Configuration {
    stage: stage.to_string(),
    message: format!("no {} to settle", what),
  }
}

fn gateway_settlement_flow() -> Flow<GatewaySettlement, AppError> {
  let mut flow = Flow::<GatewaySettlement, AppError>::new(vec![
    StageDef::required("open_payment_session"),
    StageDef::required("verify_payment"),
  ]);

  flow.on("open_payment_session", |leg: FlowData<GatewaySettlement>| async move {
    let (payments, draft) = {
      let guard = leg.read();
      let draft = guard
        .draft
        .clone()
        .ok_or_else(|| AppError::Payment("PayPal order was not prepared".to_string()))?;
      (guard.payments.clone(), draft)
    };
    match payments.create_payment_session(&draft).await? {
      PaymentSessionOutcome::Approved(capture) => {
        leg.write().capture = Some(capture);
        Ok::<_, AppError>(Control::Continue)
      }
      PaymentSessionOutcome::Cancelled => {
        info!(gateway_order_id = %draft.gateway_order_id, "Payment session cancelled by the payer.");
        Err(AppError::Payment("Payment cancelled".to_string()))
      }
    }
  });

  flow.on("verify_payment", |leg: FlowData<GatewaySettlement>| async move {
    let (api, token, request) = {
      let guard = leg.read();
      let capture = guard.capture.clone().ok_or_else(|| missing("a capture"))?;
      let request = VerifyPaymentRequest {
        order_id: guard.order_id,
        capture,
        clear_cart: false,
      };
      (guard.api.clone(), guard.token.clone(), request)
    };
    let order = api.verify_payment(&token, request).await?;
    leg.write().order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  flow
}

fn direct_settlement_flow() -> Flow<DirectSettlement, AppError> {
  let mut flow = Flow::<DirectSettlement, AppError>::new(vec![StageDef::required("complete_order")]);

  flow.on("complete_order", |leg: FlowData<DirectSettlement>| async move {
    let (api, token, request) = {
      let guard = leg.read();
      let request = CompleteOrderRequest {
        order_id: guard.order_id,
        clear_cart: false,
      };
      (guard.api.clone(), guard.token.clone(), request)
    };
    let order = api.complete_order(&token, request).await?;
    leg.write().order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  flow
}

fn checkout_flow() -> Flow<CheckoutRun, AppError> {
  let mut flow = Flow::<CheckoutRun, AppError>::new(vec![
    StageDef::required("prepare_payment"),
    StageDef::required("create_order"),
    StageDef::required("settle_payment"),
    StageDef::optional("clear_cart").skip_when(|run: &CheckoutRun| run.direct_purchase),
    StageDef::required("confirm"),
  ]);

  flow.on("prepare_payment", |run: FlowData<CheckoutRun>| async move {
    let delay = run.with(|r| r.prepare_delay);
    debug!(?delay, "Preparing payment.");
    tokio::time::sleep(delay).await;
    Ok::<_, AppError>(Control::Continue)
  });

  // A cancelled PayPal window leaves a pending order behind. Submitting the
  // same form again picks that order up instead of placing a second one.
  flow.on("create_order", |run: FlowData<CheckoutRun>| async move {
    let (api, token, request, pending) = {
      let guard = run.read();
      (guard.api.clone(), guard.token.clone(), guard.request.clone(), guard.pending.clone())
    };

    let previous = pending.lock().clone();
    let reusable = match previous {
      Some(prev) if same_submission(&prev.submitted, &request) => {
        let earlier = prev.created;
        match api.get_order(&token, earlier.order_id).await {
          Ok(current) if current.status == OrderStatus::Pending => Some(earlier),
          Ok(current) => {
            debug!(order_id = %earlier.order_id, status = %current.status, "Earlier order is no longer pending.");
            None
          }
          Err(e) => {
            warn!(order_id = %earlier.order_id, error = %e, "Could not look up earlier order; placing a new one.");
            None
          }
        }
      }
      Some(prev) => {
        debug!(order_id = %prev.created.order_id, "Form changed since the earlier attempt; placing a new order.");
        None
      }
      None => None,
    };

    let reused = reusable.is_some();
    let created = match reusable {
      Some(prev) => {
        info!(order_id = %prev.order_id, order_number = %prev.order_number, "Reusing pending order.");
        prev
      }
      None => {
        let created = api.create_order(&token, request.clone()).await?;
        info!(order_id = %created.order_id, order_number = %created.order_number, "Order placed.");
        created
      }
    };
    *pending.lock() = Some(PendingAttempt {
      submitted: request,
      created: created.clone(),
    });

    let mut guard = run.write();
    guard.created = Some(created);
    guard.reused_pending = reused;
    Ok::<_, AppError>(Control::Continue)
  });

  flow
    .branch("settle_payment")
    .route(Arc::new(gateway_settlement_flow()), |run: FlowData<CheckoutRun>| {
      let guard = run.read();
      let created = guard
        .created
        .as_ref()
        .ok_or_else(|| missing_for_route("settle_payment", "order"))?;
      {
        let mut leg = guard.gateway.write();
        leg.order_id = created.order_id;
        leg.draft = created.gateway.clone();
      }
      Ok(guard.gateway.clone())
    })
    .when(|run: &CheckoutRun| run.method == PaymentMethod::Paypal)
    .route(Arc::new(direct_settlement_flow()), |run: FlowData<CheckoutRun>| {
      let guard = run.read();
      let created = guard
        .created
        .as_ref()
        .ok_or_else(|| missing_for_route("settle_payment", "order"))?;
      guard.direct.write().order_id = created.order_id;
      Ok(guard.direct.clone())
    })
    .when(|run: &CheckoutRun| run.method.is_offline())
    .or_fail()
    .seal(false);

  flow.after("settle_payment", |run: FlowData<CheckoutRun>| async move {
    let mut guard = run.write();
    let settled = if guard.method == PaymentMethod::Paypal {
      guard.gateway.read().order.clone()
    } else {
      guard.direct.read().order.clone()
    };
    guard.settled = Some(settled.ok_or_else(|| missing("a settled order"))?);
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("clear_cart", |run: FlowData<CheckoutRun>| async move {
    let (api, token) = {
      let guard = run.read();
      (guard.api.clone(), guard.token.clone())
    };
    match api.clear_cart(&token).await {
      Ok(removed) => {
        debug!(removed, "Cart emptied.");
        run.update(|r| r.cart_cleared = true);
      }
      Err(e) => warn!(error = %e, "Order placed but the cart could not be emptied."),
    }
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("confirm", |run: FlowData<CheckoutRun>| async move {
    let mut guard = run.write();
    let order = guard.settled.as_ref().ok_or_else(|| missing("a settled order"))?;
    let confirmation = Confirmation::from(order);
    info!(
      order_number = %confirmation.order_number,
      total = confirmation.total_amount,
      payment_status = ?confirmation.payment_status,
      "Checkout complete."
    );
    *guard.pending.lock() = None;
    guard.confirmation = Some(confirmation);
    Ok::<_, AppError>(Control::Continue)
  });

  flow
}

pub struct CheckoutOrchestrator {
  api: Arc<dyn OrderApi>,
  payments: Arc<dyn PaymentSession>,
  session: AuthSession,
  flow: Arc<Flow<CheckoutRun, AppError>>,
  prepare_delay: Duration,
  pending: Arc<Mutex<Option<PendingAttempt>>>,
}

impl CheckoutOrchestrator {
  pub fn new(api: Arc<dyn OrderApi>, payments: Arc<dyn PaymentSession>, session: AuthSession) -> Self {
    Self {
      api,
      payments,
      session,
      flow: Arc::new(checkout_flow()),
      prepare_delay: DEFAULT_PREPARE_DELAY,
      pending: Arc::new(Mutex::new(None)),
    }
  }

  pub fn with_prepare_delay(mut self, delay: Duration) -> Self {
    self.prepare_delay = delay;
    self
  }

  /// The order left pending by the last unfinished attempt, if any.
  pub fn pending_order(&self) -> Option<CreatedOrder> {
    self.pending.lock().as_ref().map(|p| p.created.clone())
  }

  /// Submits the wizard's form for `basket`.
  ///
  /// The form must be complete. On failure the wizard is put back on the
  /// payment step and nothing entered is lost.
  #[instrument(name = "CheckoutOrchestrator::checkout", skip_all, err(Display))]
  pub async fn checkout(&self, wizard: &mut CheckoutWizard, basket: Basket) -> Result<Confirmation> {
    let method = wizard.ensure_complete()?;
    match self.submit(wizard, method, basket).await {
      Ok(confirmation) => Ok(confirmation),
      Err(e) => {
        warn!(error = %e, "Checkout failed; back to the payment step.");
        wizard.return_to_payment();
        Err(e)
      }
    }
  }

  async fn submit(&self, wizard: &CheckoutWizard, method: PaymentMethod, basket: Basket) -> Result<Confirmation> {
    let token = self.session.token()?;
    let direct_purchase = basket.is_direct();
    let products = basket.into_lines();
    if products.is_empty() {
      return Err(AppError::Validation("Your cart is empty".to_string()));
    }

    let form = wizard.form();
    let request = CreateOrderRequest {
      customer_info: Some(form.customer.clone()),
      shipping_address: Some(form.shipping.clone()),
      products,
      payment_method: method.to_string(),
      coupon_code: form.coupon_code.clone(),
    };

    let gateway = FlowData::new(GatewaySettlement {
      api: self.api.clone(),
      payments: self.payments.clone(),
      token: token.clone(),
      order_id: Uuid::nil(),
      draft: None,
      capture: None,
      order: None,
    });
    let direct = FlowData::new(DirectSettlement {
      api: self.api.clone(),
      token: token.clone(),
      order_id: Uuid::nil(),
      order: None,
    });
    let run = FlowData::new(CheckoutRun {
      api: self.api.clone(),
      token,
      request,
      method,
      direct_purchase,
      prepare_delay: self.prepare_delay,
      pending: self.pending.clone(),
      created: None,
      reused_pending: false,
      gateway,
      direct,
      settled: None,
      cart_cleared: false,
      confirmation: None,
    });

    self.flow.run(run.clone()).await?;
    let guard = run.read();
    debug!(reused_pending = guard.reused_pending, cart_cleared = guard.cart_cleared, "Checkout run finished.");
    guard
      .confirmation
      .clone()
      .ok_or_else(|| AppError::Internal("checkout finished without a confirmation".to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{CustomerInfo, ShippingAddress};

  fn line(name: &str, price: i64, quantity: i64) -> OrderLineInput {
    OrderLineInput {
      name: name.into(),
      price: price.into(),
      image: String::new(),
      category: String::new(),
      rating: None,
      quantity,
    }
  }

  fn request(lines: Vec<OrderLineInput>, coupon: Option<&str>) -> CreateOrderRequest {
    CreateOrderRequest {
      customer_info: Some(CustomerInfo {
        name: "Asha Rao".into(),
        email: "asha@example.com".into(),
        phone: "9876543210".into(),
      }),
      shipping_address: Some(ShippingAddress {
        city: "Pune".into(),
        pincode: "411001".into(),
        ..Default::default()
      }),
      products: lines,
      payment_method: "paypal".into(),
      coupon_code: coupon.map(str::to_string),
    }
  }

  #[test]
  fn resubmission_compares_lines_and_coupon_as_typed() {
    let lines = vec![line("Lamp", 600, 2), line("Rug", 900, 1)];
    let earlier = request(lines.clone(), Some("NOSUCHCODE"));
    assert!(same_submission(&earlier, &request(lines.clone(), Some(" nosuchcode "))));
    assert!(!same_submission(&earlier, &request(lines.clone(), None)));
    assert!(!same_submission(&earlier, &request(vec![line("Lamp", 600, 3), line("Rug", 900, 1)], Some("NOSUCHCODE"))));
    assert!(!same_submission(&earlier, &request(vec![line("Lamp", 600, 2)], Some("NOSUCHCODE"))));
  }

  #[test]
  fn resubmission_compares_buyer_address_and_method() {
    let earlier = request(vec![line("Lamp", 600, 2)], None);

    let mut moved = earlier.clone();
    if let Some(address) = moved.shipping_address.as_mut() {
      address.city = "Mumbai".into();
    }
    assert!(!same_submission(&earlier, &moved));

    let mut renamed = earlier.clone();
    if let Some(customer) = renamed.customer_info.as_mut() {
      customer.phone = "9123456780".into();
    }
    assert!(!same_submission(&earlier, &renamed));

    let mut cod = earlier.clone();
    cod.payment_method = "cod".into();
    assert!(!same_submission(&earlier, &cod));
  }

  #[test]
  fn buy_now_is_direct_and_single_line() {
    let basket = Basket::BuyNow(line("Lamp", 600, 1));
    assert!(basket.is_direct());
    assert_eq!(basket.into_lines().len(), 1);
    assert!(!Basket::Cart(vec![]).is_direct());
  }
}
