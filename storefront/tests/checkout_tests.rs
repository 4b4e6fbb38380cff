// tests/checkout_tests.rs
mod common;

use async_trait::async_trait;
use common::line;
use intellibazar::checkout::{
  AuthSession, Basket, CheckoutOrchestrator, CheckoutStep, CheckoutWizard, LocalOrderApi, PaymentSession,
  PaymentSessionOutcome, SimulatedPaypalSession,
};
use intellibazar::models::{CartItem, OrderStatus, PaymentMethod, PaymentStatus, ProductSnapshot};
use intellibazar::services::paypal::GatewayOrderDraft;
use intellibazar::store::Page;
use intellibazar::{AppError, AppState, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Cancels the first `cancellations` sessions, then approves.
struct HesitantPayer {
  cancellations: usize,
  opened: AtomicUsize,
}

impl HesitantPayer {
  fn new(cancellations: usize) -> Self {
    Self {
      cancellations,
      opened: AtomicUsize::new(0),
    }
  }
}

#[async_trait]
impl PaymentSession for HesitantPayer {
  async fn create_payment_session(&self, draft: &GatewayOrderDraft) -> Result<PaymentSessionOutcome> {
    let attempt = self.opened.fetch_add(1, Ordering::SeqCst);
    if attempt < self.cancellations {
      SimulatedPaypalSession::cancelling().create_payment_session(draft).await
    } else {
      SimulatedPaypalSession::approving("payer@example.com")
        .create_payment_session(draft)
        .await
    }
  }
}

fn wizard(method: PaymentMethod) -> CheckoutWizard {
  let mut w = CheckoutWizard::new();
  w.form_mut().customer = common::customer();
  w.form_mut().shipping = common::shipping();
  w.form_mut().payment_method = Some(method);
  w
}

async fn signed_in(state: &AppState) -> (AuthSession, Uuid) {
  let auth = common::signup(state, "Asha", "asha@example.com").await;
  let session = AuthSession::new();
  session.login(&auth);
  (session, auth.user.id)
}

fn orchestrator(state: &AppState, payments: Arc<dyn PaymentSession>, session: AuthSession) -> CheckoutOrchestrator {
  CheckoutOrchestrator::new(Arc::new(LocalOrderApi::new(state.clone())), payments, session)
    .with_prepare_delay(Duration::from_millis(1))
}

async fn fill_cart(state: &AppState, user_id: Uuid) {
  let snapshot = ProductSnapshot {
    name: "Lamp".to_string(),
    price: 600,
    image: String::new(),
    category: "home".to_string(),
    rating: None,
  };
  state
    .store
    .add_to_cart(&CartItem::new(user_id, snapshot, 2))
    .await
    .unwrap();
}

#[tokio::test]
async fn cash_on_delivery_checkout_confirms_and_empties_cart() {
  let app = common::app(false);
  let (session, user_id) = signed_in(&app.state).await;
  fill_cart(&app.state, user_id).await;
  let checkout = orchestrator(&app.state, Arc::new(SimulatedPaypalSession::cancelling()), session);

  let mut w = wizard(PaymentMethod::Cod);
  let confirmation = checkout
    .checkout(&mut w, Basket::Cart(vec![line("Lamp", 600, 2)]))
    .await
    .unwrap();

  assert_eq!(confirmation.status, OrderStatus::Confirmed);
  assert_eq!(confirmation.payment_status, PaymentStatus::Pending);
  assert_eq!(confirmation.total_amount, 1416);
  assert_eq!(confirmation.pricing.tax, 216);
  assert!(confirmation.order_number.starts_with("IB"));
  assert!(app.state.store.cart_items(user_id).await.unwrap().is_empty());
  assert!(checkout.pending_order().is_none());
}

#[tokio::test]
async fn buy_now_leaves_the_cart_alone() {
  let app = common::app(false);
  let (session, user_id) = signed_in(&app.state).await;
  fill_cart(&app.state, user_id).await;
  let checkout = orchestrator(&app.state, Arc::new(SimulatedPaypalSession::cancelling()), session);

  let mut w = wizard(PaymentMethod::Cod);
  let confirmation = checkout
    .checkout(&mut w, Basket::BuyNow(line("Rug", 900, 1)))
    .await
    .unwrap();

  assert_eq!(confirmation.total_amount, 900 + 99 + 162);
  assert_eq!(app.state.store.cart_items(user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn cancelled_paypal_keeps_one_pending_order_that_the_retry_reuses() {
  let app = common::app(true);
  let (session, user_id) = signed_in(&app.state).await;
  let payer = Arc::new(HesitantPayer::new(1));
  let checkout = orchestrator(&app.state, payer.clone(), session);
  let basket = Basket::Cart(vec![line("Lamp", 600, 2)]);

  let mut w = wizard(PaymentMethod::Paypal);
  let err = checkout.checkout(&mut w, basket.clone()).await.unwrap_err();
  assert!(matches!(err, AppError::Payment(_)));
  assert_eq!(err.public_message(), "Payment cancelled");
  assert_eq!(w.step(), CheckoutStep::Payment);
  assert_eq!(w.form().shipping.city, "Pune");

  let pending = checkout.pending_order().expect("pending order kept");
  let stored = app.state.orders().get(user_id, pending.order_id).await.unwrap();
  assert_eq!(stored.status, OrderStatus::Pending);

  let confirmation = checkout.checkout(&mut w, basket).await.unwrap();
  assert_eq!(confirmation.order_id, pending.order_id);
  assert_eq!(confirmation.status, OrderStatus::Confirmed);
  assert_eq!(confirmation.payment_status, PaymentStatus::Completed);
  assert_eq!(payer.opened.load(Ordering::SeqCst), 2);

  let listed = app.state.orders().list_for(user_id, Page::default()).await.unwrap();
  assert_eq!(listed.total, 1);
}

#[tokio::test]
async fn changed_basket_after_cancel_places_a_new_order() {
  let app = common::app(true);
  let (session, user_id) = signed_in(&app.state).await;
  let checkout = orchestrator(&app.state, Arc::new(HesitantPayer::new(1)), session);

  let mut w = wizard(PaymentMethod::Paypal);
  checkout
    .checkout(&mut w, Basket::Cart(vec![line("Lamp", 600, 2)]))
    .await
    .unwrap_err();
  let first = checkout.pending_order().expect("pending order kept");

  let confirmation = checkout
    .checkout(&mut w, Basket::Cart(vec![line("Lamp", 600, 3)]))
    .await
    .unwrap();
  assert_ne!(confirmation.order_id, first.order_id);
  assert_eq!(app.state.orders().list_for(user_id, Page::default()).await.unwrap().total, 2);
}

#[tokio::test]
async fn signed_out_checkout_fails_on_the_payment_step() {
  let app = common::app(false);
  let checkout = orchestrator(&app.state, Arc::new(SimulatedPaypalSession::cancelling()), AuthSession::new());

  let mut w = wizard(PaymentMethod::Cod);
  let err = checkout
    .checkout(&mut w, Basket::BuyNow(line("Rug", 900, 1)))
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Auth(_)));
  assert_eq!(w.step(), CheckoutStep::Payment);
}

#[tokio::test]
async fn incomplete_form_is_not_submitted() {
  let app = common::app(false);
  let (session, user_id) = signed_in(&app.state).await;
  let checkout = orchestrator(&app.state, Arc::new(SimulatedPaypalSession::cancelling()), session);

  let mut w = wizard(PaymentMethod::Cod);
  w.form_mut().shipping.pincode = "12".to_string();
  let err = checkout
    .checkout(&mut w, Basket::BuyNow(line("Rug", 900, 1)))
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));
  assert_eq!(w.step(), CheckoutStep::CustomerInfo);
  assert_eq!(app.state.orders().list_for(user_id, Page::default()).await.unwrap().total, 0);
}

#[tokio::test]
async fn retry_with_a_dropped_coupon_reuses_the_pending_order() {
  let app = common::app(true);
  let (session, user_id) = signed_in(&app.state).await;
  let checkout = orchestrator(&app.state, Arc::new(HesitantPayer::new(1)), session);
  let basket = Basket::Cart(vec![line("Lamp", 600, 2)]);

  let mut w = wizard(PaymentMethod::Paypal);
  w.form_mut().coupon_code = Some("NOSUCHCODE".to_string());
  checkout.checkout(&mut w, basket.clone()).await.unwrap_err();
  let pending = checkout.pending_order().expect("pending order kept");
  assert_eq!(pending.order.pricing.coupon_code, None);

  let confirmation = checkout.checkout(&mut w, basket).await.unwrap();
  assert_eq!(confirmation.order_id, pending.order_id);
  assert_eq!(confirmation.pricing.discount, 0);
  assert_eq!(app.state.orders().list_for(user_id, Page::default()).await.unwrap().total, 1);
}

#[tokio::test]
async fn retry_after_an_address_edit_ships_to_the_new_address() {
  let app = common::app(true);
  let (session, user_id) = signed_in(&app.state).await;
  let checkout = orchestrator(&app.state, Arc::new(HesitantPayer::new(1)), session);
  let basket = Basket::Cart(vec![line("Lamp", 600, 2)]);

  let mut w = wizard(PaymentMethod::Paypal);
  checkout.checkout(&mut w, basket.clone()).await.unwrap_err();
  let first = checkout.pending_order().expect("pending order kept");

  w.form_mut().shipping.city = "Mumbai".to_string();
  let confirmation = checkout.checkout(&mut w, basket).await.unwrap();
  assert_ne!(confirmation.order_id, first.order_id);

  let shipped = app.state.orders().get(user_id, confirmation.order_id).await.unwrap();
  assert_eq!(shipped.shipping_address.city, "Mumbai");
  let stale = app.state.orders().get(user_id, first.order_id).await.unwrap();
  assert_eq!(stale.status, OrderStatus::Pending);
}
