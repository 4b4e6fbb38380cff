// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use intellibazar::config::AppConfig;
use intellibazar::models::coupon::NewCoupon;
use intellibazar::models::{CustomerInfo, DiscountType, ShippingAddress};
use intellibazar::services::auth_service::{AuthSuccess, SignupRequest};
use intellibazar::services::notifier::{DeliveryReceipt, Notification, Notifier};
use intellibazar::services::orders::{CreateOrderRequest, OrderLineInput};
use intellibazar::store::memory::MemoryStore;
use intellibazar::{AppState, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::Level;

static TRACING: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING);
}

/// Keeps every notification instead of delivering it.
#[derive(Default)]
pub struct RecordingNotifier {
  pub sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
  pub fn subjects(&self) -> Vec<String> {
    self.sent.lock().iter().map(|n| n.subject.clone()).collect()
  }
}

#[async_trait]
impl Notifier for RecordingNotifier {
  async fn send(&self, notification: Notification) -> Result<DeliveryReceipt> {
    self.sent.lock().push(notification);
    Ok(DeliveryReceipt {
      message_id: "test".to_string(),
    })
  }
}

pub fn config(with_paypal: bool) -> AppConfig {
  let mut vars: HashMap<&str, &str> = HashMap::new();
  vars.insert("TOKEN_SECRET", "integration-test-secret");
  if with_paypal {
    vars.insert("PAYPAL_CLIENT_ID", "sandbox-client");
    vars.insert("PAYPAL_CLIENT_SECRET", "sandbox-secret");
    vars.insert("PAYPAL_CONVERSION_RATE", "0.012");
  }
  AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).expect("test config")
}

pub struct TestApp {
  pub state: AppState,
  pub notifier: Arc<RecordingNotifier>,
}

pub fn app(with_paypal: bool) -> TestApp {
  setup_tracing();
  let notifier = Arc::new(RecordingNotifier::default());
  let state = AppState::new(config(with_paypal), Arc::new(MemoryStore::new()), notifier.clone());
  TestApp { state, notifier }
}

pub async fn signup(state: &AppState, name: &str, email: &str) -> AuthSuccess {
  state
    .auth()
    .signup(SignupRequest {
      name: name.to_string(),
      email: email.to_string(),
      password: "correct horse battery".to_string(),
    })
    .await
    .expect("signup")
}

pub fn line(name: &str, price: i64, quantity: i64) -> OrderLineInput {
  OrderLineInput {
    name: name.to_string(),
    price: price.into(),
    image: format!("/img/{}.png", name.to_lowercase()),
    category: "home".to_string(),
    rating: Some(4.5),
    quantity,
  }
}

pub fn customer() -> CustomerInfo {
  CustomerInfo {
    name: "Asha Rao".to_string(),
    email: "asha@example.com".to_string(),
    phone: "9876543210".to_string(),
  }
}

pub fn shipping() -> ShippingAddress {
  ShippingAddress {
    first_name: "Asha".to_string(),
    last_name: "Rao".to_string(),
    phone: "9876543210".to_string(),
    street_address: "12 MG Road".to_string(),
    city: "Pune".to_string(),
    state: "MH".to_string(),
    pincode: "411001".to_string(),
    country: String::new(),
  }
}

pub fn order_request(products: Vec<OrderLineInput>, method: &str, coupon: Option<&str>) -> CreateOrderRequest {
  CreateOrderRequest {
    customer_info: Some(customer()),
    shipping_address: Some(shipping()),
    products,
    payment_method: method.to_string(),
    coupon_code: coupon.map(str::to_string),
  }
}

pub fn fixed_coupon(code: &str, value: i64, min_order_amount: i64) -> NewCoupon {
  NewCoupon {
    code: code.to_string(),
    description: format!("{} off", value),
    discount_type: DiscountType::Fixed,
    discount_value: value,
    max_discount: None,
    min_order_amount,
    usage_limit: None,
    user_usage_limit: 1,
    valid_from: None,
    valid_until: Utc::now() + Duration::days(30),
    is_active: true,
  }
}

pub fn percent_coupon(code: &str, percent: i64, max_discount: Option<i64>) -> NewCoupon {
  NewCoupon {
    discount_type: DiscountType::Percentage,
    discount_value: percent,
    max_discount,
    ..fixed_coupon(code, percent, 0)
  }
}
