// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::Type as SqlxType;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::address::Address;
use super::product::ProductSnapshot;

pub const ORDER_NUMBER_PREFIX: &str = "IB";
const ORDER_NUMBER_SUFFIX_LEN: usize = 10;
const ORDER_NUMBER_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "order_status_enum", rename_all = "lowercase")]
pub enum OrderStatus {
  Pending,
  Confirmed,
  Processing,
  Shipped,
  Delivered,
  Cancelled,
  Refunded,
}

/// The forward lifecycle. `Cancelled` and `Refunded` sit outside it.
pub const LIFECYCLE: [OrderStatus; 5] = [
  OrderStatus::Pending,
  OrderStatus::Confirmed,
  OrderStatus::Processing,
  OrderStatus::Shipped,
  OrderStatus::Delivered,
];

impl OrderStatus {
  pub const ALL: [OrderStatus; 7] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
    OrderStatus::Refunded,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "pending",
      OrderStatus::Confirmed => "confirmed",
      OrderStatus::Processing => "processing",
      OrderStatus::Shipped => "shipped",
      OrderStatus::Delivered => "delivered",
      OrderStatus::Cancelled => "cancelled",
      OrderStatus::Refunded => "refunded",
    }
  }

  pub fn label(&self) -> &'static str {
    match self {
      OrderStatus::Pending => "Order Placed",
      OrderStatus::Confirmed => "Order Confirmed",
      OrderStatus::Processing => "Processing",
      OrderStatus::Shipped => "Shipped",
      OrderStatus::Delivered => "Delivered",
      OrderStatus::Cancelled => "Cancelled",
      OrderStatus::Refunded => "Refunded",
    }
  }

  fn lifecycle_index(&self) -> Option<usize> {
    LIFECYCLE.iter().position(|s| s == self)
  }

  pub fn is_terminal(&self) -> bool {
    matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Refunded)
  }

  /// Transition rules for status updates:
  /// forward moves along the lifecycle, `cancelled`/`refunded` from any
  /// non-terminal state, and `delivered -> refunded`. Same-status is not a
  /// transition and is handled by the caller.
  pub fn can_transition_to(&self, next: OrderStatus) -> bool {
    if *self == next {
      return false;
    }
    match (self, next) {
      (OrderStatus::Delivered, OrderStatus::Refunded) => true,
      (from, _) if from.is_terminal() => false,
      (_, OrderStatus::Cancelled | OrderStatus::Refunded) => true,
      (from, to) => match (from.lifecycle_index(), to.lifecycle_index()) {
        (Some(a), Some(b)) => b > a,
        _ => false,
      },
    }
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    OrderStatus::ALL
      .iter()
      .copied()
      .find(|status| status.as_str() == s.trim().to_lowercase())
      .ok_or_else(|| format!("Invalid order status '{}'", s))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
  Card,
  Cod,
  Paypal,
}

impl PaymentMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentMethod::Card => "card",
      PaymentMethod::Cod => "cod",
      PaymentMethod::Paypal => "paypal",
    }
  }

  /// Methods finalized by the `complete` endpoint rather than by a gateway callback.
  pub fn is_offline(&self) -> bool {
    matches!(self, PaymentMethod::Card | PaymentMethod::Cod)
  }
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PaymentMethod {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.trim().to_lowercase().as_str() {
      "card" => Ok(PaymentMethod::Card),
      "cod" => Ok(PaymentMethod::Cod),
      "paypal" => Ok(PaymentMethod::Paypal),
      other => Err(format!("Unsupported payment method '{}'", other)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
  Pending,
  Completed,
  Failed,
  Refunded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
  pub method: PaymentMethod,
  pub status: PaymentStatus,
  pub gateway_order_id: Option<String>,
  pub transaction_id: Option<String>,
  pub payer_email: Option<String>,
  pub paid_at: Option<DateTime<Utc>>,
}

impl Payment {
  pub fn pending(method: PaymentMethod) -> Self {
    Self {
      method,
      status: PaymentStatus::Pending,
      gateway_order_id: None,
      transaction_id: None,
      payer_email: None,
      paid_at: None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomerInfo {
  pub name: String,
  pub email: String,
  pub phone: String,
}

/// Copy of the delivery address taken when the order is placed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingAddress {
  pub first_name: String,
  pub last_name: String,
  pub phone: String,
  pub street_address: String,
  pub city: String,
  pub state: String,
  pub pincode: String,
  pub country: String,
}

impl From<&Address> for ShippingAddress {
  fn from(a: &Address) -> Self {
    Self {
      first_name: a.first_name.clone(),
      last_name: a.last_name.clone(),
      phone: a.phone.clone(),
      street_address: a.street_address.clone(),
      city: a.city.clone(),
      state: a.state.clone(),
      pincode: a.pincode.clone(),
      country: a.country.clone(),
    }
  }
}

/// A product as it was when ordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
  #[serde(flatten)]
  pub product: ProductSnapshot,
  pub quantity: i64,
}

impl OrderLine {
  pub fn line_total(&self) -> i64 {
    self.product.price.saturating_mul(self.quantity)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingBreakdown {
  pub subtotal: i64,
  pub shipping: i64,
  pub tax: i64,
  pub discount: i64,
  pub coupon_code: Option<String>,
  pub total_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracking {
  pub order_number: String,
  pub carrier: Option<String>,
  pub tracking_number: Option<String>,
  pub estimated_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
  pub status: OrderStatus,
  pub at: DateTime<Utc>,
  pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub customer_info: CustomerInfo,
  pub shipping_address: ShippingAddress,
  pub products: Vec<OrderLine>,
  pub pricing: PricingBreakdown,
  pub payment: Payment,
  pub status: OrderStatus,
  pub tracking: Tracking,
  pub status_history: Vec<StatusChange>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
  pub status: OrderStatus,
  pub label: &'static str,
  pub completed: bool,
  pub current: bool,
  pub at: Option<DateTime<Utc>>,
}

impl Order {
  pub fn order_number(&self) -> &str {
    &self.tracking.order_number
  }

  /// Moves the order to `status`, stamping `updated_at` and the history.
  pub fn set_status(&mut self, status: OrderStatus, at: DateTime<Utc>, note: Option<String>) {
    self.status = status;
    self.updated_at = at;
    self.status_history.push(StatusChange { status, at, note });
  }

  fn reached_at(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
    self
      .status_history
      .iter()
      .rev()
      .find(|c| c.status == status)
      .map(|c| c.at)
  }

  /// Lifecycle steps with completion flags for the public tracking page.
  /// A cancelled or refunded order shows the steps it actually reached
  /// followed by the terminal state.
  pub fn timeline(&self) -> Vec<TimelineEntry> {
    let current_idx = LIFECYCLE.iter().position(|s| *s == self.status);
    let mut entries: Vec<TimelineEntry> = LIFECYCLE
      .iter()
      .enumerate()
      .map(|(idx, status)| {
        let reached = self.reached_at(*status);
        let completed = match current_idx {
          Some(cur) => idx <= cur,
          None => reached.is_some(),
        };
        TimelineEntry {
          status: *status,
          label: status.label(),
          completed,
          current: current_idx == Some(idx),
          at: reached,
        }
      })
      .collect();

    if current_idx.is_none() {
      entries.retain(|e| e.completed);
      entries.push(TimelineEntry {
        status: self.status,
        label: self.status.label(),
        completed: true,
        current: true,
        at: self.reached_at(self.status),
      });
    }
    entries
  }
}

/// `IB` followed by ten random characters from an unambiguous upper-case
/// alphabet. Uniqueness is enforced by the store; callers retry on conflict.
pub fn generate_order_number() -> String {
  let mut rng = rand::rng();
  let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
    .map(|_| ORDER_NUMBER_ALPHABET[rng.random_range(0..ORDER_NUMBER_ALPHABET.len())] as char)
    .collect();
  format!("{}{}", ORDER_NUMBER_PREFIX, suffix)
}
