// storefront/src/services/notifier.rs

//! Customer notifications. Delivery is simulated through the log; the
//! [`Notifier`] trait is the seam for a real mail transport.

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub to: String,
  pub subject: String,
  pub body: String,
}

#[derive(Debug, Clone)]
pub struct DeliveryReceipt {
  pub message_id: String,
}

#[async_trait]
pub trait Notifier: Send + Sync {
  async fn send(&self, notification: Notification) -> Result<DeliveryReceipt>;
}

/// Logs each message instead of sending it.
pub struct MailLogNotifier {
  sender: String,
  latency: Duration,
}

impl MailLogNotifier {
  pub fn new(sender: impl Into<String>) -> Self {
    Self {
      sender: sender.into(),
      latency: Duration::from_millis(20),
    }
  }
}

#[async_trait]
impl Notifier for MailLogNotifier {
  async fn send(&self, n: Notification) -> Result<DeliveryReceipt> {
    if n.to.trim().is_empty() {
      return Err(AppError::Validation("Notification has no recipient".to_string()));
    }
    tokio::time::sleep(self.latency).await;
    let message_id = format!("mail_{}", Uuid::new_v4().simple());
    let preview: String = n.body.chars().take(60).collect();
    info!(from = %self.sender, to = %n.to, subject = %n.subject, %preview, %message_id, "Mail delivered (simulated).");
    Ok(DeliveryReceipt { message_id })
  }
}

/// Sends in the background. Failures are logged and never reach the caller.
pub fn dispatch(notifier: Arc<dyn Notifier>, notification: Notification) -> tokio::task::JoinHandle<()> {
  tokio::spawn(async move {
    let to = notification.to.clone();
    let subject = notification.subject.clone();
    if let Err(e) = notifier.send(notification).await {
      warn!(%to, %subject, error = %e, "Notification failed.");
    }
  })
}

pub fn order_confirmed(order: &Order) -> Notification {
  let lines: Vec<String> = order
    .products
    .iter()
    .map(|l| format!("{} x{} = ₹{}", l.product.name, l.quantity, l.line_total()))
    .collect();
  Notification {
    to: order.customer_info.email.clone(),
    subject: format!("Order Confirmed - {}", order.order_number()),
    body: format!(
      "Hi {},\n\nThank you for shopping with IntelliBazar. Your order {} is confirmed.\n\n{}\n\nSubtotal: ₹{}\nShipping: ₹{}\nTax: ₹{}\nDiscount: ₹{}\nTotal: ₹{}\n",
      order.customer_info.name,
      order.order_number(),
      lines.join("\n"),
      order.pricing.subtotal,
      order.pricing.shipping,
      order.pricing.tax,
      order.pricing.discount,
      order.pricing.total_amount,
    ),
  }
}

pub fn status_changed(order: &Order, previous: OrderStatus) -> Notification {
  let mut body = format!(
    "Hi {},\n\nYour order {} moved from {} to {}.",
    order.customer_info.name,
    order.order_number(),
    previous.label(),
    order.status.label()
  );
  if let (Some(carrier), Some(number)) = (&order.tracking.carrier, &order.tracking.tracking_number) {
    body.push_str(&format!("\nCarrier: {} ({})", carrier, number));
  }
  if let Some(eta) = order.tracking.estimated_delivery {
    body.push_str(&format!("\nEstimated delivery: {}", eta.format("%d %b %Y")));
  }
  Notification {
    to: order.customer_info.email.clone(),
    subject: format!("Order {} - {}", order.order_number(), order.status.label()),
    body,
  }
}
