// storefront/src/services/paypal.rs

//! PayPal order drafting and capture verification. The client SDK performs
//! the actual approval and capture; the server prepares the order payload
//! and checks what the client reports back.

use crate::config::PaypalConfig;
use crate::errors::{AppError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const NOT_CONFIGURED: &str = "PayPal is not configured. Please use Cash on Delivery.";
pub const CAPTURE_COMPLETED: &str = "COMPLETED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayAmount {
  pub currency_code: String,
  pub value: String,
}

/// Payload handed to the client to open its PayPal session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrderDraft {
  pub gateway_order_id: String,
  pub intent: String,
  pub reference_id: String,
  pub amount: GatewayAmount,
  pub return_url: String,
  pub cancel_url: String,
}

/// What the client reports after the payer approved and the capture ran.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaypalCapture {
  #[serde(alias = "orderID", alias = "paypalOrderId")]
  pub gateway_order_id: String,
  #[serde(alias = "captureID", alias = "transactionId")]
  pub capture_id: String,
  pub status: String,
  #[serde(default)]
  pub payer_email: Option<String>,
  /// Captured amount in the gateway currency, e.g. `"17.00"`.
  #[serde(default)]
  pub amount: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedCapture {
  pub capture_id: String,
  pub payer_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PaypalGateway {
  config: PaypalConfig,
  frontend_url: String,
}

impl PaypalGateway {
  pub fn new(config: PaypalConfig, frontend_url: impl Into<String>) -> Self {
    Self {
      config,
      frontend_url: frontend_url.into(),
    }
  }

  pub fn currency(&self) -> &str {
    &self.config.currency
  }

  /// Base-currency amount in the gateway currency, two decimal places.
  pub fn convert(&self, amount: i64) -> Decimal {
    (Decimal::from(amount) * self.config.conversion_rate)
      .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
  }

  #[instrument(name = "PaypalGateway::draft_order", skip(self), err(Display))]
  pub fn draft_order(&self, order_number: &str, total_amount: i64) -> Result<GatewayOrderDraft> {
    let value = self.convert(total_amount);
    if value <= Decimal::ZERO {
      return Err(AppError::Payment("Order total is too small for PayPal".to_string()));
    }
    let draft = GatewayOrderDraft {
      gateway_order_id: format!("PP-{}", Uuid::new_v4().simple()).to_uppercase(),
      intent: "CAPTURE".to_string(),
      reference_id: order_number.to_string(),
      amount: GatewayAmount {
        currency_code: self.config.currency.clone(),
        value: format!("{:.2}", value),
      },
      return_url: format!("{}/order-success?orderNumber={}", self.frontend_url, order_number),
      cancel_url: format!("{}/checkout?cancelled=true", self.frontend_url),
    };
    info!(gateway_order_id = %draft.gateway_order_id, value = %draft.amount.value, "PayPal order drafted.");
    Ok(draft)
  }

  /// Checks a reported capture against the drafted order.
  #[instrument(name = "PaypalGateway::verify_capture", skip(self, capture), fields(capture_id = %capture.capture_id), err(Display))]
  pub fn verify_capture(
    &self,
    capture: &PaypalCapture,
    drafted_order_id: Option<&str>,
    total_amount: i64,
  ) -> Result<VerifiedCapture> {
    if !capture.status.eq_ignore_ascii_case(CAPTURE_COMPLETED) {
      return Err(AppError::Payment(format!("Payment not completed (status {})", capture.status)));
    }
    if capture.capture_id.trim().is_empty() {
      return Err(AppError::Payment("Missing PayPal transaction id".to_string()));
    }
    if let Some(drafted) = drafted_order_id {
      if drafted != capture.gateway_order_id {
        warn!(%drafted, reported = %capture.gateway_order_id, "PayPal order id mismatch.");
        return Err(AppError::Payment("PayPal order does not match this order".to_string()));
      }
    }
    if let Some(raw) = &capture.amount {
      let reported =
        Decimal::from_str(raw.trim()).map_err(|_| AppError::Payment(format!("Unreadable captured amount '{}'", raw)))?;
      let expected = self.convert(total_amount);
      if reported != expected {
        warn!(%reported, %expected, "Captured amount differs from order total.");
        return Err(AppError::Payment("Captured amount does not match order total".to_string()));
      }
    }
    Ok(VerifiedCapture {
      capture_id: capture.capture_id.trim().to_string(),
      payer_email: capture.payer_email.clone(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use secrecy::SecretString;

  fn gateway() -> PaypalGateway {
    PaypalGateway::new(
      PaypalConfig {
        client_id: "client".into(),
        client_secret: SecretString::from("secret".to_string()),
        currency: "USD".into(),
        conversion_rate: Decimal::new(12, 3),
      },
      "http://localhost:5173",
    )
  }

  #[test]
  fn converts_with_two_decimals() {
    // 1416 * 0.012 = 16.992
    assert_eq!(gateway().convert(1416).to_string(), "16.99");
  }

  #[test]
  fn draft_carries_reference_and_urls() {
    let draft = gateway().draft_order("IBABCDEFGHJK", 1416).unwrap();
    assert_eq!(draft.intent, "CAPTURE");
    assert_eq!(draft.reference_id, "IBABCDEFGHJK");
    assert_eq!(draft.amount.value, "16.99");
    assert!(draft.return_url.starts_with("http://localhost:5173/"));
    assert!(draft.gateway_order_id.starts_with("PP-"));
  }

  #[test]
  fn capture_checks() {
    let gw = gateway();
    let good = PaypalCapture {
      gateway_order_id: "PP-1".into(),
      capture_id: "CAP-9".into(),
      status: "COMPLETED".into(),
      payer_email: Some("payer@example.com".into()),
      amount: Some("16.99".into()),
    };
    assert!(gw.verify_capture(&good, Some("PP-1"), 1416).is_ok());

    let pending = PaypalCapture { status: "PENDING".into(), ..good.clone() };
    assert!(matches!(gw.verify_capture(&pending, Some("PP-1"), 1416), Err(AppError::Payment(_))));

    assert!(gw.verify_capture(&good, Some("PP-2"), 1416).is_err());
    assert!(gw.verify_capture(&good, Some("PP-1"), 2000).is_err());

    let no_amount = PaypalCapture { amount: None, ..good };
    assert!(gw.verify_capture(&no_amount, None, 2000).is_ok());
  }
}
