// storefront/src/checkout/payment.rs

//! The payer-facing half of a gateway payment. A real client opens the
//! PayPal widget for the drafted order; the payer either approves (and the
//! widget captures) or closes it.

use crate::errors::Result;
use crate::services::paypal::{GatewayOrderDraft, PaypalCapture, CAPTURE_COMPLETED};
use async_trait::async_trait;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentSessionOutcome {
  /// The payer approved and the gateway captured the funds.
  Approved(PaypalCapture),
  /// The payer closed the session without paying.
  Cancelled,
}

#[async_trait]
pub trait PaymentSession: Send + Sync {
  async fn create_payment_session(&self, draft: &GatewayOrderDraft) -> Result<PaymentSessionOutcome>;
}

/// Stands in for the PayPal widget: approves or cancels every session.
#[derive(Debug, Clone)]
pub struct SimulatedPaypalSession {
  approve: bool,
  payer_email: Option<String>,
}

impl SimulatedPaypalSession {
  pub fn approving(payer_email: impl Into<String>) -> Self {
    Self {
      approve: true,
      payer_email: Some(payer_email.into()),
    }
  }

  pub fn cancelling() -> Self {
    Self {
      approve: false,
      payer_email: None,
    }
  }
}

#[async_trait]
impl PaymentSession for SimulatedPaypalSession {
  #[instrument(name = "SimulatedPaypalSession::create", skip(self, draft), fields(gateway_order_id = %draft.gateway_order_id))]
  async fn create_payment_session(&self, draft: &GatewayOrderDraft) -> Result<PaymentSessionOutcome> {
    if !self.approve {
      info!("Payer closed the PayPal window.");
      return Ok(PaymentSessionOutcome::Cancelled);
    }
    let capture = PaypalCapture {
      gateway_order_id: draft.gateway_order_id.clone(),
      capture_id: format!("CAP-{}", Uuid::new_v4().simple()).to_uppercase(),
      status: CAPTURE_COMPLETED.to_string(),
      payer_email: self.payer_email.clone(),
      amount: Some(draft.amount.value.clone()),
    };
    info!(capture_id = %capture.capture_id, amount = %draft.amount.value, "Payer approved; funds captured.");
    Ok(PaymentSessionOutcome::Approved(capture))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::paypal::GatewayAmount;

  fn draft() -> GatewayOrderDraft {
    GatewayOrderDraft {
      gateway_order_id: "PP-1".into(),
      intent: "CAPTURE".into(),
      reference_id: "IB1".into(),
      amount: GatewayAmount {
        currency_code: "USD".into(),
        value: "17.00".into(),
      },
      return_url: String::new(),
      cancel_url: String::new(),
    }
  }

  #[tokio::test]
  async fn approved_capture_mirrors_the_draft() {
    let outcome = SimulatedPaypalSession::approving("payer@example.com")
      .create_payment_session(&draft())
      .await
      .unwrap();
    let PaymentSessionOutcome::Approved(capture) = outcome else {
      panic!("expected approval");
    };
    assert_eq!(capture.gateway_order_id, "PP-1");
    assert_eq!(capture.amount.as_deref(), Some("17.00"));
    assert_eq!(capture.status, CAPTURE_COMPLETED);
  }

  #[tokio::test]
  async fn cancelling_session_reports_cancel() {
    let outcome = SimulatedPaypalSession::cancelling()
      .create_payment_session(&draft())
      .await
      .unwrap();
    assert_eq!(outcome, PaymentSessionOutcome::Cancelled);
  }
}
