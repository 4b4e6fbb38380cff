// storefront/src/checkout/wizard.rs

//! The three-step checkout form. Moving forward requires the current step
//! to validate; moving back never loses what was entered.

use crate::errors::{AppError, Result};
use crate::models::address::is_valid_pincode;
use crate::models::{Address, CustomerInfo, PaymentMethod, ShippingAddress};
use crate::services::auth_service::is_valid_email;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

static CARD_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{13,19}$").expect("static card pattern"));
static CARD_EXPIRY: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^(0[1-9]|1[0-2])/[0-9]{2}$").expect("static expiry pattern"));
static CARD_CVV: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{3,4}$").expect("static cvv pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStep {
  CustomerInfo,
  ShippingAddress,
  Payment,
}

impl CheckoutStep {
  fn next(self) -> Option<Self> {
    match self {
      CheckoutStep::CustomerInfo => Some(CheckoutStep::ShippingAddress),
      CheckoutStep::ShippingAddress => Some(CheckoutStep::Payment),
      CheckoutStep::Payment => None,
    }
  }

  fn previous(self) -> Option<Self> {
    match self {
      CheckoutStep::CustomerInfo => None,
      CheckoutStep::ShippingAddress => Some(CheckoutStep::CustomerInfo),
      CheckoutStep::Payment => Some(CheckoutStep::ShippingAddress),
    }
  }
}

impl fmt::Display for CheckoutStep {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      CheckoutStep::CustomerInfo => "customer information",
      CheckoutStep::ShippingAddress => "shipping address",
      CheckoutStep::Payment => "payment",
    };
    f.write_str(label)
  }
}

/// Card fields are only checked for shape; nothing is charged client-side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
  pub holder: String,
  pub number: String,
  pub expiry: String,
  pub cvv: String,
}

impl CardDetails {
  fn validate(&self) -> Result<()> {
    let number: String = self.number.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    if self.holder.trim().is_empty() {
      return Err(AppError::Validation("Card holder name is required".to_string()));
    }
    if !CARD_NUMBER.is_match(&number) {
      return Err(AppError::Validation("Invalid card number".to_string()));
    }
    if !CARD_EXPIRY.is_match(self.expiry.trim()) {
      return Err(AppError::Validation("Expiry must be MM/YY".to_string()));
    }
    if !CARD_CVV.is_match(self.cvv.trim()) {
      return Err(AppError::Validation("Invalid CVV".to_string()));
    }
    Ok(())
  }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckoutForm {
  pub customer: CustomerInfo,
  pub shipping: ShippingAddress,
  pub payment_method: Option<PaymentMethod>,
  pub card: CardDetails,
  pub coupon_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckoutWizard {
  step: CheckoutStep,
  form: CheckoutForm,
}

impl Default for CheckoutWizard {
  fn default() -> Self {
    Self::new()
  }
}

impl CheckoutWizard {
  pub fn new() -> Self {
    Self {
      step: CheckoutStep::CustomerInfo,
      form: CheckoutForm::default(),
    }
  }

  pub fn step(&self) -> CheckoutStep {
    self.step
  }

  pub fn form(&self) -> &CheckoutForm {
    &self.form
  }

  pub fn form_mut(&mut self) -> &mut CheckoutForm {
    &mut self.form
  }

  /// Fills the shipping step from a saved address.
  pub fn use_address(&mut self, address: &Address) {
    self.form.shipping = ShippingAddress::from(address);
  }

  pub fn validate_step(&self, step: CheckoutStep) -> Result<()> {
    match step {
      CheckoutStep::CustomerInfo => {
        let c = &self.form.customer;
        if [&c.name, &c.email, &c.phone].iter().any(|f| f.trim().is_empty()) {
          return Err(AppError::Validation("Please fill in your name, email and phone".to_string()));
        }
        if !is_valid_email(c.email.trim()) {
          return Err(AppError::Validation("Please enter a valid email".to_string()));
        }
        Ok(())
      }
      CheckoutStep::ShippingAddress => {
        let s = &self.form.shipping;
        let fields = [&s.first_name, &s.last_name, &s.phone, &s.street_address, &s.city, &s.state, &s.pincode];
        if fields.iter().any(|f| f.trim().is_empty()) {
          return Err(AppError::Validation("All shipping address fields are required".to_string()));
        }
        if !is_valid_pincode(s.pincode.trim()) {
          return Err(AppError::Validation("Invalid pincode".to_string()));
        }
        Ok(())
      }
      CheckoutStep::Payment => match self.form.payment_method {
        None => Err(AppError::Validation("Please choose a payment method".to_string())),
        Some(PaymentMethod::Card) => self.form.card.validate(),
        Some(_) => Ok(()),
      },
    }
  }

  /// Validates the current step and advances. On the last step this only validates.
  pub fn next(&mut self) -> Result<CheckoutStep> {
    self.validate_step(self.step)?;
    if let Some(next) = self.step.next() {
      self.step = next;
    }
    Ok(self.step)
  }

  pub fn back(&mut self) -> CheckoutStep {
    if let Some(previous) = self.step.previous() {
      self.step = previous;
    }
    self.step
  }

  /// Every step validates; used right before submitting.
  pub fn ensure_complete(&self) -> Result<PaymentMethod> {
    for step in [CheckoutStep::CustomerInfo, CheckoutStep::ShippingAddress, CheckoutStep::Payment] {
      self.validate_step(step)?;
    }
    self
      .form
      .payment_method
      .ok_or_else(|| AppError::Validation("Please choose a payment method".to_string()))
  }

  /// Where a failed submission leaves the user: on the payment step, form intact.
  pub fn return_to_payment(&mut self) {
    self.step = CheckoutStep::Payment;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn filled() -> CheckoutWizard {
    let mut w = CheckoutWizard::new();
    w.form_mut().customer = CustomerInfo {
      name: "Asha Rao".into(),
      email: "asha@example.com".into(),
      phone: "9876543210".into(),
    };
    w.form_mut().shipping = ShippingAddress {
      first_name: "Asha".into(),
      last_name: "Rao".into(),
      phone: "9876543210".into(),
      street_address: "12 MG Road".into(),
      city: "Pune".into(),
      state: "MH".into(),
      pincode: "411001".into(),
      country: "India".into(),
    };
    w
  }

  #[test]
  fn cannot_leave_empty_customer_step() {
    let mut w = CheckoutWizard::new();
    assert!(w.next().is_err());
    assert_eq!(w.step(), CheckoutStep::CustomerInfo);
  }

  #[test]
  fn walks_forward_and_back_keeping_data() {
    let mut w = filled();
    assert_eq!(w.next().unwrap(), CheckoutStep::ShippingAddress);
    assert_eq!(w.next().unwrap(), CheckoutStep::Payment);
    assert_eq!(w.back(), CheckoutStep::ShippingAddress);
    assert_eq!(w.form().shipping.city, "Pune");
    assert_eq!(w.back(), CheckoutStep::CustomerInfo);
    assert_eq!(w.back(), CheckoutStep::CustomerInfo);
  }

  #[test]
  fn bad_pincode_blocks_shipping_step() {
    let mut w = filled();
    w.form_mut().shipping.pincode = "41100".into();
    w.next().unwrap();
    let err = w.next().unwrap_err();
    assert_eq!(err.public_message(), "Invalid pincode");
    assert_eq!(w.step(), CheckoutStep::ShippingAddress);
  }

  #[test]
  fn card_fields_required_only_for_card() {
    let mut w = filled();
    w.form_mut().payment_method = Some(PaymentMethod::Cod);
    assert_eq!(w.ensure_complete().unwrap(), PaymentMethod::Cod);

    w.form_mut().payment_method = Some(PaymentMethod::Card);
    assert!(w.ensure_complete().is_err());
    w.form_mut().card = CardDetails {
      holder: "Asha Rao".into(),
      number: "4111 1111 1111 1111".into(),
      expiry: "12/29".into(),
      cvv: "123".into(),
    };
    assert_eq!(w.ensure_complete().unwrap(), PaymentMethod::Card);
    w.form_mut().card.expiry = "13/29".into();
    assert!(w.ensure_complete().is_err());
  }
}
