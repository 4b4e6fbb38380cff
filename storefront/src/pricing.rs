// storefront/src/pricing.rs

//! Order totals. All amounts are whole units of the base currency.

use crate::errors::{AppError, Result};
use crate::models::{OrderLine, PricingBreakdown};
use serde::Deserialize;

pub const FREE_SHIPPING_ABOVE: i64 = 1000;
pub const SHIPPING_FEE: i64 = 99;
pub const TAX_PERCENT: i64 = 18;

/// Upper bounds on client-supplied figures.
pub const MAX_UNIT_PRICE: i64 = 100_000_000;
pub const MAX_QUANTITY: i64 = 10_000;
pub const MAX_ORDER_AMOUNT: i64 = 1_000_000_000_000;

/// A price as it arrives from a client: a plain integer, a float, or a
/// display string like `"₹1,299"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Price {
  Amount(i64),
  Decimal(f64),
  Display(String),
}

impl Price {
  pub fn amount(&self) -> i64 {
    match self {
      Price::Amount(v) => *v,
      Price::Decimal(v) => v.round() as i64,
      Price::Display(s) => parse_amount(s),
    }
  }
}

impl From<i64> for Price {
  fn from(v: i64) -> Self {
    Price::Amount(v)
  }
}

/// Keeps only the ASCII digits of `raw`. An empty result is 0.
pub fn parse_amount(raw: &str) -> i64 {
  raw
    .chars()
    .filter_map(|c| c.to_digit(10))
    .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(d as i64))
}

/// `amount * percent / 100`, rounded half up. `amount` is expected to be non-negative.
pub fn percent_of(amount: i64, percent: i64) -> i64 {
  let scaled = (i128::from(amount) * i128::from(percent) + 50) / 100;
  i64::try_from(scaled).unwrap_or(if scaled < 0 { i64::MIN } else { i64::MAX })
}

fn too_large() -> AppError {
  AppError::Validation(format!("Order amount cannot exceed {}", MAX_ORDER_AMOUNT))
}

/// Rejects order amounts outside `0..=MAX_ORDER_AMOUNT`.
pub fn check_order_amount(amount: i64) -> Result<i64> {
  if amount < 0 {
    return Err(AppError::Validation("Order amount must not be negative".to_string()));
  }
  if amount > MAX_ORDER_AMOUNT {
    return Err(too_large());
  }
  Ok(amount)
}

pub fn shipping_for(subtotal: i64) -> i64 {
  if subtotal > FREE_SHIPPING_ABOVE {
    0
  } else {
    SHIPPING_FEE
  }
}

pub fn tax_for(subtotal: i64) -> i64 {
  percent_of(subtotal, TAX_PERCENT)
}

pub fn subtotal(lines: &[OrderLine]) -> Result<i64> {
  let total = lines.iter().try_fold(0i64, |acc, line| {
    line
      .product
      .price
      .checked_mul(line.quantity)
      .and_then(|t| acc.checked_add(t))
      .ok_or_else(too_large)
  })?;
  check_order_amount(total)
}

/// Breakdown for a subtotal and an already-validated discount.
pub fn price(subtotal: i64, discount: i64, coupon_code: Option<String>) -> Result<PricingBreakdown> {
  let subtotal = check_order_amount(subtotal)?;
  let shipping = shipping_for(subtotal);
  let tax = tax_for(subtotal);
  let total_amount = subtotal
    .checked_add(shipping)
    .and_then(|t| t.checked_add(tax))
    .and_then(|t| t.checked_sub(discount))
    .ok_or_else(too_large)?;
  Ok(PricingBreakdown {
    subtotal,
    shipping,
    tax,
    discount,
    coupon_code,
    total_amount,
  })
}

pub fn price_lines(lines: &[OrderLine], discount: i64, coupon_code: Option<String>) -> Result<PricingBreakdown> {
  price(subtotal(lines)?, discount, coupon_code)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::ProductSnapshot;
  use proptest::prelude::*;
  use rstest::rstest;

  fn line(price: i64, quantity: i64) -> OrderLine {
    OrderLine {
      product: ProductSnapshot {
        name: format!("item-{price}"),
        price,
        image: String::new(),
        category: "misc".into(),
        rating: None,
      },
      quantity,
    }
  }

  #[rstest]
  #[case("₹1,299", 1299)]
  #[case("1299", 1299)]
  #[case("Rs. 45", 45)]
  #[case("", 0)]
  #[case("free", 0)]
  fn parses_display_prices(#[case] raw: &str, #[case] expected: i64) {
    assert_eq!(parse_amount(raw), expected);
  }

  #[test]
  fn price_accepts_numbers_and_strings() {
    let prices: Vec<Price> = serde_json::from_str(r#"[1299, 499.6, "₹2,000"]"#).unwrap();
    let amounts: Vec<i64> = prices.iter().map(Price::amount).collect();
    assert_eq!(amounts, vec![1299, 500, 2000]);
  }

  #[test]
  fn subtotal_1200_without_coupon() {
    let p = price_lines(&[line(600, 2)], 0, None).unwrap();
    assert_eq!(p.subtotal, 1200);
    assert_eq!(p.shipping, 0);
    assert_eq!(p.tax, 216);
    assert_eq!(p.total_amount, 1416);
  }

  #[test]
  fn subtotal_500_pays_shipping() {
    let p = price_lines(&[line(250, 1), line(125, 2)], 0, None).unwrap();
    assert_eq!((p.subtotal, p.shipping, p.tax, p.total_amount), (500, 99, 90, 689));
  }

  #[test]
  fn save50_on_1200() {
    let p = price(1200, 50, Some("SAVE50".into())).unwrap();
    assert_eq!(p.total_amount, 1366);
    assert_eq!(p.coupon_code.as_deref(), Some("SAVE50"));
  }

  #[test]
  fn exactly_1000_still_pays_shipping() {
    assert_eq!(shipping_for(1000), SHIPPING_FEE);
    assert_eq!(shipping_for(1001), 0);
  }

  #[rstest]
  #[case(line(i64::MAX, 2))]
  #[case(line(MAX_UNIT_PRICE, i64::MAX))]
  #[case(line(parse_amount("99999999999999999999"), 1))]
  fn oversized_lines_are_rejected(#[case] l: OrderLine) {
    assert!(matches!(subtotal(&[l]), Err(AppError::Validation(_))));
  }

  #[test]
  fn many_lines_past_the_cap_are_rejected() {
    assert_eq!(subtotal(&[line(MAX_UNIT_PRICE, MAX_QUANTITY)]).unwrap(), MAX_ORDER_AMOUNT);
    let lines = vec![line(MAX_UNIT_PRICE, MAX_QUANTITY), line(1, 1)];
    assert!(matches!(subtotal(&lines), Err(AppError::Validation(_))));
  }

  #[test]
  fn percent_of_never_overflows() {
    assert_eq!(percent_of(i64::MAX, 100), i64::MAX);
    assert_eq!(percent_of(1_000, 18), 180);
  }

  proptest! {
    #[test]
    fn total_identity_holds(subtotal in 0i64..=1_000_000, discount_ratio in 0i64..=100) {
      let discount = subtotal * discount_ratio / 100;
      let p = price(subtotal, discount, None).unwrap();
      prop_assert_eq!(p.total_amount, p.subtotal + p.shipping + p.tax - p.discount);
      prop_assert_eq!(p.shipping == 0, p.subtotal > FREE_SHIPPING_ABOVE);
    }
  }
}
