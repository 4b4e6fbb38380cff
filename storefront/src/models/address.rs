// storefront/src/models/address.rs

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type as SqlxType};
use thiserror::Error;
use uuid::Uuid;

static PINCODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{6}$").expect("static pincode pattern"));

pub const DEFAULT_COUNTRY: &str = "India";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, SqlxType)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "address_kind_enum", rename_all = "lowercase")]
pub enum AddressKind {
  #[default]
  Home,
  Office,
  Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
  #[error("All fields are required")]
  MissingFields,
  #[error("Invalid pincode. Pincode must be 6 digits")]
  InvalidPincode,
}

/// A saved address. At most one address per user has `is_default` set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub id: Uuid,
  pub user_id: Uuid,
  pub label: String,
  pub first_name: String,
  pub last_name: String,
  pub phone: String,
  pub street_address: String,
  pub city: String,
  pub state: String,
  pub pincode: String,
  pub country: String,
  #[serde(rename = "type")]
  pub kind: AddressKind,
  pub is_default: bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Address fields as submitted by a client, before trimming and validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressDraft {
  pub label: String,
  pub first_name: String,
  pub last_name: String,
  pub phone: String,
  pub street_address: String,
  pub city: String,
  pub state: String,
  pub pincode: String,
  pub country: Option<String>,
  #[serde(rename = "type")]
  pub kind: Option<AddressKind>,
  pub is_default: Option<bool>,
}

/// Trimmed, validated address fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressFields {
  pub label: String,
  pub first_name: String,
  pub last_name: String,
  pub phone: String,
  pub street_address: String,
  pub city: String,
  pub state: String,
  pub pincode: String,
  pub country: String,
  pub kind: AddressKind,
}

pub fn is_valid_pincode(pincode: &str) -> bool {
  PINCODE.is_match(pincode)
}

impl AddressDraft {
  /// Trims every field and rejects the whole draft if any required field
  /// is blank or the pincode is not six ASCII digits.
  pub fn validate(&self) -> Result<AddressFields, AddressError> {
    let required = [
      &self.label,
      &self.first_name,
      &self.last_name,
      &self.phone,
      &self.street_address,
      &self.city,
      &self.state,
      &self.pincode,
    ];
    if required.iter().any(|f| f.trim().is_empty()) {
      return Err(AddressError::MissingFields);
    }
    let pincode = self.pincode.trim().to_string();
    if !is_valid_pincode(&pincode) {
      return Err(AddressError::InvalidPincode);
    }
    let country = self
      .country
      .as_deref()
      .map(str::trim)
      .filter(|c| !c.is_empty())
      .unwrap_or(DEFAULT_COUNTRY)
      .to_string();

    Ok(AddressFields {
      label: self.label.trim().to_string(),
      first_name: self.first_name.trim().to_string(),
      last_name: self.last_name.trim().to_string(),
      phone: self.phone.trim().to_string(),
      street_address: self.street_address.trim().to_string(),
      city: self.city.trim().to_string(),
      state: self.state.trim().to_string(),
      pincode,
      country,
      kind: self.kind.unwrap_or_default(),
    })
  }
}

impl Address {
  pub fn new(user_id: Uuid, fields: AddressFields, is_default: bool) -> Self {
    let now = Utc::now();
    let mut address = Self {
      id: Uuid::new_v4(),
      user_id,
      label: String::new(),
      first_name: String::new(),
      last_name: String::new(),
      phone: String::new(),
      street_address: String::new(),
      city: String::new(),
      state: String::new(),
      pincode: String::new(),
      country: String::new(),
      kind: AddressKind::Home,
      is_default,
      created_at: now,
      updated_at: now,
    };
    address.apply(fields);
    address
  }

  pub fn apply(&mut self, fields: AddressFields) {
    self.label = fields.label;
    self.first_name = fields.first_name;
    self.last_name = fields.last_name;
    self.phone = fields.phone;
    self.street_address = fields.street_address;
    self.city = fields.city;
    self.state = fields.state;
    self.pincode = fields.pincode;
    self.country = fields.country;
    self.kind = fields.kind;
    self.updated_at = Utc::now();
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn draft() -> AddressDraft {
    AddressDraft {
      label: " Home ".into(),
      first_name: "Asha".into(),
      last_name: "Rao".into(),
      phone: "9876543210".into(),
      street_address: "12 MG Road".into(),
      city: "Bengaluru".into(),
      state: "Karnataka".into(),
      pincode: " 560001 ".into(),
      ..Default::default()
    }
  }

  #[test]
  fn validate_trims_and_defaults_country() {
    let fields = draft().validate().unwrap();
    assert_eq!(fields.label, "Home");
    assert_eq!(fields.pincode, "560001");
    assert_eq!(fields.country, "India");
    assert_eq!(fields.kind, AddressKind::Home);
  }

  #[test]
  fn blank_field_rejects_whole_draft() {
    let mut d = draft();
    d.city = "   ".into();
    assert_eq!(d.validate(), Err(AddressError::MissingFields));
  }

  #[test]
  fn pincode_must_be_six_ascii_digits() {
    for bad in ["56001", "5600011", "56000a", "५६०००१"] {
      let mut d = draft();
      d.pincode = bad.into();
      assert_eq!(d.validate(), Err(AddressError::InvalidPincode), "{bad}");
    }
  }
}
