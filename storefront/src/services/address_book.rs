// storefront/src/services/address_book.rs

//! Saved addresses with the single-default rule: whenever a user has any
//! addresses, exactly one of them is the default.

use crate::errors::{AppError, Result};
use crate::models::{Address, AddressDraft};
use crate::store::{AddressRemoval, Store};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct AddressBook {
  store: Arc<dyn Store>,
}

impl AddressBook {
  pub fn new(store: Arc<dyn Store>) -> Self {
    Self { store }
  }

  pub async fn list(&self, user_id: Uuid) -> Result<Vec<Address>> {
    Ok(self.store.addresses_for(user_id).await?)
  }

  pub async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Address> {
    self
      .store
      .address(user_id, id)
      .await?
      .ok_or_else(|| AppError::NotFound("Address not found".to_string()))
  }

  /// The first address of a user, or one created with `isDefault`, becomes the default.
  #[instrument(name = "AddressBook::create", skip(self, draft), err(Display))]
  pub async fn create(&self, user_id: Uuid, draft: AddressDraft) -> Result<Address> {
    let fields = draft.validate()?;
    let address = Address::new(user_id, fields, draft.is_default == Some(true));
    let address = self.store.insert_address(&address).await?;
    info!(address_id = %address.id, is_default = address.is_default, "Address created.");
    Ok(address)
  }

  /// Replaces the address fields. `isDefault: true` promotes it; clearing
  /// the flag on the current default is ignored so the user keeps one.
  #[instrument(name = "AddressBook::update", skip(self, draft), err(Display))]
  pub async fn update(&self, user_id: Uuid, id: Uuid, draft: AddressDraft) -> Result<Address> {
    let fields = draft.validate()?;
    let mut address = self.get(user_id, id).await?;
    address.apply(fields);
    if draft.is_default == Some(true) {
      address.is_default = true;
    }
    self.store.save_address(&address).await?;
    Ok(address)
  }

  #[instrument(name = "AddressBook::set_default", skip(self), err(Display))]
  pub async fn set_default(&self, user_id: Uuid, id: Uuid) -> Result<Address> {
    let mut address = self.get(user_id, id).await?;
    if !address.is_default {
      address.is_default = true;
      address.updated_at = chrono::Utc::now();
      self.store.save_address(&address).await?;
    }
    Ok(address)
  }

  #[instrument(name = "AddressBook::delete", skip(self), err(Display))]
  pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<AddressRemoval> {
    let removal = self.store.delete_address(user_id, id).await.map_err(|e| match e {
      crate::store::StoreError::NotFound(_) => AppError::NotFound("Address not found".to_string()),
      other => other.into(),
    })?;
    if let Some(promoted) = removal.promoted {
      info!(%promoted, "Default address reassigned after delete.");
    }
    Ok(removal)
  }

  /// The address checkout should preselect.
  pub async fn default_address(&self, user_id: Uuid) -> Result<Option<Address>> {
    Ok(self.store.addresses_for(user_id).await?.into_iter().find(|a| a.is_default))
  }
}
