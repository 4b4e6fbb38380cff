// storefront/src/state.rs

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::{AddressBook, AuthService, CouponService, Notifier, OrderService, PaypalGateway, TokenService};
use crate::store::Store;
use bazar_flow::Registry;
use std::sync::Arc;

/// Shared application handles. Cheap to clone; every field is an `Arc`.
#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub store: Arc<dyn Store>,
  pub flows: Arc<Registry<AppError>>,
  pub tokens: Arc<TokenService>,
  pub notifier: Arc<dyn Notifier>,
  /// `None` when PayPal credentials are not configured.
  pub paypal: Option<Arc<PaypalGateway>>,
}

impl AppState {
  /// Wires services and registers every order flow.
  pub fn new(config: AppConfig, store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
    let tokens = Arc::new(TokenService::new(&config.tokens));
    let paypal = config
      .paypal
      .clone()
      .map(|pp| Arc::new(PaypalGateway::new(pp, config.frontend_url.clone())));
    let flows = Arc::new(Registry::<AppError>::new());
    pipelines::register_all(&flows);

    Self {
      config: Arc::new(config),
      store,
      flows,
      tokens,
      notifier,
      paypal,
    }
  }

  pub fn auth(&self) -> AuthService {
    AuthService::new(self.store.clone(), self.tokens.clone())
  }

  pub fn coupons(&self) -> CouponService {
    CouponService::new(self.store.clone())
  }

  pub fn addresses(&self) -> AddressBook {
    AddressBook::new(self.store.clone())
  }

  pub fn orders(&self) -> OrderService {
    OrderService::new(self.clone())
  }
}
