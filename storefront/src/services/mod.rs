// storefront/src/services/mod.rs

pub mod address_book;
pub mod auth_service;
pub mod coupons;
pub mod notifier;
pub mod orders;
pub mod paypal;
pub mod seed;
pub mod tokens;

pub use address_book::AddressBook;
pub use auth_service::AuthService;
pub use coupons::CouponService;
pub use notifier::{MailLogNotifier, Notifier};
pub use orders::OrderService;
pub use paypal::PaypalGateway;
pub use tokens::{Principal, TokenService};
