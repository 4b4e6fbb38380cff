// storefront/src/lib.rs

//! IntelliBazar storefront backend: order placement and settlement, coupons,
//! address book, cart and wishlist, plus the client-side checkout
//! orchestrator that drives them.

pub mod checkout;
pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod pricing;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

pub use crate::errors::{AppError, Result};
pub use crate::state::AppState;
