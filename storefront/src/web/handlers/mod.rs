// storefront/src/web/handlers/mod.rs

pub mod address_handlers;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod order_handlers;
