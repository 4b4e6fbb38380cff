// storefront/src/web/routes.rs

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::web::handlers::{address_handlers, auth_handlers, cart_handlers, order_handlers};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(json!({ "success": true, "status": "ok" }))
}

/// Mounts the whole API under `/api`.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup_handler))
          .route("/signin", web::post().to(auth_handlers::signin_handler))
          .route("/admin/signin", web::post().to(auth_handlers::admin_signin_handler))
          .route("/me", web::get().to(auth_handlers::me_handler)),
      )
      // Literal paths go before `/{id}`.
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/create", web::post().to(order_handlers::create_order_handler))
          .route("/verify-payment", web::post().to(order_handlers::verify_payment_handler))
          .route("/complete", web::post().to(order_handlers::complete_order_handler))
          .route("/validate-coupon", web::post().to(order_handlers::validate_coupon_handler))
          .route("/coupons/available", web::get().to(order_handlers::available_coupons_handler))
          .route("/track/{order_number}", web::get().to(order_handlers::track_order_handler))
          .route("/admin/all", web::get().to(order_handlers::admin_list_orders_handler))
          .route("/admin/coupons", web::post().to(order_handlers::admin_create_coupon_handler))
          .route("/admin/{id}/status", web::put().to(order_handlers::admin_update_status_handler))
          .route("/{id}", web::get().to(order_handlers::get_order_handler)),
      )
      .service(
        web::scope("/addresses")
          .route("", web::get().to(address_handlers::list_addresses_handler))
          .route("", web::post().to(address_handlers::create_address_handler))
          .route("/{id}/default", web::put().to(address_handlers::set_default_address_handler))
          .route("/{id}", web::get().to(address_handlers::get_address_handler))
          .route("/{id}", web::put().to(address_handlers::update_address_handler))
          .route("/{id}", web::delete().to(address_handlers::delete_address_handler)),
      )
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::view_cart_handler))
          .route("", web::post().to(cart_handlers::add_to_cart_handler))
          .route("", web::delete().to(cart_handlers::clear_cart_handler))
          .route("/{product_name}", web::put().to(cart_handlers::update_cart_quantity_handler))
          .route("/{product_name}", web::delete().to(cart_handlers::remove_from_cart_handler)),
      )
      .service(
        web::scope("/wishlist")
          .route("", web::get().to(cart_handlers::view_wishlist_handler))
          .route("", web::post().to(cart_handlers::add_to_wishlist_handler))
          .route("/{product_name}", web::delete().to(cart_handlers::remove_from_wishlist_handler)),
      ),
  );
}
