// tests/http_tests.rs
mod common;

use actix_web::http::{header, StatusCode};
use actix_web::{test, web as actix_data, App};
use intellibazar::models::Role;
use intellibazar::web;
use serde_json::{json, Value};

macro_rules! service {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(actix_data::Data::new($state.clone()))
        .app_data(web::json_config())
        .app_data(web::query_config())
        .app_data(web::path_config())
        .configure(web::configure_app_routes),
    )
    .await
  };
}

fn bearer(token: &str) -> (header::HeaderName, String) {
  (header::AUTHORIZATION, format!("Bearer {}", token))
}

fn order_body(method: &str) -> Value {
  json!({
    "customerInfo": { "name": "Asha Rao", "email": "asha@example.com", "phone": "9876543210" },
    "shippingAddress": {
      "firstName": "Asha", "lastName": "Rao", "phone": "9876543210",
      "streetAddress": "12 MG Road", "city": "Pune", "state": "MH", "pincode": "411001"
    },
    "products": [{ "name": "Lamp", "price": "₹600", "quantity": 2 }],
    "paymentMethod": method,
    "pricing": { "totalAmount": 1 }
  })
}

#[actix_web::test]
async fn health_is_public() {
  let app = common::app(false);
  let svc = service!(app.state);

  let resp = test::call_service(&svc, test::TestRequest::get().uri("/api/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["success"], true);
}

#[actix_web::test]
async fn order_endpoints_require_a_token_and_admin_ones_a_role() {
  let app = common::app(false);
  let user = common::signup(&app.state, "Asha", "asha@example.com").await;
  let svc = service!(app.state);

  let resp = test::call_service(&svc, test::TestRequest::get().uri("/api/orders").to_request()).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["success"], false);

  let req = test::TestRequest::get()
    .uri("/api/orders/admin/all")
    .insert_header(bearer(&user.token.token))
    .to_request();
  let resp = test::call_service(&svc, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let req = test::TestRequest::get()
    .uri("/api/orders")
    .insert_header(bearer("not-a-token"))
    .to_request();
  assert_eq!(test::call_service(&svc, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn create_then_track_publicly_and_update_as_admin() {
  let app = common::app(false);
  let user = common::signup(&app.state, "Asha", "asha@example.com").await;
  let admin = app
    .state
    .auth()
    .ensure_admin("Admin", "admin@intellibazar.in", "admin-password")
    .await
    .unwrap();
  let admin_token = app.state.tokens.issue(admin.id, Role::Admin).unwrap();
  let svc = service!(app.state);

  let req = test::TestRequest::post()
    .uri("/api/orders/create")
    .insert_header(bearer(&user.token.token))
    .set_json(order_body("cod"))
    .to_request();
  let resp = test::call_service(&svc, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let created: Value = test::read_body_json(resp).await;
  // Client-side pricing is ignored.
  assert_eq!(created["totalAmount"], 1416);
  let order_id = created["orderId"].as_str().unwrap().to_string();
  let order_number = created["orderNumber"].as_str().unwrap().to_string();

  let req = test::TestRequest::post()
    .uri("/api/orders/complete")
    .insert_header(bearer(&user.token.token))
    .set_json(json!({ "orderId": order_id }))
    .to_request();
  let resp = test::call_service(&svc, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let completed: Value = test::read_body_json(resp).await;
  assert_eq!(completed["order"]["status"], "confirmed");

  let req = test::TestRequest::put()
    .uri(&format!("/api/orders/admin/{}/status", order_id))
    .insert_header(bearer(&admin_token.token))
    .set_json(json!({ "status": "shipped", "carrier": "BlueDart", "trackingNumber": "BD42" }))
    .to_request();
  let resp = test::call_service(&svc, req).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let req = test::TestRequest::get()
    .uri(&format!("/api/orders/track/{}", order_number.to_lowercase()))
    .to_request();
  let resp = test::call_service(&svc, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let tracked: Value = test::read_body_json(resp).await;
  assert_eq!(tracked["tracking"]["status"], "shipped");
  assert_eq!(tracked["tracking"]["orderNumber"], order_number);

  let req = test::TestRequest::get()
    .uri("/api/orders?page=1&limit=5")
    .insert_header(bearer(&user.token.token))
    .to_request();
  let listed: Value = test::read_body_json(test::call_service(&svc, req).await).await;
  assert_eq!(listed["pagination"]["total"], 1);
  assert_eq!(listed["pagination"]["limit"], 5);
}

#[actix_web::test]
async fn bad_input_answers_with_the_error_envelope() {
  let app = common::app(false);
  let user = common::signup(&app.state, "Asha", "asha@example.com").await;
  let svc = service!(app.state);

  let req = test::TestRequest::post()
    .uri("/api/orders/create")
    .insert_header(bearer(&user.token.token))
    .insert_header((header::CONTENT_TYPE, "application/json"))
    .set_payload("{ not json")
    .to_request();
  let resp = test::call_service(&svc, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["success"], false);

  let req = test::TestRequest::get()
    .uri("/api/orders/not-a-uuid")
    .insert_header(bearer(&user.token.token))
    .to_request();
  assert_eq!(test::call_service(&svc, req).await.status(), StatusCode::NOT_FOUND);

  let req = test::TestRequest::post()
    .uri("/api/orders/create")
    .insert_header(bearer(&user.token.token))
    .set_json(order_body("paypal"))
    .to_request();
  let resp = test::call_service(&svc, req).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["message"], "PayPal is not configured. Please use Cash on Delivery.");

  let req = test::TestRequest::post()
    .uri("/api/orders/validate-coupon")
    .insert_header(bearer(&user.token.token))
    .set_json(json!({ "code": "NOPE", "orderAmount": 1200 }))
    .to_request();
  assert_eq!(test::call_service(&svc, req).await.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn address_book_over_http() {
  let app = common::app(false);
  let user = common::signup(&app.state, "Asha", "asha@example.com").await;
  let svc = service!(app.state);

  let req = test::TestRequest::post()
    .uri("/api/addresses")
    .insert_header(bearer(&user.token.token))
    .set_json(json!({
      "label": "Home", "firstName": "Asha", "lastName": "Rao", "phone": "9876543210",
      "streetAddress": "12 MG Road", "city": "Pune", "state": "MH", "pincode": "411001"
    }))
    .to_request();
  let resp = test::call_service(&svc, req).await;
  assert!(resp.status().is_success());

  let req = test::TestRequest::post()
    .uri("/api/addresses")
    .insert_header(bearer(&user.token.token))
    .set_json(json!({
      "label": "Office", "firstName": "Asha", "lastName": "Rao", "phone": "9876543210",
      "streetAddress": "1 Tech Park", "city": "Pune", "state": "MH", "pincode": "4110"
    }))
    .to_request();
  assert_eq!(test::call_service(&svc, req).await.status(), StatusCode::BAD_REQUEST);

  let req = test::TestRequest::get()
    .uri("/api/addresses")
    .insert_header(bearer(&user.token.token))
    .to_request();
  let body: Value = test::read_body_json(test::call_service(&svc, req).await).await;
  assert_eq!(body["addresses"].as_array().map(Vec::len), Some(1));
  assert_eq!(body["addresses"][0]["isDefault"], true);
}

#[actix_web::test]
async fn oversized_amounts_answer_400_not_a_crash() {
  let app = common::app(false);
  let user = common::signup(&app.state, "Asha", "asha@example.com").await;
  let svc = service!(app.state);

  let mut body = order_body("cod");
  body["products"][0]["price"] = json!("99999999999999999999");
  let req = test::TestRequest::post()
    .uri("/api/orders/create")
    .insert_header(bearer(&user.token.token))
    .set_json(body)
    .to_request();
  let resp = test::call_service(&svc, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["success"], false);

  let mut body = order_body("cod");
  body["products"][0]["quantity"] = json!(i64::MAX);
  let req = test::TestRequest::post()
    .uri("/api/orders/create")
    .insert_header(bearer(&user.token.token))
    .set_json(body)
    .to_request();
  assert_eq!(test::call_service(&svc, req).await.status(), StatusCode::BAD_REQUEST);

  let req = test::TestRequest::post()
    .uri("/api/orders/validate-coupon")
    .insert_header(bearer(&user.token.token))
    .set_json(json!({ "code": "SAVE50", "orderAmount": i64::MAX }))
    .to_request();
  assert_eq!(test::call_service(&svc, req).await.status(), StatusCode::BAD_REQUEST);
}
