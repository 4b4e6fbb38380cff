// storefront/src/pipelines/create_order_pipeline.rs
use crate::errors::{AppError, Result};
use crate::models::address::is_valid_pincode;
use crate::models::order::generate_order_number;
use crate::models::{
  CustomerInfo, Order, OrderLine, OrderStatus, Payment, PaymentMethod, ProductSnapshot, ShippingAddress, Tracking,
};
use crate::pipelines::common_steps;
use crate::pipelines::contexts::CreateOrderCtx;
use crate::pipelines::factories;
use crate::pricing;
use crate::services::auth_service::is_valid_email;
use crate::services::orders::CreateOrderRequest;
use crate::store::StoreError;
use bazar_flow::{Control, Flow, FlowData, Registry, StageDef};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Attempts at finding a free order number before giving up.
pub const ORDER_NUMBER_ATTEMPTS: u32 = 5;

const DEFAULT_COUNTRY: &str = "India";

fn required(value: &str) -> bool {
  !value.trim().is_empty()
}

fn validate_customer(info: Option<&CustomerInfo>) -> Result<CustomerInfo> {
  let info = info.ok_or_else(|| AppError::Validation("Customer information is required".to_string()))?;
  if ![&info.name, &info.email, &info.phone].iter().all(|f| required(f)) {
    return Err(AppError::Validation("Customer name, email and phone are required".to_string()));
  }
  if !is_valid_email(info.email.trim()) {
    return Err(AppError::Validation("Invalid customer email".to_string()));
  }
  Ok(CustomerInfo {
    name: info.name.trim().to_string(),
    email: info.email.trim().to_lowercase(),
    phone: info.phone.trim().to_string(),
  })
}

fn validate_shipping(address: Option<&ShippingAddress>) -> Result<ShippingAddress> {
  let a = address.ok_or_else(|| AppError::Validation("Shipping address is required".to_string()))?;
  let fields = [
    &a.first_name,
    &a.last_name,
    &a.phone,
    &a.street_address,
    &a.city,
    &a.state,
    &a.pincode,
  ];
  if !fields.iter().all(|f| required(f)) {
    return Err(AppError::Validation("All shipping address fields are required".to_string()));
  }
  if !is_valid_pincode(a.pincode.trim()) {
    return Err(AppError::Validation("Invalid pincode".to_string()));
  }
  let country = if required(&a.country) { a.country.trim() } else { DEFAULT_COUNTRY };
  Ok(ShippingAddress {
    first_name: a.first_name.trim().to_string(),
    last_name: a.last_name.trim().to_string(),
    phone: a.phone.trim().to_string(),
    street_address: a.street_address.trim().to_string(),
    city: a.city.trim().to_string(),
    state: a.state.trim().to_string(),
    pincode: a.pincode.trim().to_string(),
    country: country.to_string(),
  })
}

fn validate_lines(request: &CreateOrderRequest) -> Result<Vec<OrderLine>> {
  if request.products.is_empty() {
    return Err(AppError::Validation("Order must contain at least one product".to_string()));
  }
  request
    .products
    .iter()
    .map(|input| {
      let name = input.name.trim();
      if name.is_empty() {
        return Err(AppError::Validation("Every product needs a name".to_string()));
      }
      if !(1..=pricing::MAX_QUANTITY).contains(&input.quantity) {
        return Err(AppError::Validation(format!(
          "Quantity for '{}' must be between 1 and {}",
          name,
          pricing::MAX_QUANTITY
        )));
      }
      let price = input.price.amount();
      if !(1..=pricing::MAX_UNIT_PRICE).contains(&price) {
        return Err(AppError::Validation(format!("Invalid price for '{}'", name)));
      }
      Ok(OrderLine {
        product: ProductSnapshot {
          name: name.to_string(),
          price,
          image: input.image.clone(),
          category: input.category.clone(),
          rating: input.rating,
        },
        quantity: input.quantity,
      })
    })
    .collect()
}

fn parse_method(raw: &str) -> Result<PaymentMethod> {
  if raw.trim().is_empty() {
    return Err(AppError::Validation("Payment method is required".to_string()));
  }
  raw.parse::<PaymentMethod>().map_err(AppError::Validation)
}

pub fn register_create_order_pipeline(registry: &Registry<AppError>) {
  let mut flow = Flow::<CreateOrderCtx, AppError>::new(vec![
    StageDef::required("validate_order_request"),
    StageDef::required("price_order"),
    StageDef::required("assign_order_identity"),
    StageDef::required("route_payment"),
    StageDef::required("persist_order"),
  ]);

  flow.on("validate_order_request", |data: FlowData<CreateOrderCtx>| async move {
    let mut guard = data.write();
    let method = parse_method(&guard.request.payment_method)?;
    validate_customer(guard.request.customer_info.as_ref())?;
    validate_shipping(guard.request.shipping_address.as_ref())?;
    let lines = validate_lines(&guard.request)?;
    debug!(user_id = %guard.user_id, lines = lines.len(), %method, "Order request validated.");
    guard.payment_method = Some(method);
    guard.lines = lines;
    Ok::<_, AppError>(Control::Continue)
  });

  // Coupons are re-checked here; a code that no longer applies is dropped
  // and the order goes through at full price.
  flow.on("price_order", |data: FlowData<CreateOrderCtx>| async move {
    let (state, user_id, code, subtotal) = {
      let guard = data.read();
      let code = guard
        .request
        .coupon_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
      (guard.state.clone(), guard.user_id, code, pricing::subtotal(&guard.lines)?)
    };

    let quote = match &code {
      Some(code) => state.coupons().try_apply(code, subtotal, user_id).await?,
      None => None,
    };
    let breakdown = match quote {
      Some(q) => pricing::price(subtotal, q.discount, Some(q.code))?,
      None => pricing::price(subtotal, 0, None)?,
    };
    debug!(subtotal, discount = breakdown.discount, total = breakdown.total_amount, "Order priced.");
    data.write().pricing = Some(breakdown);
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("assign_order_identity", |data: FlowData<CreateOrderCtx>| async move {
    let mut guard = data.write();
    let method = guard.payment_method.ok_or_else(common_steps::order_not_loaded)?;
    let pricing = guard.pricing.clone().ok_or_else(common_steps::order_not_loaded)?;
    let customer_info = validate_customer(guard.request.customer_info.as_ref())?;
    let shipping_address = validate_shipping(guard.request.shipping_address.as_ref())?;
    let now = Utc::now();

    let mut order = Order {
      id: Uuid::new_v4(),
      user_id: guard.user_id,
      customer_info,
      shipping_address,
      products: std::mem::take(&mut guard.lines),
      pricing,
      payment: Payment::pending(method),
      status: OrderStatus::Pending,
      tracking: Tracking {
        order_number: generate_order_number(),
        ..Default::default()
      },
      status_history: Vec::new(),
      created_at: now,
      updated_at: now,
    };
    order.set_status(OrderStatus::Pending, now, Some("Order placed".to_string()));
    guard.order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  flow
    .branch("route_payment")
    .route(Arc::new(factories::paypal_draft_flow()), |data: FlowData<CreateOrderCtx>| {
      let guard = data.read();
      let order = guard.order.as_ref().ok_or_else(common_steps::order_not_loaded_for_route)?;
      {
        let mut leg = guard.paypal.write();
        leg.order_number = order.order_number().to_string();
        leg.total_amount = order.pricing.total_amount;
      }
      Ok(guard.paypal.clone())
    })
    .when(|ctx: &CreateOrderCtx| ctx.payment_method == Some(PaymentMethod::Paypal))
    .otherwise(Control::Continue)
    .seal(false);

  flow.after("route_payment", |data: FlowData<CreateOrderCtx>| async move {
    let mut guard = data.write();
    let drafted = guard.paypal.read().draft.as_ref().map(|d| d.gateway_order_id.clone());
    if let (Some(id), Some(order)) = (drafted, guard.order.as_mut()) {
      order.payment.gateway_order_id = Some(id);
    }
    Ok::<_, AppError>(Control::Continue)
  });

  flow.on("persist_order", |data: FlowData<CreateOrderCtx>| async move {
    let (state, mut order) = {
      let guard = data.read();
      let order = guard.order.clone().ok_or_else(common_steps::order_not_loaded)?;
      (guard.state.clone(), order)
    };

    let mut attempt = 1;
    loop {
      match state.store.insert_order(&order).await {
        Ok(()) => break,
        Err(StoreError::Conflict(_)) if attempt < ORDER_NUMBER_ATTEMPTS => {
          attempt += 1;
          let fresh = generate_order_number();
          warn!(taken = %order.order_number(), %fresh, attempt, "Order number already taken; retrying.");
          order.tracking.order_number = fresh;
          if order.payment.method == PaymentMethod::Paypal {
            let gateway = data.with(|ctx| ctx.paypal.with(|leg| leg.gateway.clone()));
            if let Some(gateway) = gateway {
              let draft = gateway.draft_order(order.order_number(), order.pricing.total_amount)?;
              order.payment.gateway_order_id = Some(draft.gateway_order_id.clone());
              data.with(|ctx| ctx.paypal.update(|leg| leg.draft = Some(draft)));
            }
          }
        }
        Err(e) => return Err(AppError::from(e)),
      }
    }

    info!(order_id = %order.id, order_number = %order.order_number(), method = %order.payment.method, "Order stored.");
    data.write().order = Some(order);
    Ok::<_, AppError>(Control::Continue)
  });

  registry.register(flow);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::orders::OrderLineInput;

  fn request() -> CreateOrderRequest {
    serde_json::from_value(serde_json::json!({
      "customerInfo": { "name": "Asha", "email": "Asha@Example.com", "phone": "9876543210" },
      "shippingAddress": {
        "firstName": "Asha", "lastName": "Rao", "phone": "9876543210",
        "streetAddress": "12 MG Road", "city": "Pune", "state": "MH", "pincode": "411001"
      },
      "products": [{ "name": "Lamp", "price": "₹600", "quantity": 2 }],
      "paymentMethod": "cod"
    }))
    .unwrap()
  }

  #[test]
  fn valid_request_yields_lines_and_defaults() {
    let req = request();
    let lines = validate_lines(&req).unwrap();
    assert_eq!(lines[0].line_total(), 1200);
    let shipping = validate_shipping(req.shipping_address.as_ref()).unwrap();
    assert_eq!(shipping.country, "India");
    let customer = validate_customer(req.customer_info.as_ref()).unwrap();
    assert_eq!(customer.email, "asha@example.com");
    assert_eq!(parse_method(&req.payment_method).unwrap(), PaymentMethod::Cod);
  }

  #[test]
  fn rejects_empty_products_and_bad_pincode() {
    let mut req = request();
    req.products.clear();
    assert!(matches!(validate_lines(&req), Err(AppError::Validation(_))));

    let mut req = request();
    if let Some(a) = req.shipping_address.as_mut() {
      a.pincode = "4110".into();
    }
    let err = validate_shipping(req.shipping_address.as_ref()).unwrap_err();
    assert_eq!(err.public_message(), "Invalid pincode");
  }

  #[test]
  fn rejects_zero_quantity_and_unknown_method() {
    let mut req = request();
    req.products = vec![OrderLineInput {
      name: "Lamp".into(),
      price: 600.into(),
      image: String::new(),
      category: String::new(),
      rating: None,
      quantity: 0,
    }];
    assert!(validate_lines(&req).is_err());
    assert!(parse_method("bitcoin").is_err());
    assert!(parse_method("  ").is_err());
  }
}
