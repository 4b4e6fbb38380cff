// storefront/src/models/mod.rs

//! Domain records shared by the stores, services and HTTP layer.

pub mod address;
pub mod cart_item;
pub mod coupon;
pub mod order;
pub mod product;
pub mod user;
pub mod wishlist_item;

pub use address::{Address, AddressDraft, AddressError, AddressKind};
pub use cart_item::CartItem;
pub use coupon::{Coupon, CouponRejection, CouponUsage, DiscountType};
pub use order::{
  CustomerInfo, Order, OrderLine, OrderStatus, Payment, PaymentMethod, PaymentStatus, PricingBreakdown,
  ShippingAddress, StatusChange, TimelineEntry, Tracking,
};
pub use product::{ProductInput, ProductSnapshot};
pub use user::{Role, User};
pub use wishlist_item::WishlistItem;
