// Typed domain records validated at the service boundary
pub mod coupon;
pub mod order;
pub mod product;

pub use coupon::{Coupon, CouponKind, CouponStatus};
pub use order::{LineItem, Order, OrderStatus, PaymentMethod, ShippingDetails};
pub use product::Product;
