use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::order;
use crate::errors::ServiceError;

/// Order status as stored and exposed on the wire.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
    ToSchema,
)]
pub enum OrderStatus {
    #[serde(rename = "Pending Payment")]
    #[strum(serialize = "Pending Payment")]
    PendingPayment,
    #[serde(rename = "Paid")]
    #[strum(serialize = "Paid")]
    Paid,
    #[serde(rename = "Payment Failed")]
    #[strum(serialize = "Payment Failed")]
    PaymentFailed,
    #[serde(rename = "Processing")]
    #[strum(serialize = "Processing")]
    Processing,
    #[serde(rename = "Shipped")]
    #[strum(serialize = "Shipped")]
    Shipped,
    #[serde(rename = "Delivered")]
    #[strum(serialize = "Delivered")]
    Delivered,
    #[serde(rename = "Cancelled")]
    #[strum(serialize = "Cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// Initial status for a freshly placed order
    pub fn initial_for(method: PaymentMethod) -> Self {
        match method {
            PaymentMethod::Upi => OrderStatus::PendingPayment,
            PaymentMethod::Cod => OrderStatus::Processing,
        }
    }

    /// Statuses whose order total counts as revenue
    pub fn counts_as_revenue(self) -> bool {
        matches!(
            self,
            OrderStatus::Paid | OrderStatus::Processing | OrderStatus::Shipped | OrderStatus::Delivered
        )
    }

    /// Statuses that only payment verification may set
    pub fn is_gateway_outcome(self) -> bool {
        matches!(
            self,
            OrderStatus::PendingPayment | OrderStatus::Paid | OrderStatus::PaymentFailed
        )
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
    ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaymentMethod {
    Cod,
    Upi,
}

/// Contact and delivery details captured at checkout.
///
/// Card fields the storefront form may send are not part of this type and
/// are dropped on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShippingDetails {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Alternate email must be a valid address"))]
    pub alternate_email: Option<String>,
    #[validate(length(min = 1, message = "Phone number is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub pincode: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ShippingDetails {
    /// Trims every field and turns blank optionals into `None`.
    pub fn normalized(self) -> Self {
        use crate::common::normalize_optional_string as opt;
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            alternate_email: opt(self.alternate_email),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            city: self.city.trim().to_string(),
            state: self.state.trim().to_string(),
            pincode: self.pincode.trim().to_string(),
            landmark: opt(self.landmark),
            notes: opt(self.notes),
        }
    }

    /// Distinct non-empty contact addresses, compared case-insensitively.
    pub fn contact_emails(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::with_capacity(2);
        let candidates = std::iter::once(self.email.as_str()).chain(self.alternate_email.as_deref());
        for candidate in candidates {
            let candidate = candidate.trim();
            if candidate.is_empty() {
                continue;
            }
            if !out.iter().any(|seen| seen.eq_ignore_ascii_case(candidate)) {
                out.push(candidate.to_string());
            }
        }
        out
    }
}

/// Snapshot of a cart line at purchase time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct LineItem {
    /// Product reference; the storefront sends numbers or strings
    #[serde(rename = "id", alias = "productId", deserialize_with = "product_ref")]
    pub product_id: String,
    #[validate(length(min = 1, message = "Line item name is required"))]
    pub name: String,
    /// Unit price
    pub price: Decimal,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl LineItem {
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

fn product_ref<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Ref {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Ref::deserialize(deserializer)? {
        Ref::Text(text) => text,
        Ref::Number(number) => number.to_string(),
    })
}

/// Sum of line totals
pub fn subtotal(items: &[LineItem]) -> Decimal {
    items.iter().map(LineItem::line_total).sum()
}

/// Validates a cart: non-empty, every line valid with a non-negative price.
pub fn validate_cart(items: &[LineItem]) -> Result<(), ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::ValidationError("Cart is empty".into()));
    }
    for item in items {
        item.validate()?;
        if item.price.is_sign_negative() {
            return Err(ServiceError::ValidationError(format!(
                "Price for {} must not be negative",
                item.name
            )));
        }
    }
    Ok(())
}

/// Typed view of a persisted order. The OTP never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub record_id: String,
    /// Custom reference supplied by the client at creation
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub form_data: ShippingDetails,
    pub cart_items: Vec<LineItem>,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub razorpay_order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub razorpay_payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coupon_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Whether an administrator may move this order to `next`.
    ///
    /// Gateway outcomes are never admin targets. A UPI order that holds no
    /// captured payment can only be cancelled.
    pub fn admin_can_move_to(&self, next: OrderStatus) -> bool {
        if next.is_gateway_outcome() {
            return false;
        }
        let unpaid_upi =
            self.payment_method == PaymentMethod::Upi && self.razorpay_payment_id.is_none();
        !unpaid_upi || next == OrderStatus::Cancelled
    }
}

impl TryFrom<order::Model> for Order {
    type Error = ServiceError;

    fn try_from(model: order::Model) -> Result<Self, Self::Error> {
        let status = model.status.parse::<OrderStatus>().map_err(|_| {
            ServiceError::InternalError(format!(
                "Order {} has unknown status {}",
                model.id, model.status
            ))
        })?;
        let payment_method = model.payment_method.parse::<PaymentMethod>().map_err(|_| {
            ServiceError::InternalError(format!(
                "Order {} has unknown payment method {}",
                model.id, model.payment_method
            ))
        })?;

        Ok(Self {
            record_id: model.id,
            reference: model.reference,
            form_data: serde_json::from_value(model.shipping)?,
            cart_items: serde_json::from_value(model.items)?,
            total: model.total,
            payment_method,
            status,
            razorpay_order_id: model.razorpay_order_id,
            razorpay_payment_id: model.razorpay_payment_id,
            coupon_code: model.coupon_code,
            created_at: model.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use std::str::FromStr;

    fn details(email: &str, alternate: Option<&str>) -> ShippingDetails {
        ShippingDetails {
            first_name: "Asha".into(),
            last_name: "Rao".into(),
            email: email.into(),
            alternate_email: alternate.map(str::to_string),
            phone: "9876543210".into(),
            address: "12 Hive Lane".into(),
            city: "Pune".into(),
            state: "MH".into(),
            pincode: "411001".into(),
            landmark: None,
            notes: None,
        }
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(OrderStatus::PendingPayment.to_string(), "Pending Payment");
        assert_eq!(
            OrderStatus::from_str("Payment Failed").unwrap(),
            OrderStatus::PaymentFailed
        );
        assert!(OrderStatus::from_str("Teleported").is_err());
        assert_eq!(
            serde_json::to_value(OrderStatus::Paid).unwrap(),
            json!("Paid")
        );
    }

    #[test]
    fn initial_status_follows_payment_method() {
        assert_eq!(
            OrderStatus::initial_for(PaymentMethod::Cod),
            OrderStatus::Processing
        );
        assert_eq!(
            OrderStatus::initial_for(PaymentMethod::Upi),
            OrderStatus::PendingPayment
        );
    }

    fn placed(method: PaymentMethod, status: OrderStatus, payment_id: Option<&str>) -> Order {
        Order {
            record_id: "65a1b2c3d4e5f60718293a4b".into(),
            reference: None,
            form_data: details("asha@example.com", None),
            cart_items: Vec::new(),
            total: dec!(750),
            payment_method: method,
            status,
            razorpay_order_id: (method == PaymentMethod::Upi).then(|| "order_1".to_string()),
            razorpay_payment_id: payment_id.map(str::to_string),
            coupon_code: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn admin_transitions() {
        use OrderStatus::*;
        let cod = placed(PaymentMethod::Cod, Processing, None);
        assert!(cod.admin_can_move_to(Shipped));
        assert!(cod.admin_can_move_to(Cancelled));
        assert!(!cod.admin_can_move_to(Paid));
        assert!(!cod.admin_can_move_to(PendingPayment));

        let pending = placed(PaymentMethod::Upi, PendingPayment, None);
        assert!(pending.admin_can_move_to(Cancelled));
        assert!(!pending.admin_can_move_to(Paid));
        assert!(!pending.admin_can_move_to(Processing));
    }

    #[test]
    fn paid_orders_keep_their_payment_outcome() {
        use OrderStatus::*;
        let paid = placed(PaymentMethod::Upi, Paid, Some("pay_1"));
        assert!(!paid.admin_can_move_to(PaymentFailed));
        assert!(!paid.admin_can_move_to(PendingPayment));
        assert!(paid.admin_can_move_to(Processing));
        assert!(paid.admin_can_move_to(Delivered));

        let failed = placed(PaymentMethod::Upi, PaymentFailed, None);
        assert!(!failed.admin_can_move_to(Paid));
        assert!(!failed.admin_can_move_to(Processing));
        assert!(!failed.admin_can_move_to(Shipped));
        assert!(failed.admin_can_move_to(Cancelled));
    }

    #[test]
    fn contact_emails_are_deduplicated_case_insensitively() {
        let d = details("asha@example.com", Some("ASHA@example.com"));
        assert_eq!(d.contact_emails(), vec!["asha@example.com".to_string()]);

        let d = details("asha@example.com", Some("rao@example.com"));
        assert_eq!(d.contact_emails().len(), 2);

        let d = details("asha@example.com", None);
        assert_eq!(d.contact_emails().len(), 1);
    }

    #[test]
    fn blank_alternate_email_is_dropped_before_validation() {
        let d = details("asha@example.com", Some("   ")).normalized();
        assert_eq!(d.alternate_email, None);
        assert!(d.validate().is_ok());

        let d = details("not-an-email", None).normalized();
        assert!(d.validate().is_err());
    }

    #[test]
    fn line_items_accept_numeric_ids() {
        let item: LineItem = serde_json::from_value(json!({
            "id": 1,
            "name": "500ml Raw Honey",
            "price": 350,
            "quantity": 2,
            "image": "/honey.png"
        }))
        .unwrap();
        assert_eq!(item.product_id, "1");
        assert_eq!(item.line_total(), dec!(700));

        let item: LineItem = serde_json::from_value(json!({
            "productId": "sku-9",
            "name": "Wax",
            "price": 40.5,
            "quantity": 1
        }))
        .unwrap();
        assert_eq!(item.product_id, "sku-9");
    }

    #[test]
    fn cart_validation() {
        assert!(validate_cart(&[]).is_err());

        let mut item = LineItem {
            product_id: "1".into(),
            name: "Honey".into(),
            price: dec!(10),
            quantity: 0,
            image: None,
        };
        assert!(validate_cart(std::slice::from_ref(&item)).is_err());

        item.quantity = 1;
        item.price = dec!(-1);
        assert!(validate_cart(std::slice::from_ref(&item)).is_err());

        item.price = dec!(10);
        assert!(validate_cart(&[item]).is_ok());
    }

    #[test]
    fn converts_from_row() {
        let row = order::Model {
            id: "65a1b2c3d4e5f60718293a4b".into(),
            reference: Some("HP-1".into()),
            shipping: serde_json::to_value(details("a@example.com", None)).unwrap(),
            items: json!([{ "id": "1", "name": "Honey", "price": 350, "quantity": 1 }]),
            total: dec!(400),
            payment_method: "upi".into(),
            status: "Pending Payment".into(),
            otp: "123456".into(),
            razorpay_order_id: Some("order_1".into()),
            razorpay_payment_id: None,
            coupon_code: None,
            created_at: Utc::now(),
        };
        let order = Order::try_from(row).unwrap();
        assert_eq!(order.status, OrderStatus::PendingPayment);
        assert_eq!(order.payment_method, PaymentMethod::Upi);

        let body = serde_json::to_value(&order).unwrap();
        assert_eq!(body["_id"], "65a1b2c3d4e5f60718293a4b");
        assert_eq!(body["id"], "HP-1");
        assert!(body.get("otp").is_none());
        assert!(body.get("razorpayPaymentId").is_none());
    }
}
