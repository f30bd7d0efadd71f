use std::sync::Arc;

use chrono::Utc;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::{new_record_id, normalize_optional_string, normalize_record_id},
    db::DbPool,
    entities::order::{self, Entity as OrderEntity},
    errors::{ServiceError, ServiceResult},
    models::order::{
        subtotal, validate_cart, LineItem, Order, OrderStatus, PaymentMethod, ShippingDetails,
    },
    notifications::{generate_otp, OtpNotifier},
    payments::{receipt_label, CreatePaymentOrder, PaymentGateway, PaymentOrder},
    services::coupons::CouponService,
};

const ORDER_NOT_FOUND: &str = "Order not found";
const ORDER_NOT_UPDATED: &str = "Order not found or not updated";

/// Order placement body sent by the checkout page
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub form_data: ShippingDetails,
    pub payment_method: PaymentMethod,
    pub cart_items: Vec<LineItem>,
    /// Client computed total, shipping included
    pub total: Decimal,
    /// Buy-now checkouts skip the cart on the client; not persisted
    #[serde(default)]
    pub is_buy_now: bool,
    /// Optional custom reference, usable for lookups
    #[serde(default)]
    pub id: Option<String>,
    /// Coupon applied at checkout; counted against its usage limit
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Gateway callback forwarded by the storefront.
///
/// Fields are optional so that an absent field is reported as a validation
/// failure instead of a body parse error. Empty strings count as present.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    #[serde(rename = "razorpay_order_id")]
    pub razorpay_order_id: Option<String>,
    #[serde(rename = "razorpay_payment_id")]
    pub razorpay_payment_id: Option<String>,
    #[serde(rename = "razorpay_signature")]
    pub razorpay_signature: Option<String>,
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderStatusRequest {
    pub order_id: Option<String>,
    pub status: Option<String>,
}

/// Result of a successful placement
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub otp: String,
    /// Remote order for UPI checkouts
    pub payment: Option<PaymentOrder>,
    pub key_id: Option<String>,
}

/// Places orders, confirms gateway payments and applies admin status changes.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: OtpNotifier,
    coupons: CouponService,
    currency: String,
}

impl OrderService {
    pub fn new(
        db: Arc<DbPool>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: OtpNotifier,
        coupons: CouponService,
        currency: String,
    ) -> Self {
        Self {
            db,
            gateway,
            notifier,
            coupons,
            currency,
        }
    }

    /// Places an order.
    ///
    /// The OTP mail and the remote payment order come first; the row is
    /// written only once both succeeded, so a failure leaves nothing behind.
    /// A coupon is checked before anything is sent and its use is recorded in
    /// the same transaction as the row.
    #[instrument(skip(self, request), fields(payment_method = %request.payment_method, items = request.cart_items.len()))]
    pub async fn create_order(&self, request: CreateOrderRequest) -> ServiceResult<PlacedOrder> {
        let form = request.form_data.normalized();
        form.validate()?;
        validate_cart(&request.cart_items)?;

        if request.total.is_sign_negative() {
            return Err(ServiceError::ValidationError("Total must not be negative".into()));
        }
        if request.payment_method == PaymentMethod::Upi && request.total.is_zero() {
            return Err(ServiceError::ValidationError(
                "UPI payments require a positive total".into(),
            ));
        }

        let now = Utc::now();
        let record_id = new_record_id();
        let status = OrderStatus::initial_for(request.payment_method);

        let coupon = match normalize_optional_string(request.coupon_code) {
            Some(code) => {
                let (coupon, _) = self
                    .coupons
                    .evaluate(&code, subtotal(&request.cart_items), now)
                    .await?;
                Some(coupon)
            }
            None => None,
        };

        let otp = generate_otp();
        self.notifier.dispatch(&otp, &form.contact_emails()).await?;

        let (payment, key_id) = match request.payment_method {
            PaymentMethod::Upi => {
                let remote = CreatePaymentOrder::new(
                    request.total,
                    self.currency.clone(),
                    receipt_label(now),
                )?;
                let payment = self.gateway.create_order(remote).await.map_err(|e| {
                    error!(error = %e, order_id = %record_id, "Failed to create remote payment order");
                    e
                })?;
                (Some(payment), Some(self.gateway.key_id()))
            }
            PaymentMethod::Cod => (None, None),
        };

        let order = Order {
            record_id: record_id.clone(),
            reference: normalize_optional_string(request.id),
            form_data: form,
            cart_items: request.cart_items,
            total: request.total,
            payment_method: request.payment_method,
            status,
            razorpay_order_id: payment.as_ref().map(|p| p.id.clone()),
            razorpay_payment_id: None,
            coupon_code: coupon.as_ref().map(|c| c.code.clone()),
            created_at: now,
        };

        let row = order::ActiveModel {
            id: Set(order.record_id.clone()),
            reference: Set(order.reference.clone()),
            shipping: Set(serde_json::to_value(&order.form_data)?),
            items: Set(serde_json::to_value(&order.cart_items)?),
            total: Set(order.total),
            payment_method: Set(order.payment_method.to_string()),
            status: Set(order.status.to_string()),
            otp: Set(otp.clone()),
            razorpay_order_id: Set(order.razorpay_order_id.clone()),
            razorpay_payment_id: Set(None),
            coupon_code: Set(order.coupon_code.clone()),
            created_at: Set(order.created_at),
        };

        let txn = self.db.begin().await?;
        if let Some(coupon) = &coupon {
            self.coupons.redeem(&txn, coupon).await?;
        }
        row.insert(&txn).await.map_err(|e| {
            error!(error = %e, order_id = %record_id, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;
        txn.commit().await?;

        counter!(
            "honeypalace_orders_created_total",
            1,
            "payment_method" => order.payment_method.to_string()
        );
        info!(order_id = %record_id, status = %order.status, "Order placed");

        Ok(PlacedOrder {
            order,
            otp,
            payment,
            key_id,
        })
    }

    /// Confirms or fails a pending UPI payment from the checkout callback.
    #[instrument(skip(self, request), fields(order_id = ?request.order_id))]
    pub async fn verify_payment(&self, request: VerifyPaymentRequest) -> ServiceResult<Order> {
        let (Some(remote_order_id), Some(payment_id), Some(signature), Some(order_id)) = (
            request.razorpay_order_id,
            request.razorpay_payment_id,
            request.razorpay_signature,
            request.order_id.filter(|id| !id.trim().is_empty()),
        ) else {
            return Err(ServiceError::ValidationError("Missing required fields".into()));
        };

        let record_id = normalize_record_id(order_id.trim())
            .ok_or_else(|| ServiceError::NotFound(ORDER_NOT_FOUND.into()))?;
        let model = OrderEntity::find_by_id(record_id.clone())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ORDER_NOT_FOUND.into()))?;
        let mut order = Order::try_from(model)?;

        if order.status != OrderStatus::PendingPayment {
            warn!(status = %order.status, "Verification for an order that is not awaiting payment");
            return Err(ServiceError::InvalidOperation(format!(
                "Order is not awaiting payment (status: {})",
                order.status
            )));
        }

        let same_remote_order = order.razorpay_order_id.as_deref() == Some(remote_order_id.as_str());
        let verified = same_remote_order
            && self
                .gateway
                .verify_signature(&remote_order_id, &payment_id, &signature)?;

        if verified {
            self.settle(&record_id, OrderStatus::Paid, Some(payment_id.clone()))
                .await?;
            counter!("honeypalace_payments_verified_total", 1);
            info!(order_id = %record_id, "Payment verified");
            order.status = OrderStatus::Paid;
            order.razorpay_payment_id = Some(payment_id);
            Ok(order)
        } else {
            self.settle(&record_id, OrderStatus::PaymentFailed, None).await?;
            counter!("honeypalace_payments_failed_total", 1);
            warn!(
                order_id = %record_id,
                cancelled = payment_id.is_empty(),
                same_remote_order,
                "Payment verification failed"
            );
            Err(ServiceError::SignatureMismatch)
        }
    }

    /// Writes the verification outcome, only while the order still awaits payment.
    async fn settle(
        &self,
        record_id: &str,
        status: OrderStatus,
        payment_id: Option<String>,
    ) -> ServiceResult<()> {
        let mut update = OrderEntity::update_many()
            .col_expr(order::Column::Status, Expr::value(status.to_string()));
        if let Some(payment_id) = payment_id {
            update = update.col_expr(order::Column::RazorpayPaymentId, Expr::value(payment_id));
        }

        let result = update
            .filter(order::Column::Id.eq(record_id))
            .filter(order::Column::Status.eq(OrderStatus::PendingPayment.to_string()))
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %record_id, "Failed to record payment outcome");
                ServiceError::DatabaseError(e)
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::InvalidOperation(
                "Order is no longer awaiting payment".into(),
            ));
        }
        Ok(())
    }

    /// Administrative status change.
    #[instrument(skip(self, request), fields(order_id = ?request.order_id, status = ?request.status))]
    pub async fn update_status(&self, request: UpdateOrderStatusRequest) -> ServiceResult<Order> {
        let (Some(order_id), Some(raw_status)) = (
            normalize_optional_string(request.order_id),
            normalize_optional_string(request.status),
        ) else {
            return Err(ServiceError::ValidationError("Missing orderId or status".into()));
        };

        let next = raw_status
            .parse::<OrderStatus>()
            .map_err(|_| ServiceError::ValidationError(format!("Unknown order status: {raw_status}")))?;
        if next == OrderStatus::PendingPayment {
            return Err(ServiceError::ValidationError(
                "Orders cannot be moved back to Pending Payment".into(),
            ));
        }

        let record_id = normalize_record_id(&order_id)
            .ok_or_else(|| ServiceError::NotFound(ORDER_NOT_UPDATED.into()))?;
        let model = OrderEntity::find_by_id(record_id.clone())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(ORDER_NOT_UPDATED.into()))?;
        let mut order = Order::try_from(model)?;

        if order.status == next {
            return Err(ServiceError::NotFound(ORDER_NOT_UPDATED.into()));
        }
        if !order.admin_can_move_to(next) {
            return Err(ServiceError::InvalidOperation(format!(
                "Cannot change order status from {} to {}",
                order.status, next
            )));
        }

        let result = OrderEntity::update_many()
            .col_expr(order::Column::Status, Expr::value(next.to_string()))
            .filter(order::Column::Id.eq(record_id.as_str()))
            .filter(order::Column::Status.eq(order.status.to_string()))
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, order_id = %record_id, "Failed to update order status");
                ServiceError::DatabaseError(e)
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(ORDER_NOT_UPDATED.into()));
        }

        info!(order_id = %record_id, from = %order.status, to = %next, "Order status updated");
        order.status = next;
        Ok(order)
    }

    /// Looks an order up by record id, falling back to the custom reference.
    #[instrument(skip(self))]
    pub async fn find_order(&self, id: &str) -> ServiceResult<Order> {
        let id = id.trim();
        let mut model = None;

        if let Some(record_id) = normalize_record_id(id) {
            model = OrderEntity::find_by_id(record_id).one(&*self.db).await?;
        }
        if model.is_none() && !id.is_empty() {
            model = OrderEntity::find()
                .filter(order::Column::Reference.eq(id))
                .order_by_desc(order::Column::CreatedAt)
                .one(&*self.db)
                .await?;
        }

        model
            .ok_or_else(|| ServiceError::NotFound(ORDER_NOT_FOUND.into()))
            .and_then(Order::try_from)
    }

    /// All orders, newest first
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> ServiceResult<Vec<Order>> {
        let rows = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list orders");
                ServiceError::DatabaseError(e)
            })?;

        rows.into_iter().map(Order::try_from).collect()
    }
}
