//! Payment gateway seam.
//!
//! The order service only needs two things from a gateway: create a remote
//! order for an amount, and check the signature handed back by the checkout
//! widget. [`RazorpayGateway`] talks to the Razorpay REST API; tests plug in
//! their own implementation.

pub mod razorpay;
pub mod signature;

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

pub use razorpay::RazorpayGateway;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
    #[error("gateway is not configured: {0}")]
    NotConfigured(String),
    #[error("amount {0} cannot be charged")]
    InvalidAmount(Decimal),
    #[error("invalid signing key")]
    InvalidKey,
}

/// Body of a remote order creation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatePaymentOrder {
    /// Amount in minor units (paise)
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    /// 1 = capture immediately
    pub payment_capture: u8,
}

impl CreatePaymentOrder {
    pub fn new(total: Decimal, currency: impl Into<String>, receipt: impl Into<String>) -> Result<Self, PaymentError> {
        Ok(Self {
            amount: to_minor_units(total)?,
            currency: currency.into(),
            receipt: receipt.into(),
            payment_capture: 1,
        })
    }
}

/// Remote order as returned by the gateway and forwarded to the storefront
/// so it can open the payment widget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentOrder {
    pub id: String,
    #[serde(default)]
    pub entity: String,
    pub amount: i64,
    #[serde(default)]
    pub amount_paid: i64,
    #[serde(default)]
    pub amount_due: i64,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub attempts: i64,
    #[serde(default)]
    pub created_at: i64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key id handed to the checkout widget
    fn key_id(&self) -> String;

    async fn create_order(&self, request: CreatePaymentOrder) -> Result<PaymentOrder, PaymentError>;

    /// Pure check of a checkout callback signature; never touches the network.
    fn verify_signature(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<bool, PaymentError>;
}

/// Converts a rupee amount to paise, rounding half away from zero.
pub fn to_minor_units(total: Decimal) -> Result<i64, PaymentError> {
    if total.is_sign_negative() {
        return Err(PaymentError::InvalidAmount(total));
    }
    (total * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or(PaymentError::InvalidAmount(total))
}

/// Receipt label for a remote order, unique per millisecond
pub fn receipt_label(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("receipt_{}", now.timestamp_millis())
}
