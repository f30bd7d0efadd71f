use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use utoipa::ToSchema;

use crate::{
    config::CheckoutConfig,
    errors::ServiceResult,
    models::order::{subtotal, validate_cart, LineItem},
    services::coupons::CouponService,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    pub cart_items: Vec<LineItem>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

/// Price breakdown shown on the checkout page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub subtotal: Decimal,
    pub shipping: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    /// Normalized code of the coupon that was applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_applied: Option<String>,
}

/// Shipping fee for a subtotal before coupons
pub fn shipping_for(config: &CheckoutConfig, subtotal: Decimal) -> Decimal {
    if subtotal > config.free_shipping_threshold {
        Decimal::ZERO
    } else {
        config.shipping_fee
    }
}

#[derive(Clone)]
pub struct CheckoutService {
    config: CheckoutConfig,
    coupons: CouponService,
}

impl CheckoutService {
    pub fn new(config: CheckoutConfig, coupons: CouponService) -> Self {
        Self { config, coupons }
    }

    #[instrument(skip(self, request), fields(items = request.cart_items.len(), coupon = ?request.coupon_code))]
    pub async fn quote(&self, request: QuoteRequest) -> ServiceResult<Quote> {
        validate_cart(&request.cart_items)?;

        let subtotal = subtotal(&request.cart_items);
        let mut shipping = shipping_for(&self.config, subtotal);
        let mut discount = Decimal::ZERO;
        let mut coupon_applied = None;

        if let Some(code) = request.coupon_code.filter(|c| !c.trim().is_empty()) {
            let (coupon, granted) = self.coupons.evaluate(&code, subtotal, Utc::now()).await?;
            discount = granted.discount;
            if granted.free_shipping {
                shipping = Decimal::ZERO;
            }
            coupon_applied = Some(coupon.code);
        }

        let total = subtotal - discount + shipping;
        debug!(%subtotal, %shipping, %discount, %total, "Quote computed");

        Ok(Quote {
            subtotal,
            shipping,
            discount,
            total,
            coupon_applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ServiceError;
    use crate::models::coupon::CreateCouponRequest;
    use crate::services::test_support::memory_db;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use serde_json::json;

    async fn service() -> CheckoutService {
        CheckoutService::new(
            CheckoutConfig::default(),
            CouponService::new(memory_db().await),
        )
    }

    fn cart(price: u32, quantity: u32) -> Vec<LineItem> {
        serde_json::from_value(json!([
            { "id": "p1", "name": "Raw Honey", "price": price, "quantity": quantity }
        ]))
        .unwrap()
    }

    #[test]
    fn free_shipping_strictly_above_threshold() {
        let cfg = CheckoutConfig::default();
        assert_eq!(shipping_for(&cfg, dec!(500)), dec!(50));
        assert_eq!(shipping_for(&cfg, dec!(500.01)), Decimal::ZERO);
        assert_eq!(shipping_for(&cfg, dec!(120)), dec!(50));
    }

    #[tokio::test]
    async fn quote_without_coupon() {
        let quote = service()
            .await
            .quote(QuoteRequest {
                cart_items: cart(200, 2),
                coupon_code: None,
            })
            .await
            .unwrap();
        assert_eq!(quote.subtotal, dec!(400));
        assert_eq!(quote.shipping, dec!(50));
        assert_eq!(quote.total, dec!(450));
        assert_eq!(quote.coupon_applied, None);
    }

    #[tokio::test]
    async fn quote_with_coupons() {
        let svc = service().await;
        for body in [
            json!({ "code": "FLAT100", "type": "fixed", "value": 100 }),
            json!({ "code": "SHIPFREE", "type": "free_shipping" }),
        ] {
            let req: CreateCouponRequest = serde_json::from_value(body).unwrap();
            svc.coupons.create_coupon(req).await.unwrap();
        }

        let flat = svc
            .quote(QuoteRequest {
                cart_items: cart(350, 2),
                coupon_code: Some("flat100".into()),
            })
            .await
            .unwrap();
        assert_eq!(flat.discount, dec!(100));
        assert_eq!(flat.shipping, Decimal::ZERO);
        assert_eq!(flat.total, dec!(600));
        assert_eq!(flat.coupon_applied.as_deref(), Some("FLAT100"));

        let ship = svc
            .quote(QuoteRequest {
                cart_items: cart(100, 1),
                coupon_code: Some("SHIPFREE".into()),
            })
            .await
            .unwrap();
        assert_eq!(ship.shipping, Decimal::ZERO);
        assert_eq!(ship.total, dec!(100));
    }

    #[tokio::test]
    async fn unknown_coupon_and_empty_cart_are_rejected() {
        let svc = service().await;
        assert_matches!(
            svc.quote(QuoteRequest {
                cart_items: cart(100, 1),
                coupon_code: Some("NOPE".into()),
            })
            .await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            svc.quote(QuoteRequest {
                cart_items: Vec::new(),
                coupon_code: None,
            })
            .await,
            Err(ServiceError::ValidationError(_))
        );
    }
}
