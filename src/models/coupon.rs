use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::coupon;
use crate::errors::ServiceError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CouponKind {
    Percentage,
    Fixed,
    FreeShipping,
}

/// `Expired` is never stored; it is derived from `endDate` when read.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CouponStatus {
    Active,
    Disabled,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    #[serde(rename = "_id")]
    pub id: String,
    pub code: String,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    pub value: Decimal,
    pub description: String,
    pub min_order: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_discount: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    pub status: CouponStatus,
    pub created_at: DateTime<Utc>,
}

/// Discount a coupon grants on a given subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponDiscount {
    pub discount: Decimal,
    pub free_shipping: bool,
}

impl Coupon {
    /// Builds the typed view, deriving `expired` from the end date.
    pub fn from_model(model: coupon::Model, now: DateTime<Utc>) -> Result<Self, ServiceError> {
        let kind = model.kind.parse::<CouponKind>().map_err(|_| {
            ServiceError::InternalError(format!("Coupon {} has unknown type {}", model.id, model.kind))
        })?;
        let stored = model.status.parse::<CouponStatus>().map_err(|_| {
            ServiceError::InternalError(format!(
                "Coupon {} has unknown status {}",
                model.id, model.status
            ))
        })?;
        let status = match (stored, model.ends_at) {
            (CouponStatus::Active, Some(end)) if end < now => CouponStatus::Expired,
            (status, _) => status,
        };

        Ok(Self {
            id: model.id,
            code: model.code,
            kind,
            value: model.value,
            description: model.description,
            min_order: model.min_order,
            max_discount: model.max_discount,
            usage_limit: model.usage_limit,
            usage_count: model.usage_count,
            start_date: model.starts_at,
            end_date: model.ends_at,
            status,
            created_at: model.created_at,
        })
    }

    /// Checks whether the coupon can be redeemed for `subtotal` at `now`,
    /// returning the reason when it cannot.
    pub fn check_applicable(&self, subtotal: Decimal, now: DateTime<Utc>) -> Result<(), String> {
        match self.status {
            CouponStatus::Active => {}
            CouponStatus::Disabled => return Err(format!("Coupon {} is disabled", self.code)),
            CouponStatus::Expired => return Err(format!("Coupon {} has expired", self.code)),
        }
        if let Some(start) = self.start_date {
            if now < start {
                return Err(format!("Coupon {} is not active yet", self.code));
            }
        }
        if let Some(end) = self.end_date {
            if now > end {
                return Err(format!("Coupon {} has expired", self.code));
            }
        }
        if let Some(limit) = self.usage_limit {
            if self.usage_count >= limit {
                return Err(format!("Coupon {} has reached its usage limit", self.code));
            }
        }
        if subtotal < self.min_order {
            return Err(format!(
                "Coupon {} requires a minimum order of {}",
                self.code, self.min_order
            ));
        }
        Ok(())
    }

    /// Discount on `subtotal`, capped by `maxDiscount` and by the subtotal itself.
    pub fn discount_for(&self, subtotal: Decimal) -> CouponDiscount {
        let raw = match self.kind {
            CouponKind::Percentage => subtotal * self.value / Decimal::ONE_HUNDRED,
            CouponKind::Fixed => self.value,
            CouponKind::FreeShipping => {
                return CouponDiscount {
                    discount: Decimal::ZERO,
                    free_shipping: true,
                }
            }
        };

        let capped = match self.max_discount {
            Some(max) => raw.min(max),
            None => raw,
        };

        CouponDiscount {
            discount: capped.max(Decimal::ZERO).min(subtotal).round_dp(2),
            free_shipping: false,
        }
    }

    /// Percentage of the usage limit consumed, if the coupon has one
    pub fn usage_ratio(&self) -> Option<Decimal> {
        match self.usage_limit {
            Some(limit) if limit > 0 => Some(
                Decimal::from(self.usage_count) / Decimal::from(limit) * Decimal::ONE_HUNDRED,
            ),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    /// Generated when blank
    #[serde(default)]
    #[validate(length(max = 32, message = "Coupon code is too long"))]
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    #[serde(default)]
    pub value: Decimal,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub min_order: Decimal,
    #[serde(default)]
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Usage limit must be at least 1"))]
    pub usage_limit: Option<i32>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<CouponStatus>,
}

impl CreateCouponRequest {
    pub fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        check_terms(
            self.kind,
            self.value,
            self.min_order,
            self.max_discount,
            self.start_date,
            self.end_date,
        )?;
        check_writable_status(self.status)
    }
}

/// Partial update. `maxDiscount`, `usageLimit`, `startDate` and `endDate`
/// are cleared by an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponRequest {
    #[validate(length(min = 1, max = 32, message = "Coupon code must be 1-32 characters"))]
    pub code: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<CouponKind>,
    pub value: Option<Decimal>,
    pub description: Option<String>,
    pub min_order: Option<Decimal>,
    #[serde(default, deserialize_with = "crate::common::double_option")]
    #[schema(value_type = Option<f64>)]
    pub max_discount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "crate::common::double_option")]
    #[schema(value_type = Option<i32>)]
    pub usage_limit: Option<Option<i32>>,
    #[serde(default, deserialize_with = "crate::common::double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub start_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "crate::common::double_option")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub end_date: Option<Option<DateTime<Utc>>>,
    pub status: Option<CouponStatus>,
}

impl UpdateCouponRequest {
    pub fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        if matches!(self.usage_limit, Some(Some(limit)) if limit < 1) {
            return Err(ServiceError::ValidationError(
                "Usage limit must be at least 1".into(),
            ));
        }
        check_writable_status(self.status)
    }
}

/// Value and window rules shared by create and the merged result of an update.
pub fn check_terms(
    kind: CouponKind,
    value: Decimal,
    min_order: Decimal,
    max_discount: Option<Decimal>,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), ServiceError> {
    if value.is_sign_negative() || min_order.is_sign_negative() {
        return Err(ServiceError::ValidationError(
            "Coupon amounts must not be negative".into(),
        ));
    }
    if matches!(max_discount, Some(max) if max.is_sign_negative()) {
        return Err(ServiceError::ValidationError(
            "maxDiscount must not be negative".into(),
        ));
    }
    if kind == CouponKind::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(ServiceError::ValidationError(
            "Percentage coupons cannot exceed 100".into(),
        ));
    }
    if let (Some(start), Some(end)) = (start, end) {
        if end <= start {
            return Err(ServiceError::ValidationError(
                "endDate must be after startDate".into(),
            ));
        }
    }
    Ok(())
}

fn check_writable_status(status: Option<CouponStatus>) -> Result<(), ServiceError> {
    if status == Some(CouponStatus::Expired) {
        return Err(ServiceError::ValidationError(
            "Coupon status can only be set to active or disabled".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn coupon(kind: CouponKind, value: Decimal) -> Coupon {
        Coupon {
            id: "65a1b2c3d4e5f60718293a4b".into(),
            code: "HONEY20".into(),
            kind,
            value,
            description: String::new(),
            min_order: dec!(50),
            max_discount: Some(dec!(25)),
            usage_limit: Some(100),
            usage_count: 45,
            start_date: None,
            end_date: None,
            status: CouponStatus::Active,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn percentage_discount_is_capped() {
        let c = coupon(CouponKind::Percentage, dec!(20));
        assert_eq!(c.discount_for(dec!(100)).discount, dec!(20));
        assert_eq!(c.discount_for(dec!(1000)).discount, dec!(25));
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        let mut c = coupon(CouponKind::Fixed, dec!(10));
        c.max_discount = None;
        assert_eq!(c.discount_for(dec!(100)).discount, dec!(10));
        assert_eq!(c.discount_for(dec!(6)).discount, dec!(6));
    }

    #[test]
    fn free_shipping_grants_no_discount() {
        let c = coupon(CouponKind::FreeShipping, dec!(0));
        let outcome = c.discount_for(dec!(80));
        assert_eq!(outcome.discount, Decimal::ZERO);
        assert!(outcome.free_shipping);
    }

    #[test]
    fn applicability_rules() {
        let now = Utc::now();
        let mut c = coupon(CouponKind::Percentage, dec!(20));
        assert!(c.check_applicable(dec!(60), now).is_ok());
        assert!(c.check_applicable(dec!(40), now).is_err());

        c.usage_count = 100;
        assert!(c.check_applicable(dec!(60), now).is_err());

        c.usage_count = 0;
        c.start_date = Some(now + Duration::days(1));
        assert!(c.check_applicable(dec!(60), now).is_err());

        c.start_date = None;
        c.status = CouponStatus::Disabled;
        assert!(c.check_applicable(dec!(60), now).is_err());
    }

    #[test]
    fn expired_status_is_derived_from_end_date() {
        let now = Utc::now();
        let model = coupon::Model {
            id: "65a1b2c3d4e5f60718293a4b".into(),
            code: "SUMMER2023".into(),
            kind: "percentage".into(),
            value: dec!(15),
            description: String::new(),
            min_order: dec!(40),
            max_discount: None,
            usage_limit: None,
            usage_count: 0,
            starts_at: None,
            ends_at: Some(now - Duration::days(1)),
            status: "active".into(),
            created_at: now,
        };
        let c = Coupon::from_model(model, now).unwrap();
        assert_eq!(c.status, CouponStatus::Expired);
        assert_eq!(c.kind, CouponKind::Percentage);
    }

    #[test]
    fn terms_validation() {
        assert!(check_terms(CouponKind::Percentage, dec!(120), dec!(0), None, None, None).is_err());
        assert!(check_terms(CouponKind::Fixed, dec!(-1), dec!(0), None, None, None).is_err());
        let now = Utc::now();
        assert!(check_terms(
            CouponKind::Fixed,
            dec!(10),
            dec!(0),
            None,
            Some(now),
            Some(now - Duration::hours(1))
        )
        .is_err());
        assert!(check_terms(CouponKind::Fixed, dec!(10), dec!(30), Some(dec!(10)), None, None).is_ok());
    }

    #[test]
    fn update_distinguishes_null_from_absent() {
        let update: UpdateCouponRequest = serde_json::from_value(serde_json::json!({
            "maxDiscount": null,
            "endDate": null,
            "usageLimit": 10
        }))
        .unwrap();
        assert_eq!(update.max_discount, Some(None));
        assert_eq!(update.end_date, Some(None));
        assert_eq!(update.usage_limit, Some(Some(10)));
        assert_eq!(update.start_date, None);
        assert!(update.check().is_ok());

        let update: UpdateCouponRequest =
            serde_json::from_value(serde_json::json!({ "usageLimit": 0 })).unwrap();
        assert!(update.check().is_err());
    }

    #[test]
    fn usage_ratio_requires_limit() {
        let mut c = coupon(CouponKind::Fixed, dec!(10));
        assert_eq!(c.usage_ratio(), Some(dec!(45)));
        c.usage_limit = None;
        assert_eq!(c.usage_ratio(), None);
    }
}
