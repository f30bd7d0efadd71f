use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use rust_decimal::{prelude::ToPrimitive, Decimal};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use crate::{
    common::{new_record_id, normalize_optional_string, normalize_record_id},
    db::DbPool,
    entities::coupon::{self, Entity as CouponEntity},
    errors::{ServiceError, ServiceResult},
    models::coupon::{
        check_terms, Coupon, CouponDiscount, CouponStatus, CreateCouponRequest,
        UpdateCouponRequest,
    },
};

const COUPON_NOT_FOUND: &str = "Coupon not found";
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 8;
const CODE_ATTEMPTS: usize = 5;

/// Aggregate figures for the coupons screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CouponStats {
    pub total: u64,
    pub active: u64,
    pub total_usage: i64,
    /// Mean share of the usage limit consumed, in percent, over coupons with a limit
    pub avg_usage: i64,
}

/// Random 8 character `[A-Z0-9]` code
pub fn random_code() -> String {
    let mut rng = rand::thread_rng();
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

#[derive(Clone)]
pub struct CouponService {
    db: Arc<DbPool>,
}

impl CouponService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Newest first, optionally filtered on code or description
    #[instrument(skip(self))]
    pub async fn list_coupons(&self, search: Option<String>) -> ServiceResult<Vec<Coupon>> {
        let mut query = CouponEntity::find();
        if let Some(term) = normalize_optional_string(search) {
            query = query.filter(
                Condition::any()
                    .add(coupon::Column::Code.contains(term.to_uppercase()))
                    .add(coupon::Column::Description.contains(term)),
            );
        }

        let rows = query
            .order_by_desc(coupon::Column::CreatedAt)
            .order_by_desc(coupon::Column::Id)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list coupons");
                ServiceError::DatabaseError(e)
            })?;

        let now = Utc::now();
        rows.into_iter().map(|m| Coupon::from_model(m, now)).collect()
    }

    #[instrument(skip(self, request), fields(code = ?request.code))]
    pub async fn create_coupon(&self, request: CreateCouponRequest) -> ServiceResult<Coupon> {
        request.check()?;

        let code = match normalize_optional_string(request.code.clone()) {
            Some(code) => {
                let code = code.to_uppercase();
                self.ensure_code_free(&code, None).await?;
                code
            }
            None => self.generate_code().await?,
        };

        let now = Utc::now();
        let row = coupon::ActiveModel {
            id: Set(new_record_id()),
            code: Set(code.clone()),
            kind: Set(request.kind.to_string()),
            value: Set(request.value),
            description: Set(request.description.trim().to_string()),
            min_order: Set(request.min_order),
            max_discount: Set(request.max_discount),
            usage_limit: Set(request.usage_limit),
            usage_count: Set(0),
            starts_at: Set(request.start_date),
            ends_at: Set(request.end_date),
            status: Set(request.status.unwrap_or(CouponStatus::Active).to_string()),
            created_at: Set(now),
        };

        let model = row.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, code = %code, "Failed to insert coupon");
            ServiceError::DatabaseError(e)
        })?;

        info!(coupon_id = %model.id, code = %code, "Coupon created");
        Coupon::from_model(model, now)
    }

    #[instrument(skip(self, request))]
    pub async fn update_coupon(
        &self,
        id: &str,
        request: UpdateCouponRequest,
    ) -> ServiceResult<Coupon> {
        request.check()?;
        let model = self.find_model(id).await?;
        let current = Coupon::from_model(model.clone(), Utc::now())?;

        check_terms(
            request.kind.unwrap_or(current.kind),
            request.value.unwrap_or(current.value),
            request.min_order.unwrap_or(current.min_order),
            request.max_discount.unwrap_or(current.max_discount),
            request.start_date.unwrap_or(current.start_date),
            request.end_date.unwrap_or(current.end_date),
        )?;

        let mut active = model.into_active_model();
        if let Some(code) = normalize_optional_string(request.code) {
            let code = code.to_uppercase();
            if code != current.code {
                self.ensure_code_free(&code, Some(&current.id)).await?;
                active.code = Set(code);
            }
        }
        if let Some(kind) = request.kind {
            active.kind = Set(kind.to_string());
        }
        if let Some(value) = request.value {
            active.value = Set(value);
        }
        if let Some(description) = request.description {
            active.description = Set(description.trim().to_string());
        }
        if let Some(min_order) = request.min_order {
            active.min_order = Set(min_order);
        }
        if let Some(max_discount) = request.max_discount {
            active.max_discount = Set(max_discount);
        }
        if let Some(usage_limit) = request.usage_limit {
            active.usage_limit = Set(usage_limit);
        }
        if let Some(start_date) = request.start_date {
            active.starts_at = Set(start_date);
        }
        if let Some(end_date) = request.end_date {
            active.ends_at = Set(end_date);
        }
        if let Some(status) = request.status {
            active.status = Set(status.to_string());
        }

        if !active.is_changed() {
            return Ok(current);
        }

        let updated = active.update(&*self.db).await.map_err(|e| {
            error!(error = %e, coupon_id = %current.id, "Failed to update coupon");
            ServiceError::DatabaseError(e)
        })?;

        info!(coupon_id = %updated.id, "Coupon updated");
        Coupon::from_model(updated, Utc::now())
    }

    #[instrument(skip(self))]
    pub async fn delete_coupon(&self, id: &str) -> ServiceResult<()> {
        let record_id =
            normalize_record_id(id).ok_or_else(|| ServiceError::NotFound(COUPON_NOT_FOUND.into()))?;

        let result = CouponEntity::delete_by_id(record_id.clone())
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, coupon_id = %record_id, "Failed to delete coupon");
                ServiceError::DatabaseError(e)
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(COUPON_NOT_FOUND.into()));
        }
        info!(coupon_id = %record_id, "Coupon deleted");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> ServiceResult<CouponStats> {
        let coupons = self.list_coupons(None).await?;

        let active = coupons
            .iter()
            .filter(|c| c.status == CouponStatus::Active)
            .count() as u64;
        let total_usage = coupons.iter().map(|c| i64::from(c.usage_count)).sum();

        let ratios: Vec<Decimal> = coupons.iter().filter_map(Coupon::usage_ratio).collect();
        let avg_usage = if ratios.is_empty() {
            0
        } else {
            let mean = ratios.iter().copied().sum::<Decimal>() / Decimal::from(ratios.len());
            mean.round().to_i64().unwrap_or_default()
        };

        Ok(CouponStats {
            total: coupons.len() as u64,
            active,
            total_usage,
            avg_usage,
        })
    }

    /// A random code not used by any stored coupon
    #[instrument(skip(self))]
    pub async fn generate_code(&self) -> ServiceResult<String> {
        for _ in 0..CODE_ATTEMPTS {
            let code = random_code();
            let taken = CouponEntity::find()
                .filter(coupon::Column::Code.eq(code.as_str()))
                .one(&*self.db)
                .await?
                .is_some();
            if !taken {
                return Ok(code);
            }
            debug!(code = %code, "Generated coupon code already in use");
        }
        Err(ServiceError::InternalError(
            "Could not generate a unique coupon code".into(),
        ))
    }

    /// Resolves `code` and works out its discount on `subtotal`.
    /// Unknown or inapplicable codes are validation failures.
    #[instrument(skip(self))]
    pub async fn evaluate(
        &self,
        code: &str,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> ServiceResult<(Coupon, CouponDiscount)> {
        let code = code.trim().to_uppercase();
        let model = CouponEntity::find()
            .filter(coupon::Column::Code.eq(code.as_str()))
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::ValidationError(format!("Invalid coupon code {code}")))?;

        let coupon = Coupon::from_model(model, now)?;
        coupon.check_applicable(subtotal, now).map_err(|reason| {
            warn!(code = %coupon.code, %reason, "Coupon rejected");
            ServiceError::ValidationError(reason)
        })?;

        let discount = coupon.discount_for(subtotal);
        Ok((coupon, discount))
    }

    /// Counts one use of `coupon` on `conn`, refusing once the usage limit is
    /// reached. The check and the increment are a single statement.
    #[instrument(skip(self, conn, coupon), fields(code = %coupon.code))]
    pub async fn redeem<C: ConnectionTrait>(&self, conn: &C, coupon: &Coupon) -> ServiceResult<()> {
        let result = CouponEntity::update_many()
            .col_expr(
                coupon::Column::UsageCount,
                Expr::col(coupon::Column::UsageCount).add(1),
            )
            .filter(coupon::Column::Id.eq(coupon.id.as_str()))
            .filter(
                Condition::any()
                    .add(coupon::Column::UsageLimit.is_null())
                    .add(Expr::col(coupon::Column::UsageCount).lt(Expr::col(coupon::Column::UsageLimit))),
            )
            .exec(conn)
            .await
            .map_err(|e| {
                error!(error = %e, coupon_id = %coupon.id, "Failed to record coupon use");
                ServiceError::DatabaseError(e)
            })?;

        if result.rows_affected == 0 {
            warn!(coupon_id = %coupon.id, "Coupon usage limit reached");
            return Err(ServiceError::ValidationError(format!(
                "Coupon {} has reached its usage limit",
                coupon.code
            )));
        }
        debug!(coupon_id = %coupon.id, "Coupon use recorded");
        Ok(())
    }

    async fn ensure_code_free(&self, code: &str, except_id: Option<&str>) -> ServiceResult<()> {
        let existing = CouponEntity::find()
            .filter(coupon::Column::Code.eq(code))
            .one(&*self.db)
            .await?;
        match existing {
            Some(found) if Some(found.id.as_str()) != except_id => Err(
                ServiceError::ValidationError(format!("Coupon code {code} already exists")),
            ),
            _ => Ok(()),
        }
    }

    async fn find_model(&self, id: &str) -> ServiceResult<coupon::Model> {
        let record_id =
            normalize_record_id(id).ok_or_else(|| ServiceError::NotFound(COUPON_NOT_FOUND.into()))?;
        CouponEntity::find_by_id(record_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(COUPON_NOT_FOUND.into()))
    }
}
