use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::common::{ApiJson, SearchParams, SuccessResponse};
use crate::{
    errors::ServiceError,
    models::{
        coupon::{CreateCouponRequest, UpdateCouponRequest},
        Coupon,
    },
    services::coupons::CouponStats,
    AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponEnvelope {
    pub success: bool,
    pub coupon: Coupon,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponListEnvelope {
    pub success: bool,
    pub coupons: Vec<Coupon>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CouponStatsEnvelope {
    pub success: bool,
    pub stats: CouponStats,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GeneratedCodeResponse {
    pub success: bool,
    pub code: String,
}

#[utoipa::path(
    get,
    path = "/api/coupons",
    summary = "List coupons",
    params(SearchParams),
    responses(
        (status = 200, description = "Coupons, newest first", body = CouponListEnvelope),
    ),
    tag = "coupons"
)]
pub async fn list_coupons(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<CouponListEnvelope>, ServiceError> {
    let coupons = state.services.coupons.list_coupons(params.search).await?;
    Ok(Json(CouponListEnvelope {
        success: true,
        coupons,
    }))
}

#[utoipa::path(
    post,
    path = "/api/coupons",
    summary = "Create coupon",
    description = "A blank code is replaced by a generated one",
    request_body = CreateCouponRequest,
    responses(
        (status = 200, description = "Coupon created", body = CouponEnvelope),
        (status = 400, description = "Invalid coupon or duplicate code", body = crate::errors::ErrorResponse),
    ),
    tag = "coupons"
)]
pub async fn create_coupon(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateCouponRequest>,
) -> Result<Json<CouponEnvelope>, ServiceError> {
    let coupon = state.services.coupons.create_coupon(payload).await?;
    Ok(Json(CouponEnvelope {
        success: true,
        coupon,
    }))
}

#[utoipa::path(
    patch,
    path = "/api/coupons/{id}",
    summary = "Update coupon",
    params(("id" = String, Path, description = "Coupon id")),
    request_body = UpdateCouponRequest,
    responses(
        (status = 200, description = "Coupon updated", body = CouponEnvelope),
        (status = 400, description = "Invalid update", body = crate::errors::ErrorResponse),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse),
    ),
    tag = "coupons"
)]
pub async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateCouponRequest>,
) -> Result<Json<CouponEnvelope>, ServiceError> {
    let coupon = state.services.coupons.update_coupon(&id, payload).await?;
    Ok(Json(CouponEnvelope {
        success: true,
        coupon,
    }))
}

#[utoipa::path(
    delete,
    path = "/api/coupons/{id}",
    summary = "Delete coupon",
    params(("id" = String, Path, description = "Coupon id")),
    responses(
        (status = 200, description = "Coupon deleted", body = SuccessResponse),
        (status = 404, description = "Coupon not found", body = crate::errors::ErrorResponse),
    ),
    tag = "coupons"
)]
pub async fn delete_coupon(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    state.services.coupons.delete_coupon(&id).await?;
    Ok(Json(SuccessResponse::ok()))
}

#[utoipa::path(
    get,
    path = "/api/coupons/stats",
    summary = "Coupon statistics",
    responses(
        (status = 200, description = "Totals and usage", body = CouponStatsEnvelope),
    ),
    tag = "coupons"
)]
pub async fn coupon_stats(
    State(state): State<AppState>,
) -> Result<Json<CouponStatsEnvelope>, ServiceError> {
    let stats = state.services.coupons.stats().await?;
    Ok(Json(CouponStatsEnvelope {
        success: true,
        stats,
    }))
}

#[utoipa::path(
    get,
    path = "/api/coupons/generate-code",
    summary = "Generate coupon code",
    responses(
        (status = 200, description = "Unused 8 character code", body = GeneratedCodeResponse),
    ),
    tag = "coupons"
)]
pub async fn generate_code(
    State(state): State<AppState>,
) -> Result<Json<GeneratedCodeResponse>, ServiceError> {
    let code = state.services.coupons.generate_code().await?;
    Ok(Json(GeneratedCodeResponse {
        success: true,
        code,
    }))
}
