use axum::{extract::State, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use super::common::ApiJson;
use crate::{
    errors::ServiceError,
    services::checkout::{Quote, QuoteRequest},
    AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct QuoteEnvelope {
    pub success: bool,
    pub quote: Quote,
}

/// Price a cart
#[utoipa::path(
    post,
    path = "/api/checkout/quote",
    summary = "Checkout quote",
    description = "Subtotal, shipping, coupon discount and total for a cart",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Quote", body = QuoteEnvelope),
        (status = 400, description = "Empty cart or coupon not applicable", body = crate::errors::ErrorResponse),
    ),
    tag = "checkout"
)]
pub async fn quote(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<QuoteRequest>,
) -> Result<Json<QuoteEnvelope>, ServiceError> {
    let quote = state.services.checkout.quote(payload).await?;
    Ok(Json(QuoteEnvelope {
        success: true,
        quote,
    }))
}
