use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};

use super::common::{ApiJson, SuccessResponse};
use crate::{
    errors::ServiceError,
    models::Order,
    payments::PaymentOrder,
    services::orders::{CreateOrderRequest, UpdateOrderStatusRequest, VerifyPaymentRequest},
    AppState,
};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub success: bool,
    pub inserted_id: String,
    /// Remote order the client opens the payment widget with (UPI only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razorpay_order: Option<PaymentOrder>,
    /// Public gateway key (UPI only)
    #[serde(rename = "key_id", skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,
    /// Echoed only when the deployment enables it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderEnvelope {
    pub success: bool,
    pub order: Order,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderListEnvelope {
    pub success: bool,
    pub orders: Vec<Order>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderLookupParams {
    /// Record id or the custom reference given at creation
    pub id: Option<String>,
}

/// Place an order
#[utoipa::path(
    post,
    path = "/api/orders",
    summary = "Place order",
    description = "Validates the checkout, mails the OTP, creates the remote payment order for UPI and stores the order",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order placed", body = CreateOrderResponse),
        (status = 400, description = "Invalid order", body = crate::errors::ErrorResponse),
        (status = 500, description = "Mail, gateway or database failure", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, ServiceError> {
    let placed = state.services.orders.create_order(payload).await?;
    let otp = state.config.expose_otp_in_response.then_some(placed.otp);

    Ok(Json(CreateOrderResponse {
        success: true,
        inserted_id: placed.order.record_id,
        razorpay_order: placed.payment,
        key_id: placed.key_id,
        otp,
    }))
}

/// List orders or look one up
#[utoipa::path(
    get,
    path = "/api/orders",
    summary = "List or look up orders",
    description = "Without `id` returns every order, newest first. With `id` returns that order, matched on record id first and then on the custom reference",
    params(OrderLookupParams),
    responses(
        (status = 200, description = "All orders; `{success, order}` when `id` is given", body = OrderListEnvelope),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_orders(
    State(state): State<AppState>,
    Query(params): Query<OrderLookupParams>,
) -> Result<Response, ServiceError> {
    match params.id.filter(|id| !id.trim().is_empty()) {
        Some(id) => {
            let order = state.services.orders.find_order(&id).await?;
            Ok(Json(OrderEnvelope {
                success: true,
                order,
            })
            .into_response())
        }
        None => {
            let orders = state.services.orders.list_orders().await?;
            Ok(Json(OrderListEnvelope {
                success: true,
                orders,
            })
            .into_response())
        }
    }
}

/// Change an order's status
#[utoipa::path(
    patch,
    path = "/api/orders",
    summary = "Update order status",
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = SuccessResponse),
        (status = 400, description = "Missing fields, unknown status or disallowed transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found or not updated", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<UpdateOrderStatusRequest>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    let order = state.services.orders.update_status(payload).await?;
    info!(order_id = %order.record_id, status = %order.status, "Order status changed by admin");
    Ok(Json(SuccessResponse::ok()))
}

/// Confirm a UPI payment
#[utoipa::path(
    post,
    path = "/api/orders/verify",
    summary = "Verify payment",
    description = "Checks the gateway signature and marks the order Paid, or Payment Failed on mismatch",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified", body = SuccessResponse),
        (status = 400, description = "Missing fields, signature mismatch or order not awaiting payment", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<VerifyPaymentRequest>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    state.services.orders.verify_payment(payload).await?;
    Ok(Json(SuccessResponse::ok()))
}
