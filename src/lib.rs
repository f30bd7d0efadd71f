//! Honey Palace storefront API
//!
//! Orders with Razorpay UPI payments and e-mailed confirmation codes, plus
//! the catalog, coupon, settings and dashboard endpoints behind the admin
//! screens.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod common;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod models;
pub mod notifications;
pub mod openapi;
pub mod payments;
pub mod services;
pub mod tracing;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: Arc<config::AppConfig>,
    pub services: handlers::AppServices,
}

/// Routes mounted under `/api`
pub fn api_routes() -> Router<AppState> {
    let orders = Router::new()
        .route(
            "/orders",
            get(handlers::orders::get_orders)
                .post(handlers::orders::create_order)
                .patch(handlers::orders::update_order_status),
        )
        .route("/orders/verify", post(handlers::orders::verify_payment));

    let products = Router::new()
        .route(
            "/products",
            get(handlers::products::list_products).post(handlers::products::create_product),
        )
        .route(
            "/products/:id",
            get(handlers::products::get_product)
                .patch(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        );

    let settings = Router::new().route(
        "/settings",
        get(handlers::settings::get_settings).post(handlers::settings::save_settings),
    );

    let coupons = Router::new()
        .route(
            "/coupons",
            get(handlers::coupons::list_coupons).post(handlers::coupons::create_coupon),
        )
        .route("/coupons/stats", get(handlers::coupons::coupon_stats))
        .route("/coupons/generate-code", get(handlers::coupons::generate_code))
        .route(
            "/coupons/:id",
            axum::routing::patch(handlers::coupons::update_coupon)
                .delete(handlers::coupons::delete_coupon),
        );

    let checkout = Router::new().route("/checkout/quote", post(handlers::checkout::quote));
    let admin = Router::new().route("/admin/stats", get(handlers::admin::dashboard_stats));

    Router::new()
        .merge(orders)
        .merge(products)
        .merge(settings)
        .merge(coupons)
        .merge(checkout)
        .merge(admin)
}

/// Full application router without the outer HTTP layers
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes())
        .merge(handlers::health::health_routes())
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}
