pub mod admin;
pub mod checkout;
pub mod common;
pub mod coupons;
pub mod health;
pub mod orders;
pub mod products;
pub mod settings;

use std::sync::Arc;

use crate::{
    config::AppConfig,
    db::DbPool,
    notifications::{Mailer, OtpNotifier},
    payments::PaymentGateway,
    services::{
        checkout::CheckoutService, coupons::CouponService, dashboard::DashboardService,
        orders::OrderService, products::ProductService, settings::SettingsService,
    },
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub orders: Arc<OrderService>,
    pub products: Arc<ProductService>,
    pub settings: Arc<SettingsService>,
    pub coupons: Arc<CouponService>,
    pub checkout: Arc<CheckoutService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    /// Wires every service onto the shared pool. The gateway and mailer are
    /// injected so tests can swap them for fakes.
    pub fn new(
        db_pool: Arc<DbPool>,
        config: &AppConfig,
        gateway: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let coupons = CouponService::new(db_pool.clone());

        let orders = Arc::new(OrderService::new(
            db_pool.clone(),
            gateway,
            OtpNotifier::new(mailer),
            coupons.clone(),
            config.razorpay.currency.clone(),
        ));
        let products = Arc::new(ProductService::new(db_pool.clone()));
        let settings = Arc::new(SettingsService::new(db_pool.clone()));
        let checkout = Arc::new(CheckoutService::new(
            config.checkout.clone(),
            coupons.clone(),
        ));
        let dashboard = Arc::new(DashboardService::new(
            db_pool,
            config.checkout.low_stock_threshold,
        ));

        Self {
            orders,
            products,
            settings,
            coupons: Arc::new(coupons),
            checkout,
            dashboard,
        }
    }
}
