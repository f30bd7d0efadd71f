use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Honey Palace API",
        version = "1.0.0",
        description = r#"
# Honey Palace storefront API

Backend for the Honey Palace honey store: checkout, UPI payments through
Razorpay, order confirmation codes by e-mail, and the admin screens for
products, coupons, settings and the dashboard.

## Order flow

1. `POST /api/orders` places the order. Cash on delivery orders start in
   `Processing`; UPI orders start in `Pending Payment` and the response
   carries the Razorpay order and public key for the payment widget.
2. The storefront forwards the widget callback to `POST /api/orders/verify`,
   which moves the order to `Paid` or `Payment Failed`.
3. Administrators move orders through fulfilment with `PATCH /api/orders`.

## Errors

Every failure uses the same body:

```json
{ "success": false, "error": "Order not found" }
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "orders", description = "Order placement, payment verification and status"),
        (name = "products", description = "Catalog management"),
        (name = "settings", description = "Store settings document"),
        (name = "coupons", description = "Coupon management"),
        (name = "checkout", description = "Cart pricing"),
        (name = "admin", description = "Dashboard figures"),
        (name = "health", description = "Health check")
    ),
    paths(
        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::get_orders,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::verify_payment,

        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::create_product,
        crate::handlers::products::get_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,

        // Settings
        crate::handlers::settings::get_settings,
        crate::handlers::settings::save_settings,

        // Coupons
        crate::handlers::coupons::list_coupons,
        crate::handlers::coupons::create_coupon,
        crate::handlers::coupons::update_coupon,
        crate::handlers::coupons::delete_coupon,
        crate::handlers::coupons::coupon_stats,
        crate::handlers::coupons::generate_code,

        // Checkout & admin
        crate::handlers::checkout::quote,
        crate::handlers::admin::dashboard_stats,

        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            // Common types
            crate::handlers::common::SuccessResponse,
            crate::handlers::common::InsertedResponse,

            // Order types
            crate::models::Order,
            crate::models::OrderStatus,
            crate::models::PaymentMethod,
            crate::models::ShippingDetails,
            crate::models::LineItem,
            crate::payments::PaymentOrder,
            crate::handlers::orders::OrderEnvelope,

            // Catalog and coupons
            crate::models::Product,
            crate::models::Coupon,
            crate::models::CouponKind,
            crate::models::CouponStatus,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_storefront_routes() {
        let openapi = ApiDoc::openapi();
        let json = serde_json::to_string_pretty(&openapi).unwrap();
        assert!(json.contains("Honey Palace API"));
        assert!(json.contains("/api/orders/verify"));
        assert!(json.contains("/api/products/{id}"));
        assert!(json.contains("/api/coupons/generate-code"));
        assert!(json.contains("ErrorResponse"));
    }
}
