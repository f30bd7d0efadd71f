use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::common::{ApiJson, InsertedResponse, SuccessResponse};
use crate::{
    errors::ServiceError,
    models::{
        product::{CreateProductRequest, UpdateProductRequest},
        Product,
    },
    AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductEnvelope {
    pub success: bool,
    pub product: Product,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductListEnvelope {
    pub success: bool,
    pub products: Vec<Product>,
}

/// List products
#[utoipa::path(
    get,
    path = "/api/products",
    summary = "List products",
    description = "Every product, newest first",
    responses(
        (status = 200, description = "Catalog", body = ProductListEnvelope),
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<ProductListEnvelope>, ServiceError> {
    let products = state.services.products.list_products().await?;
    Ok(Json(ProductListEnvelope {
        success: true,
        products,
    }))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/products",
    summary = "Create product",
    request_body = CreateProductRequest,
    responses(
        (status = 200, description = "Product created", body = InsertedResponse),
        (status = 400, description = "Invalid product", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateProductRequest>,
) -> Result<Json<InsertedResponse>, ServiceError> {
    let product = state.services.products.create_product(payload).await?;
    Ok(Json(InsertedResponse::new(product.id)))
}

/// Get a product
#[utoipa::path(
    get,
    path = "/api/products/{id}",
    summary = "Get product",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product", body = ProductEnvelope),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProductEnvelope>, ServiceError> {
    let product = state.services.products.get_product(&id).await?;
    Ok(Json(ProductEnvelope {
        success: true,
        product,
    }))
}

/// Partially update a product
#[utoipa::path(
    patch,
    path = "/api/products/{id}",
    summary = "Update product",
    description = "Applies the supplied fields; identifier fields in the body are ignored",
    params(("id" = String, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = SuccessResponse),
        (status = 400, description = "Invalid update", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(payload): ApiJson<UpdateProductRequest>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    state.services.products.update_product(&id, payload).await?;
    Ok(Json(SuccessResponse::ok()))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    summary = "Delete product",
    params(("id" = String, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product deleted", body = SuccessResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    state.services.products.delete_product(&id).await?;
    Ok(Json(SuccessResponse::ok()))
}
