use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, QueryOrder, Set};
use tracing::{error, info, instrument};

use crate::{
    common::{new_record_id, normalize_optional_string, normalize_record_id},
    db::DbPool,
    entities::product::{self, Entity as ProductEntity},
    errors::{ServiceError, ServiceResult},
    models::product::{CreateProductRequest, Product, UpdateProductRequest},
};

const PRODUCT_NOT_FOUND: &str = "Product not found";

/// Catalog management
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// All products, newest first
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> ServiceResult<Vec<Product>> {
        let rows = ProductEntity::find()
            .order_by_desc(product::Column::CreatedAt)
            .order_by_desc(product::Column::Id)
            .all(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list products");
                ServiceError::DatabaseError(e)
            })?;

        rows.into_iter().map(Product::try_from).collect()
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &str) -> ServiceResult<Product> {
        let model = self.find_model(id).await?;
        Product::try_from(model)
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(&self, request: CreateProductRequest) -> ServiceResult<Product> {
        request.check()?;
        let (image, images) = request.image_fields();
        let id = new_record_id();

        let row = product::ActiveModel {
            id: Set(id.clone()),
            name: Set(request.name.trim().to_string()),
            description: Set(request.description),
            price: Set(request.price),
            original_price: Set(request.original_price),
            stock: Set(request.stock),
            category: Set(request.category.trim().to_string()),
            image: Set(image),
            images: Set(serde_json::to_value(images)?),
            features: Set(request.features.map(serde_json::to_value).transpose()?),
            specifications: Set(request.specifications.map(serde_json::to_value).transpose()?),
            benefits: Set(request.benefits.map(serde_json::to_value).transpose()?),
            created_at: Set(Utc::now()),
        };

        let model = row.insert(&*self.db).await.map_err(|e| {
            error!(error = %e, "Failed to insert product");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id = %id, "Product created");
        Product::try_from(model)
    }

    /// Applies the supplied fields. Writing identical values still succeeds.
    #[instrument(skip(self, request))]
    pub async fn update_product(
        &self,
        id: &str,
        request: UpdateProductRequest,
    ) -> ServiceResult<Product> {
        request.check()?;
        let model = self.find_model(id).await?;
        let mut active = model.clone().into_active_model();

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ServiceError::ValidationError("Product name is required".into()));
            }
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(description);
        }
        if let Some(price) = request.price {
            active.price = Set(price);
        }
        if let Some(original_price) = request.original_price {
            active.original_price = Set(original_price);
        }
        if let Some(stock) = request.stock {
            active.stock = Set(stock);
        }
        if let Some(category) = request.category {
            active.category = Set(category.trim().to_string());
        }
        if let Some(image) = request.image {
            active.image = Set(normalize_optional_string(Some(image)));
        }
        if let Some(images) = request.images {
            let images: Vec<String> = images
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            active.images = Set(serde_json::to_value(images)?);
        }
        if let Some(features) = request.features {
            active.features = Set(Some(serde_json::to_value(features)?));
        }
        if let Some(specifications) = request.specifications {
            active.specifications = Set(Some(serde_json::to_value(specifications)?));
        }
        if let Some(benefits) = request.benefits {
            active.benefits = Set(Some(serde_json::to_value(benefits)?));
        }

        if !active.is_changed() {
            return Product::try_from(model);
        }

        let updated = active.update(&*self.db).await.map_err(|e| {
            error!(error = %e, product_id = %id, "Failed to update product");
            ServiceError::DatabaseError(e)
        })?;

        info!(product_id = %updated.id, "Product updated");
        Product::try_from(updated)
    }

    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: &str) -> ServiceResult<()> {
        let record_id =
            normalize_record_id(id).ok_or_else(|| ServiceError::NotFound(PRODUCT_NOT_FOUND.into()))?;

        let result = ProductEntity::delete_by_id(record_id.clone())
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, product_id = %record_id, "Failed to delete product");
                ServiceError::DatabaseError(e)
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(PRODUCT_NOT_FOUND.into()));
        }

        info!(product_id = %record_id, "Product deleted");
        Ok(())
    }

    async fn find_model(&self, id: &str) -> ServiceResult<product::Model> {
        let record_id =
            normalize_record_id(id).ok_or_else(|| ServiceError::NotFound(PRODUCT_NOT_FOUND.into()))?;

        ProductEntity::find_by_id(record_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(PRODUCT_NOT_FOUND.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::memory_db;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn honey(name: &str) -> CreateProductRequest {
        serde_json::from_value(json!({
            "name": name,
            "description": "Unprocessed wildflower honey",
            "price": 350,
            "originalPrice": 400,
            "stock": 25,
            "category": "Raw Honey",
            "image": "/img/raw.jpg",
            "features": ["Raw", "Unfiltered"],
            "specifications": { "Weight": "500g" }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_get() {
        let svc = ProductService::new(memory_db().await);
        let created = svc.create_product(honey("Wildflower Honey")).await.unwrap();

        let fetched = svc.get_product(&created.id).await.unwrap();
        assert_eq!(fetched.name, "Wildflower Honey");
        assert_eq!(fetched.price, dec!(350));
        assert_eq!(fetched.image.as_deref(), Some("/img/raw.jpg"));
        assert_eq!(
            fetched.specifications.unwrap().get("Weight").map(String::as_str),
            Some("500g")
        );
    }

    #[tokio::test]
    async fn images_list_supersedes_single_image() {
        let svc = ProductService::new(memory_db().await);
        let mut req = honey("Forest Honey");
        req.images = vec!["/a.jpg".into(), " ".into(), "/b.jpg".into()];

        let created = svc.create_product(req).await.unwrap();
        assert_eq!(created.image, None);
        assert_eq!(created.images, vec!["/a.jpg".to_string(), "/b.jpg".to_string()]);
    }

    #[tokio::test]
    async fn rejects_negative_price_and_blank_name() {
        let svc = ProductService::new(memory_db().await);

        let mut req = honey("Bad");
        req.price = dec!(-1);
        assert_matches!(svc.create_product(req).await, Err(ServiceError::ValidationError(_)));

        assert_matches!(
            svc.create_product(honey("   ")).await,
            Err(ServiceError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn partial_update_keeps_other_fields() {
        let svc = ProductService::new(memory_db().await);
        let created = svc.create_product(honey("Acacia Honey")).await.unwrap();

        let update: UpdateProductRequest =
            serde_json::from_value(json!({ "_id": "ignored", "stock": 3, "price": 299.5 })).unwrap();
        let updated = svc.update_product(&created.id, update).await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.stock, 3);
        assert_eq!(updated.price, dec!(299.5));
        assert_eq!(updated.name, "Acacia Honey");

        // Nothing to change is still a success
        let same = svc
            .update_product(&created.id, UpdateProductRequest::default())
            .await
            .unwrap();
        assert_eq!(same.stock, 3);
    }

    #[tokio::test]
    async fn null_original_price_is_cleared() {
        let svc = ProductService::new(memory_db().await);
        let created = svc.create_product(honey("Litchi Honey")).await.unwrap();
        assert_eq!(created.original_price, Some(dec!(400)));

        let update: UpdateProductRequest =
            serde_json::from_value(json!({ "stock": 9 })).unwrap();
        let updated = svc.update_product(&created.id, update).await.unwrap();
        assert_eq!(updated.original_price, Some(dec!(400)));

        let update: UpdateProductRequest =
            serde_json::from_value(json!({ "originalPrice": null })).unwrap();
        let updated = svc.update_product(&created.id, update).await.unwrap();
        assert_eq!(updated.original_price, None);
        assert_eq!(updated.stock, 9);
    }

    #[tokio::test]
    async fn unknown_ids_are_not_found() {
        let svc = ProductService::new(memory_db().await);

        assert_matches!(svc.get_product("nope").await, Err(ServiceError::NotFound(_)));
        assert_matches!(
            svc.get_product("65a1b2c3d4e5f60718293a4b").await,
            Err(ServiceError::NotFound(_))
        );
        assert_matches!(
            svc.update_product("65a1b2c3d4e5f60718293a4b", UpdateProductRequest::default())
                .await,
            Err(ServiceError::NotFound(_))
        );
        assert_matches!(
            svc.delete_product("65a1b2c3d4e5f60718293a4b").await,
            Err(ServiceError::NotFound(_))
        );
    }

    #[tokio::test]
    async fn delete_removes_product() {
        let svc = ProductService::new(memory_db().await);
        let created = svc.create_product(honey("Jamun Honey")).await.unwrap();

        svc.delete_product(&created.id).await.unwrap();
        assert!(svc.list_products().await.unwrap().is_empty());
    }
}
