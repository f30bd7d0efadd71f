use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::entities::product;
use crate::errors::ServiceError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Decimal>,
    pub stock: i32,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specifications: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefits: Option<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<product::Model> for Product {
    type Error = ServiceError;

    fn try_from(model: product::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            original_price: model.original_price,
            stock: model.stock,
            category: model.category,
            image: model.image,
            images: serde_json::from_value(model.images)?,
            features: model.features.map(serde_json::from_value).transpose()?,
            specifications: model.specifications.map(serde_json::from_value).transpose()?,
            benefits: model.benefits.map(serde_json::from_value).transpose()?,
            created_at: model.created_at,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Product name is required"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub original_price: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: i32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub features: Option<Vec<String>>,
    #[serde(default)]
    pub specifications: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub benefits: Option<Vec<String>>,
}

impl CreateProductRequest {
    /// Field validation plus the money rules the derive cannot express.
    pub fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        if self.name.trim().is_empty() {
            return Err(ServiceError::ValidationError("Product name is required".into()));
        }
        check_money("price", Some(self.price))?;
        check_money("originalPrice", self.original_price)
    }

    /// A non-empty `images` list supersedes the single `image`.
    pub fn image_fields(&self) -> (Option<String>, Vec<String>) {
        let images: Vec<String> = self
            .images
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if images.is_empty() {
            (crate::common::normalize_optional_string(self.image.clone()), images)
        } else {
            (None, images)
        }
    }
}

/// Partial update. Identifier fields in the payload are not part of this
/// type, so they are dropped when the body is parsed. `originalPrice: null`
/// removes the struck-through price.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200, message = "Product name must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "crate::common::double_option")]
    #[schema(value_type = Option<f64>)]
    pub original_price: Option<Option<Decimal>>,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: Option<i32>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub images: Option<Vec<String>>,
    pub features: Option<Vec<String>>,
    pub specifications: Option<BTreeMap<String, String>>,
    pub benefits: Option<Vec<String>>,
}

impl UpdateProductRequest {
    pub fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        check_money("price", self.price)?;
        check_money("originalPrice", self.original_price.flatten())
    }
}

fn check_money(field: &str, value: Option<Decimal>) -> Result<(), ServiceError> {
    match value {
        Some(v) if v.is_sign_negative() => Err(ServiceError::ValidationError(format!(
            "{field} must not be negative"
        ))),
        _ => Ok(()),
    }
}
