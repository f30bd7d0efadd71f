use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    pub stock: i32,
    pub category: String,
    pub image: Option<String>,
    /// JSON array of image URLs; empty when only `image` is set
    #[sea_orm(column_type = "Json")]
    pub images: Json,
    #[sea_orm(column_type = "Json", nullable)]
    pub features: Option<Json>,
    #[sea_orm(column_type = "Json", nullable)]
    pub specifications: Option<Json>,
    #[sea_orm(column_type = "Json", nullable)]
    pub benefits: Option<Json>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
