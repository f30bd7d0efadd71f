use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Persisted order row.
///
/// `shipping` and `items` hold the document-shaped parts of the order as
/// JSON; `models::order::Order` is the typed view over this row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Client supplied reference, used as a lookup fallback
    pub reference: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub shipping: Json,
    #[sea_orm(column_type = "Json")]
    pub items: Json,
    pub total: Decimal,
    pub payment_method: String,
    pub status: String,
    pub otp: String,
    pub razorpay_order_id: Option<String>,
    pub razorpay_payment_id: Option<String>,
    /// Coupon redeemed at placement
    pub coupon_code: Option<String>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
