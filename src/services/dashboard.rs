use std::{collections::BTreeMap, sync::Arc};

use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;
use strum::IntoEnumIterator;
use tracing::{error, instrument};
use utoipa::ToSchema;

use crate::{
    db::DbPool,
    entities::{
        order::{self, Entity as OrderEntity},
        product::{self, Entity as ProductEntity},
    },
    errors::{ServiceError, ServiceResult},
    models::{Order, OrderStatus, Product},
};

const RECENT_ORDERS: u64 = 5;

/// Figures for the admin dashboard
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_orders: u64,
    /// Order count per status, every known status included
    pub orders_by_status: BTreeMap<String, u64>,
    /// Sum of totals of paid or fulfilled orders
    pub revenue: Decimal,
    pub total_products: u64,
    pub recent_orders: Vec<Order>,
    pub low_stock_products: Vec<Product>,
}

#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DbPool>,
    low_stock_threshold: i32,
}

impl DashboardService {
    pub fn new(db: Arc<DbPool>, low_stock_threshold: i32) -> Self {
        Self {
            db,
            low_stock_threshold,
        }
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> ServiceResult<DashboardStats> {
        let db = &*self.db;

        let rows: Vec<(String, Decimal)> = OrderEntity::find()
            .select_only()
            .column(order::Column::Status)
            .column(order::Column::Total)
            .into_tuple()
            .all(db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load order totals");
                ServiceError::DatabaseError(e)
            })?;

        let mut orders_by_status: BTreeMap<String, u64> =
            OrderStatus::iter().map(|s| (s.to_string(), 0)).collect();
        let mut revenue = Decimal::ZERO;
        for (status, total) in &rows {
            *orders_by_status.entry(status.clone()).or_default() += 1;
            if status
                .parse::<OrderStatus>()
                .map(OrderStatus::counts_as_revenue)
                .unwrap_or(false)
            {
                revenue += *total;
            }
        }

        let recent_orders = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .order_by_desc(order::Column::Id)
            .limit(RECENT_ORDERS)
            .all(db)
            .await?
            .into_iter()
            .map(Order::try_from)
            .collect::<ServiceResult<Vec<_>>>()?;

        let total_products = ProductEntity::find().count(db).await?;
        let low_stock_products = ProductEntity::find()
            .filter(product::Column::Stock.lt(self.low_stock_threshold))
            .order_by_asc(product::Column::Stock)
            .order_by_asc(product::Column::Name)
            .all(db)
            .await?
            .into_iter()
            .map(Product::try_from)
            .collect::<ServiceResult<Vec<_>>>()?;

        Ok(DashboardStats {
            total_orders: rows.len() as u64,
            orders_by_status,
            revenue,
            total_products,
            recent_orders,
            low_stock_products,
        })
    }
}
