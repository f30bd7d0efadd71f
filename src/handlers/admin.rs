use axum::{extract::State, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{errors::ServiceError, services::dashboard::DashboardStats, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardEnvelope {
    pub success: bool,
    pub stats: DashboardStats,
}

/// Dashboard figures
#[utoipa::path(
    get,
    path = "/api/admin/stats",
    summary = "Dashboard statistics",
    description = "Order counts per status, revenue, recent orders and low stock products",
    responses(
        (status = 200, description = "Dashboard figures", body = DashboardEnvelope),
    ),
    tag = "admin"
)]
pub async fn dashboard_stats(
    State(state): State<AppState>,
) -> Result<Json<DashboardEnvelope>, ServiceError> {
    let stats = state.services.dashboard.stats().await?;
    Ok(Json(DashboardEnvelope {
        success: true,
        stats,
    }))
}
