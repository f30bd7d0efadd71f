use axum::{extract::State, response::Json};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::common::{ApiJson, SuccessResponse};
use crate::{errors::ServiceError, AppState};

#[derive(Debug, Serialize, ToSchema)]
pub struct SettingsEnvelope {
    pub success: bool,
    /// `null` until settings are first saved
    #[schema(value_type = Option<Object>)]
    pub settings: Option<Value>,
}

/// Read store settings
#[utoipa::path(
    get,
    path = "/api/settings",
    summary = "Get settings",
    responses(
        (status = 200, description = "Stored settings document", body = SettingsEnvelope),
    ),
    tag = "settings"
)]
pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<SettingsEnvelope>, ServiceError> {
    let settings = state.services.settings.get_settings().await?;
    Ok(Json(SettingsEnvelope {
        success: true,
        settings,
    }))
}

/// Save store settings
#[utoipa::path(
    post,
    path = "/api/settings",
    summary = "Save settings",
    description = "Shallow-merges the top-level keys of the body into the stored document",
    request_body(content = Object, description = "Settings keys to set"),
    responses(
        (status = 200, description = "Settings saved", body = SuccessResponse),
        (status = 400, description = "Body is not a JSON object", body = crate::errors::ErrorResponse),
    ),
    tag = "settings"
)]
pub async fn save_settings(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<Value>,
) -> Result<Json<SuccessResponse>, ServiceError> {
    state.services.settings.merge_settings(payload).await?;
    Ok(Json(SuccessResponse::ok()))
}
