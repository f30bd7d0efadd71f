use std::sync::Arc;

use chrono::Utc;
use sea_orm::{sea_query::OnConflict, EntityTrait, Set};
use serde_json::{Map, Value};
use tracing::{error, info, instrument};

use crate::{
    db::DbPool,
    entities::setting::{self, Entity as SettingEntity, SETTINGS_ROW_ID},
    errors::{ServiceError, ServiceResult},
};

/// Store-wide settings kept as a single JSON document
#[derive(Clone)]
pub struct SettingsService {
    db: Arc<DbPool>,
}

impl SettingsService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// The stored document, or `None` before the first write
    #[instrument(skip(self))]
    pub async fn get_settings(&self) -> ServiceResult<Option<Value>> {
        let row = SettingEntity::find_by_id(SETTINGS_ROW_ID)
            .one(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load settings");
                ServiceError::DatabaseError(e)
            })?;
        Ok(row.map(|r| r.document))
    }

    /// Shallow-merges the top-level keys of `patch` into the stored document.
    ///
    /// Concurrent writers race; the last one wins.
    #[instrument(skip(self, patch))]
    pub async fn merge_settings(&self, patch: Value) -> ServiceResult<Value> {
        let Value::Object(patch) = patch else {
            return Err(ServiceError::ValidationError(
                "Settings must be a JSON object".into(),
            ));
        };

        let mut document = match self.get_settings().await? {
            Some(Value::Object(existing)) => existing,
            _ => Map::new(),
        };
        for (key, value) in patch {
            if key == "_id" {
                continue;
            }
            document.insert(key, value);
        }
        let document = Value::Object(document);

        let row = setting::ActiveModel {
            id: Set(SETTINGS_ROW_ID),
            document: Set(document.clone()),
            updated_at: Set(Utc::now()),
        };
        SettingEntity::insert(row)
            .on_conflict(
                OnConflict::column(setting::Column::Id)
                    .update_columns([setting::Column::Document, setting::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&*self.db)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to save settings");
                ServiceError::DatabaseError(e)
            })?;

        info!("Settings saved");
        Ok(document)
    }
}
