use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::ServiceError;

/// JSON body extractor whose rejections use the API error shape.
///
/// Malformed or mistyped bodies become a 400 with `{success:false, error}`
/// instead of axum's plain-text rejection.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ServiceError::ValidationError(rejection.body_text())),
        }
    }
}

/// Bare acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Acknowledgement of a newly stored record
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InsertedResponse {
    pub success: bool,
    pub inserted_id: String,
}

impl InsertedResponse {
    pub fn new(inserted_id: impl Into<String>) -> Self {
        Self {
            success: true,
            inserted_id: inserted_id.into(),
        }
    }
}

/// Optional free-text search
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Matched against code and description
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header::CONTENT_TYPE};

    #[derive(Debug, Deserialize)]
    struct Probe {
        name: String,
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        let result = ApiJson::<Probe>::from_request(json_request("{\"name\":"), &()).await;
        assert!(matches!(result, Err(ServiceError::ValidationError(_))));
    }

    #[tokio::test]
    async fn well_formed_body_is_extracted() {
        let ApiJson(probe) = ApiJson::<Probe>::from_request(json_request("{\"name\":\"honey\"}"), &())
            .await
            .unwrap_or_else(|e| panic!("unexpected rejection: {e}"));
        assert_eq!(probe.name, "honey");
    }

    #[test]
    fn inserted_response_is_camel_case() {
        let value = serde_json::to_value(InsertedResponse::new("abc")).unwrap();
        assert_eq!(value, serde_json::json!({ "success": true, "insertedId": "abc" }));
    }
}
