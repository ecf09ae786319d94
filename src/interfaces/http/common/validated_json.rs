//! JSON extractor that also runs `validator` rules.
//!
//! Malformed or mistyped bodies answer 400; bodies that parse but break a
//! `#[validate(...)]` rule answer 422 with one message per field.

use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use validator::Validate;

use super::ApiResponse;

pub struct ValidatedJson<T>(pub T);

pub enum ValidatedJsonRejection {
    JsonError(JsonRejection),
    ValidationError(validator::ValidationErrors),
}

fn describe(errors: &validator::ValidationErrors) -> String {
    let mut field_errors: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{}: {}", field, msg)
            })
        })
        .collect();
    field_errors.sort();

    if field_errors.is_empty() {
        "Validation failed".to_string()
    } else {
        field_errors.join("; ")
    }
}

impl IntoResponse for ValidatedJsonRejection {
    fn into_response(self) -> Response {
        match self {
            Self::JsonError(rejection) => {
                let body = ApiResponse::<()>::error(format!("Invalid JSON: {}", rejection.body_text()));
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            Self::ValidationError(errors) => {
                let body = ApiResponse::<()>::error(describe(&errors));
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
        }
    }
}

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ValidatedJsonRejection;

    async fn from_request(req: axum::extract::Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(ValidatedJsonRejection::JsonError)?;

        value
            .validate()
            .map_err(ValidatedJsonRejection::ValidationError)?;

        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::post;
    use axum::Router;
    use serde::Deserialize;
    use tower::Service;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct StartBody {
        #[validate(range(min = 1, message = "must be at least 1"))]
        connector_id: u32,
        #[validate(length(min = 1, max = 20, message = "must be 1-20 characters"))]
        id_tag: String,
    }

    async fn handler(ValidatedJson(_body): ValidatedJson<StartBody>) -> &'static str {
        "ok"
    }

    async fn post_json(body: &str) -> axum::http::Response<Body> {
        let mut svc = Router::new().route("/start", post(handler)).into_service();
        let req = Request::builder()
            .method("POST")
            .uri("/start")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        svc.call(req).await.unwrap()
    }

    async fn error_text(resp: axum::http::Response<Body>) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], false);
        body["error"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn valid_body_passes() {
        let resp = post_json(r#"{"connectorId": 1, "idTag": "TAG1"}"#).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_is_400() {
        let resp = post_json("{connectorId: 1").await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(error_text(resp).await.starts_with("Invalid JSON"));
    }

    #[tokio::test]
    async fn wrong_field_type_is_400() {
        let resp = post_json(r#"{"connectorId": "one", "idTag": "TAG1"}"#).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rule_violations_are_422_with_field_messages() {
        let resp = post_json(r#"{"connectorId": 0, "idTag": ""}"#).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            error_text(resp).await,
            "connector_id: must be at least 1; id_tag: must be 1-20 characters"
        );
    }
}
