pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::extraction::MAX_FILE_SIZE_BYTES;
use crate::facts::handlers as facts;
use crate::keywords::handlers as keywords;
use crate::state::AppState;
use crate::tailoring::handlers as tailoring;

/// Multipart framing on top of the largest accepted file, so oversize uploads reach
/// the extractor's own size check.
const UPLOAD_BODY_LIMIT: usize = MAX_FILE_SIZE_BYTES + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Extraction API
        .route(
            "/api/v1/resumes/extract",
            post(facts::handle_extract_upload).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/api/v1/resumes/extract/text",
            post(facts::handle_extract_text),
        )
        // Tailoring API
        .route("/api/v1/resumes/tailor", post(tailoring::handle_tailor))
        .route(
            "/api/v1/keywords/coverage",
            post(keywords::handle_keyword_coverage),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::llm_client::UnconfiguredProvider;

    fn app() -> Router {
        build_router(AppState::for_tests(Arc::new(UnconfiguredProvider)))
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_service() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "resume-api");
    }

    #[tokio::test]
    async fn test_keyword_coverage_route() {
        let request = post_json(
            "/api/v1/keywords/coverage",
            json!({"jd_text": "Requirements: Python, Kafka", "resume_text": "Python services"}),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["coverage"]["score"], 50);
        assert_eq!(body["coverage"]["missing"], json!(["Kafka"]));
    }

    #[tokio::test]
    async fn test_tailor_without_provider_returns_error_envelope() {
        let request = post_json(
            "/api/v1/resumes/tailor",
            json!({"facts": {}, "jd_text": "Requirements: Python"}),
        );
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "NO_PROVIDER_CONFIGURED", "{body}");
        assert!(body["error"]["message"]
            .as_str()
            .unwrap()
            .contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_blank_extract_text_is_bad_request() {
        let request = post_json("/api/v1/resumes/extract/text", json!({"resume_text": ""}));
        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
