//! HTTP router for SecretShare

use axum::{
    routing::{any, get},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health_check, read_secret, write_secret};
use crate::service::SecretService;

/// Create the application router
pub fn create_router(service: Arc<SecretService>, cors: bool) -> Router {
    let router = Router::new()
        .route("/health", get(health_check))
        .route("/write", any(write_secret))
        .route("/read", get(read_secret))
        .layer(TraceLayer::new_for_http());

    let router = if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    };

    router.with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{key_schema, SecretRepository};
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request, StatusCode};
    use secretshare_core::{SystemClock, INTERNAL_ERROR_MESSAGE, SECRET_UNAVAILABLE_MESSAGE};
    use secretshare_store::MemoryStore;
    use tower::ServiceExt;

    fn app() -> Router {
        let repository = SecretRepository::new(Arc::new(MemoryStore::new(key_schema())));
        let service = SecretService::new(repository, Arc::new(SystemClock));
        create_router(Arc::new(service), true)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Option<String>, String) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(body.to_vec()).unwrap())
    }

    fn write_request(method: Method, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/write")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn read_request(query: &str) -> Request<Body> {
        Request::builder()
            .uri(format!("/read?{}", query))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_write_read_round() {
        let app = app();

        let (status, content_type, id) = send(
            &app,
            write_request(
                Method::POST,
                r#"{"Message":"hello","SecretKey":"k1","ActiveDuration":"1h"}"#,
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

        let query = format!("SecretID={}&SecretKey=k1", id);
        let (status, _, body) = send(&app, read_request(&query)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "hello");

        let (status, _, body) = send(&app, read_request(&query)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, SECRET_UNAVAILABLE_MESSAGE);
    }

    #[tokio::test]
    async fn test_write_accepts_any_method() {
        let app = app();
        for method in [Method::PUT, Method::GET, Method::PATCH] {
            let (status, _, id) =
                send(&app, write_request(method, r#"{"Message":"m","SecretKey":"k"}"#)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(id.len(), 32);
        }
    }

    #[tokio::test]
    async fn test_write_malformed_body() {
        let app = app();
        let (status, content_type, body) =
            send(&app, write_request(Method::POST, "definitely not json")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        assert_eq!(body, INTERNAL_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_read_unknown_and_missing_params() {
        let app = app();

        let (status, _, body) = send(
            &app,
            read_request("SecretID=00000000000000000000000000000000&SecretKey=k"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, SECRET_UNAVAILABLE_MESSAGE);

        let request = Request::builder().uri("/read").body(Body::empty()).unwrap();
        let (status, _, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, SECRET_UNAVAILABLE_MESSAGE);
    }

    #[tokio::test]
    async fn test_read_wrong_key() {
        let app = app();
        let (_, _, id) =
            send(&app, write_request(Method::POST, r#"{"Message":"m","SecretKey":"k"}"#)).await;

        let (_, _, body) = send(&app, read_request(&format!("SecretID={}&SecretKey=K", id))).await;
        assert_eq!(body, SECRET_UNAVAILABLE_MESSAGE);

        let (_, _, body) = send(&app, read_request(&format!("SecretID={}&SecretKey=k", id))).await;
        assert_eq!(body, "m");
    }

    #[tokio::test]
    async fn test_health() {
        let app = app();
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, _, body) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "running");
        assert_eq!(json["store"], "memory");
    }

    #[tokio::test]
    async fn test_cors_preflight() {
        let app = app();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/write")
            .header(header::ORIGIN, "https://example.com")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert!(response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = app();
        let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
