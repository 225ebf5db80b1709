use axum::Router;
use axum::body::Body;
use axum::extract::Extension;
use axum::http::{Request, StatusCode};
use axum::middleware;
use axum::routing::get;
use tower::ServiceExt;

use callbatch::infrastructure::observability::{
    REQUEST_ID_HEADER, RequestId, TracingConfig, request_id_middleware,
};

fn app() -> Router {
    Router::new()
        .route(
            "/whoami",
            get(|Extension(id): Extension<RequestId>| async move { id.0 }),
        )
        .layer(middleware::from_fn(request_id_middleware))
}

#[tokio::test]
async fn given_incoming_request_id_when_handled_then_echoed_and_visible_to_handler() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/whoami")
                .header(REQUEST_ID_HEADER, "req-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-123");
    let body = http_body_util::BodyExt::collect(response.into_body())
        .await
        .unwrap()
        .to_bytes();
    assert_eq!(&body[..], b"req-123");
}

#[tokio::test]
async fn given_no_request_id_when_handled_then_uuid_generated() {
    let response = app()
        .oneshot(Request::builder().uri("/whoami").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());
}

#[test]
fn given_default_tracing_config_when_built_then_plain_text_with_crate_debug() {
    let config = TracingConfig::default();

    assert!(!config.json_format);
    assert_eq!(config.environment, "local");
    assert!(config.default_filter.contains("callbatch=debug"));
}
