//! Route configuration for the folio server.

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::Request;
use axum::http::{HeaderName, HeaderValue, Method, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use tower::ServiceExt;
use tower::util::BoxCloneSyncService;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::{API_KEY_HEADER, require_api_key};
use crate::config::{ANY_ORIGIN, ServerConfig};
use crate::handlers::{
    append, download, get_status, health_check, list_files, plan_page, read_page, set_status,
    upload,
};
use crate::state::AppState;

type StaticService = BoxCloneSyncService<Request, Response, Infallible>;

/// Create the server router: the API under `/api`, static roots as fallback.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/upload", post(upload))
        .route("/append", post(append))
        .route("/download/{filename}", get(download))
        .route("/list", get(list_files))
        .route("/status", get(get_status).post(set_status))
        .route("/jsonl/plan", get(plan_page))
        .route("/jsonl/read", get(read_page))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .layer(build_cors_layer(state.config()))
        .layer(middleware::from_fn(options_no_content));

    let mut router = Router::new().nest("/api", api_routes);
    if let Some(service) = build_static_service(&state.config().static_roots) {
        router = router.fallback_service(service);
    }

    let request_logging = state.config().request_logging;
    let router = router.with_state(state);
    if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origin = if config.cors_origin == ANY_ORIGIN {
        AllowOrigin::any()
    } else if let Ok(value) = HeaderValue::from_str(&config.cors_origin) {
        AllowOrigin::exact(value)
    } else {
        warn!(origin = %config.cors_origin, "invalid CORS origin, allowing any");
        AllowOrigin::any()
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)])
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
}

/// Answer every successful API `OPTIONS` request with 204 No Content.
async fn options_no_content(request: Request, next: Next) -> Response {
    let is_options = request.method() == Method::OPTIONS;
    let mut response = next.run(request).await;
    if is_options && response.status().is_success() {
        *response.status_mut() = StatusCode::NO_CONTENT;
    }
    response
}

/// Chain the static roots so each one falls through to the next.
fn build_static_service(roots: &[PathBuf]) -> Option<StaticService> {
    let mut roots = roots.iter().rev();
    let last = roots.next()?;

    let mut service = StaticService::new(ServiceExt::<Request>::map_response(
        ServeDir::new(last),
        IntoResponse::into_response,
    ));
    for root in roots {
        service = StaticService::new(ServiceExt::<Request>::map_response(
            ServeDir::new(root).fallback(service),
            IntoResponse::into_response,
        ));
    }
    Some(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use folio_store::DataStore;
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    fn make_test_state(config: ServerConfig) -> (Arc<AppState>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = DataStore::with_base_dir(dir.path()).unwrap();
        (Arc::new(AppState::new(config, store)), dir)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, _dir) = make_test_state(ServerConfig::default());
        let app = create_router(state);

        let response = app.oneshot(get_request("/api/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_status_endpoint_defaults() {
        let (state, _dir) = make_test_state(ServerConfig::default());
        let app = create_router(state);

        let response = app.oneshot(get_request("/api/status")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert!(json["phase"].is_null());
        assert!(json["part"].is_null());
        assert!(json["updated"].is_null());
    }

    #[tokio::test]
    async fn test_corrupt_status_is_server_error() {
        let (state, dir) = make_test_state(ServerConfig::default());
        std::fs::write(dir.path().join(folio_store::STATUS_FILE_NAME), "{").unwrap();
        let app = create_router(state);

        let response = app.oneshot(get_request("/api/status")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["error"], "status parse error");
    }

    #[tokio::test]
    async fn test_list_endpoint_filters() {
        let (state, dir) = make_test_state(ServerConfig::default());
        for name in ["a.md", "b.txt", "c.MD"] {
            std::fs::write(dir.path().join(name), "x").unwrap();
        }
        let app = create_router(state);

        let response = app.oneshot(get_request("/api/list?ext=.md")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["count"], 2);
        assert_eq!(json["files"], serde_json::json!(["a.md", "c.MD"]));
    }

    #[tokio::test]
    async fn test_list_rejects_bad_limit() {
        let (state, _dir) = make_test_state(ServerConfig::default());
        let app = create_router(state);

        let response = app.oneshot(get_request("/api/list?limit=lots")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["ok"], false);
    }

    #[tokio::test]
    async fn test_upload_malformed_json() {
        let (state, _dir) = make_test_state(ServerConfig::default());
        let app = create_router(state);

        let request = Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["ok"], false);
    }

    #[tokio::test]
    async fn test_append_invalid_filename() {
        let (state, _dir) = make_test_state(ServerConfig::default());
        let app = create_router(state);

        let body = serde_json::json!({ "filename": "..", "content": "x" });
        let response = app.oneshot(post_json("/api/append", &body)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "invalid filename");
    }

    fn post_form(uri: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_append_form_body() {
        let (state, dir) = make_test_state(ServerConfig::default());
        let app = create_router(state);

        let response = app
            .clone()
            .oneshot(post_form("/api/append", "filename=a.txt&content=hello"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "appended a.txt");

        let response = app
            .oneshot(post_form("/api/append", "filename=a.txt&content=world&newline=false"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let written = std::fs::read_to_string(dir.path().join("a.txt")).unwrap();
        assert_eq!(written, "hello\nworld");
    }

    #[tokio::test]
    async fn test_upload_form_body() {
        let (state, dir) = make_test_state(ServerConfig::default());
        let app = create_router(state);

        let response = app
            .oneshot(post_form(
                "/api/upload",
                "filename=notes%2Fb.txt&content=aGk%3D&encoding=base64",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "saved b.txt");
        assert_eq!(std::fs::read(dir.path().join("b.txt")).unwrap(), b"hi");
    }

    #[tokio::test]
    async fn test_status_form_body() {
        let (state, _dir) = make_test_state(ServerConfig::default());
        let app = create_router(state);

        let response = app
            .oneshot(post_form("/api/status", "phase=extract&part=3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"]["phase"], "extract");
        assert_eq!(json["status"]["part"], "3");
    }

    #[tokio::test]
    async fn test_plan_rejects_cursor_out_of_range() {
        let (state, dir) = make_test_state(ServerConfig::default());
        std::fs::write(dir.path().join("log.jsonl"), "a\n").unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(get_request(
                "/api/jsonl/plan?file=log.jsonl&cursor=18446744073709551615",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["ok"], false);
    }

    #[tokio::test]
    async fn test_plan_endpoint() {
        let (state, dir) = make_test_state(ServerConfig::default());
        let line = "x".repeat(30);
        let content: String = (0..5).map(|_| format!("{line}\n")).collect();
        std::fs::write(dir.path().join("log.jsonl"), content).unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(get_request("/api/jsonl/plan?file=log.jsonl&maxChars=100"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["ok"], true);
        assert_eq!(json["file"], "log.jsonl");
        assert_eq!(json["lines"], 3);
        assert_eq!(json["nextCursor"], 3);
        assert_eq!(json["truncated"], true);
        assert_eq!(json["oversize"], false);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let (state, _dir) = make_test_state(ServerConfig::default());
        let app = create_router(state);

        let response = app
            .oneshot(get_request("/api/jsonl/read?file=missing.jsonl"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["ok"], false);
    }

    #[tokio::test]
    async fn test_api_key_required_when_configured() {
        let (state, _dir) = make_test_state(ServerConfig::default().with_api_key("s3cret"));
        let app = create_router(state);

        let response = app.clone().oneshot(get_request("/api/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["error"], "unauthorized");

        let request = Request::builder()
            .uri("/api/status")
            .header("x-api-key", "wrong")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/status")
            .header("x-api-key", "s3cret")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get_request("/api/status?key=s3cret")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_cors_preflight_skips_auth() {
        let (state, _dir) = make_test_state(ServerConfig::default().with_api_key("s3cret"));
        let app = create_router(state);

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/append")
            .header("Origin", "http://example.com")
            .header("Access-Control-Request-Method", "POST")
            .header("Access-Control-Request-Headers", "content-type,x-api-key")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            HeaderValue::from_static("*")
        );
    }

    #[tokio::test]
    async fn test_bare_options_is_no_content() {
        let (state, _dir) = make_test_state(ServerConfig::default().with_api_key("s3cret"));
        let app = create_router(state);

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/api/status")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            HeaderValue::from_static("*")
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_cors_specific_origin() {
        let config = ServerConfig::default().with_cors_origin("https://example.com");
        let (state, _dir) = make_test_state(config);
        let app = create_router(state);

        let request = Request::builder()
            .uri("/api/health")
            .header("Origin", "https://example.com")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(
            response.headers()["access-control-allow-origin"],
            HeaderValue::from_static("https://example.com")
        );
    }

    #[tokio::test]
    async fn test_static_roots_fall_through() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(first.path().join("index.html"), "<h1>home</h1>").unwrap();
        std::fs::write(second.path().join("content.json"), "{\"pages\":[]}").unwrap();

        let config = ServerConfig::default()
            .with_static_root(first.path())
            .with_static_root(second.path());
        let (state, _dir) = make_test_state(config);
        let app = create_router(state);

        let response = app.clone().oneshot(get_request("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"<h1>home</h1>");

        let response = app.clone().oneshot(get_request("/content.json")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");

        let response = app.oneshot(get_request("/missing.css")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_endpoint_without_static_roots() {
        let (state, _dir) = make_test_state(ServerConfig::default());
        let app = create_router(state);

        let response = app.oneshot(get_request("/index.html")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_request_logging_layer() {
        let (state, _dir) = make_test_state(ServerConfig::default().with_request_logging(true));
        let app = create_router(state);

        let response = app.oneshot(get_request("/api/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
