//! Middleware pipeline behaviour observed from a client.

mod common;

use axum::http::StatusCode as AxumStatus;
use axum::response::IntoResponse;
use common::{spawn_app, test_config, LogCapture};
use reqwest::StatusCode;
use service_scaffold::http::middleware::AccessLog;
use service_scaffold::routing::{GroupRegistry, RegistryError};
use service_scaffold::{App, RequestError, RouteService};

struct Api;

impl RouteService for Api {
    fn mount(&self, groups: &GroupRegistry) -> Result<(), RegistryError> {
        let api = groups.register("/api", None)?;
        api.post("/echo", |body: String| async move { body });
        api.get("/ping", || async { "pong" });
        api.get("/bad", || async {
            (
                AxumStatus::BAD_REQUEST,
                RequestError::new("missing field `name`"),
                "bad request",
            )
                .into_response()
        });
        api.get("/internal/state", || async { "secret" });
        Ok(())
    }
}

fn app() -> App {
    let mut app = App::new(test_config());
    app.register_service(Api);
    app
}

#[tokio::test]
async fn body_is_logged_and_still_readable_by_the_handler() {
    let (logs, _guard) = LogCapture::install();
    let server = spawn_app(app()).await;

    let res = reqwest::Client::new()
        .post(server.url("/api/echo"))
        .header("content-type", "application/json")
        .body(r#"{"a":1}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), r#"{"a":1}"#);

    let lines = logs.access_lines("/api/echo");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["fields"]["body"], r#"{"a":1}"#);
    assert_eq!(lines[0]["fields"]["status"], 200);
    assert_eq!(lines[0]["fields"]["method"], "POST");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn access_line_carries_query_and_client_address() {
    let (logs, _guard) = LogCapture::install();
    let server = spawn_app(app()).await;

    let res = reqwest::Client::new()
        .get(server.url("/api/ping?page=2"))
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .header("user-agent", "curl/8.5.0")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let lines = logs.access_lines("/api/ping?page=2");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["fields"]["query"], "page=2");
    assert_eq!(lines[0]["fields"]["ip"], "203.0.113.7");
    assert_eq!(lines[0]["fields"]["user_agent"], "curl/8.5.0");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn attached_errors_replace_the_access_line() {
    let (logs, _guard) = LogCapture::install();
    let server = spawn_app(app()).await;

    let res = reqwest::get(server.url("/api/bad")).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    assert_eq!(logs.find("ERROR", "missing field `name`").len(), 1);
    assert!(logs.access_lines("/api/bad").is_empty());

    server.stop().await.unwrap();
}

#[tokio::test]
async fn skip_predicate_and_skip_paths_suppress_logging() {
    let (logs, _guard) = LogCapture::install();
    let mut app = app();
    let config = test_config();
    app.set_access_log(
        AccessLog::from_config(&config.access_log)
            .skip_when(|req| req.uri().path().starts_with("/api/internal")),
    );
    let server = spawn_app(app).await;

    for path in ["/api/internal/state", "/healthz", "/api/ping"] {
        let res = reqwest::get(server.url(path)).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK, "{}", path);
    }

    assert!(logs.access_lines("/api/internal/state").is_empty());
    assert!(logs.access_lines("/healthz").is_empty());
    assert_eq!(logs.access_lines("/api/ping").len(), 1);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn request_id_is_generated_or_echoed() {
    let (logs, _guard) = LogCapture::install();
    let server = spawn_app(app()).await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/api/ping")).send().await.unwrap();
    let generated = res.headers()["x-request-id"].to_str().unwrap().to_string();
    assert!(!generated.is_empty());

    let res = client
        .get(server.url("/api/ping"))
        .header("x-request-id", "trace-42")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["x-request-id"], "trace-42");

    let lines = logs.access_lines("/api/ping");
    assert_eq!(lines[0]["fields"]["request_id"], generated.as_str());
    assert_eq!(lines[1]["fields"]["request_id"], "trace-42");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn unmatched_routes_are_logged_as_404() {
    let (logs, _guard) = LogCapture::install();
    let server = spawn_app(app()).await;

    let res = reqwest::get(server.url("/nope")).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let lines = logs.access_lines("/nope");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["fields"]["status"], 404);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn metrics_endpoint_exposes_request_counters() {
    let mut config = test_config();
    config.metrics.enabled = true;
    config.metrics.namespace = "scaffold".to_string();
    let mut app = App::new(config);
    app.register_service(Api);
    let server = spawn_app(app).await;

    let res = reqwest::get(server.url("/api/ping")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = reqwest::get(server.url("/metrics")).await.unwrap().text().await.unwrap();
    assert!(body.contains("scaffold_requests_total"), "{}", body);
    assert!(body.contains("url=\"/api/ping\""));
    assert!(body.contains("scaffold_request_duration_millisecond"));
    assert!(!body.contains("url=\"/metrics\""));

    server.stop().await.unwrap();
}
