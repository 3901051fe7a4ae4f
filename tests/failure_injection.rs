//! Failure injection: panicking handlers, dead peers and drain overruns.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use common::{spawn_app, test_config, LogCapture};
use reqwest::StatusCode;
use service_scaffold::routing::{GroupRegistry, RegistryError};
use service_scaffold::{App, LifecycleError, RouteService};
use tokio::sync::Notify;

struct Faulty;

impl RouteService for Faulty {
    fn mount(&self, groups: &GroupRegistry) -> Result<(), RegistryError> {
        let root = groups.root();
        root.get("/ok", || async { "fine" });
        root.get("/boom", || async {
            if true {
                panic!("boom");
            }
            "unreachable"
        });
        root.get("/peer-gone", || async {
            if true {
                panic!("write tcp 10.0.0.1:80->10.0.0.2:5000: write: broken pipe");
            }
            "unreachable"
        });
        Ok(())
    }
}

#[tokio::test]
async fn panic_becomes_500_and_is_logged_once() {
    let (logs, _guard) = LogCapture::install();
    let server = spawn_app({
        let mut app = App::new(test_config());
        app.register_service(Faulty);
        app
    })
    .await;
    let client = reqwest::Client::new();

    let res = client.get(server.url("/boom")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(res.bytes().await.unwrap().is_empty());

    assert_eq!(logs.find("ERROR", "boom").len(), 1);
    assert!(logs.access_lines("/boom").is_empty());

    // The process keeps serving.
    let res = client.get(server.url("/ok")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "fine");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn broken_pipe_drops_the_connection() {
    let (logs, _guard) = LogCapture::install();
    let server = spawn_app({
        let mut app = App::new(test_config());
        app.register_service(Faulty);
        app
    })
    .await;
    let client = reqwest::Client::new();

    let outcome = async {
        let res = client.get(server.url("/peer-gone")).send().await?;
        res.bytes().await
    }
    .await;
    assert!(outcome.is_err(), "no complete response for a dead peer");

    let lines = logs.find("ERROR", "broken pipe");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["fields"]["message"], "broken connection");

    let res = client.get(server.url("/ok")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    server.stop().await.unwrap();
}

struct Stuck {
    entered: Arc<Notify>,
}

impl RouteService for Stuck {
    fn mount(&self, groups: &GroupRegistry) -> Result<(), RegistryError> {
        let entered = self.entered.clone();
        groups.root().get("/stuck", move || {
            let entered = entered.clone();
            async move {
                entered.notify_one();
                tokio::time::sleep(Duration::from_secs(30)).await;
                "too late"
            }
        });
        Ok(())
    }
}

#[tokio::test]
async fn drain_overrun_cuts_requests_and_reports_timeout() {
    let (logs, _guard) = LogCapture::install();
    let entered = Arc::new(Notify::new());
    let server = spawn_app({
        let mut app = App::new(test_config());
        app.register_service(Stuck {
            entered: entered.clone(),
        });
        app
    })
    .await;

    let url = server.url("/stuck");
    let request = tokio::spawn(async move {
        let res = reqwest::get(url).await?;
        res.text().await
    });
    entered.notified().await;

    let started = Instant::now();
    let result = server.stop().await;

    assert!(matches!(result, Err(LifecycleError::ShutdownTimeout(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert!(request.await.unwrap().is_err());
    assert_eq!(logs.find("ERROR", "request cut by forced shutdown").len(), 1);
}
