//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use service_scaffold::config::{AppConfig, EnvironmentMode};
use service_scaffold::{App, Lifecycle, LifecycleError, LifecycleState, Shutdown};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// JSON log lines written while the guard is alive.
///
/// The subscriber is thread-local, so tests using it must run on the
/// current-thread runtime (the `#[tokio::test]` default).
#[derive(Clone, Default)]
pub struct LogCapture {
    buf: Arc<Mutex<Vec<u8>>>,
}

pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(self.buf.clone())
    }
}

impl LogCapture {
    pub fn install() -> (Self, DefaultGuard) {
        let capture = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(capture.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);
        (capture, guard)
    }

    pub fn events(&self) -> Vec<Value> {
        let buf = self.buf.lock().unwrap();
        String::from_utf8_lossy(&buf)
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Events at `level` whose serialized form contains `needle`.
    pub fn find(&self, level: &str, needle: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|event| event["level"] == level && event.to_string().contains(needle))
            .collect()
    }

    /// Access lines: `info` events whose message is exactly `path`.
    pub fn access_lines(&self, path: &str) -> Vec<Value> {
        self.events()
            .into_iter()
            .filter(|event| event["level"] == "INFO" && event["fields"]["message"] == path)
            .collect()
    }
}

/// Defaults suited to tests: quiet environment, short drain deadline.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.environment = EnvironmentMode::Local;
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.listener.shutdown_timeout_secs = 1;
    config
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub state: watch::Receiver<LifecycleState>,
    pub handle: JoinHandle<Result<(), LifecycleError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Trigger the drain and wait for the lifecycle to finish.
    pub async fn stop(self) -> Result<(), LifecycleError> {
        self.shutdown.trigger();
        self.handle.await.unwrap()
    }
}

/// Run `app` on an ephemeral port; returns once it is serving.
pub async fn spawn_app(app: App) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let lifecycle = Lifecycle::new(app);
    let shutdown = lifecycle.shutdown_handle();
    let mut state = lifecycle.state();
    let handle = tokio::spawn(lifecycle.run_with_listener(listener, std::future::pending()));

    state
        .wait_for(|s| *s == LifecycleState::Serving)
        .await
        .expect("server reached Serving");

    TestServer {
        addr,
        shutdown,
        state,
        handle,
    }
}
