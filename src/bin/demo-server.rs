//! Demo service on top of the scaffold.
//!
//! Mounts a few routes under `/demo` that make the lifecycle observable from
//! outside: a handler that sleeps and one that echoes.
//!
//! ```text
//! GET  /demo/sleep/{ms}   responds "slept {ms}ms" after sleeping
//! POST /demo/echo         returns the request body
//! ```

use std::process::ExitCode;
use std::time::Duration;

use axum::extract::Path;
use clap::Parser;

use service_scaffold::cli::{self, Cli};
use service_scaffold::routing::{GroupRegistry, RegistryError};
use service_scaffold::RouteService;

struct Demo;

impl RouteService for Demo {
    fn mount(&self, groups: &GroupRegistry) -> Result<(), RegistryError> {
        let demo = groups.register("/demo", None)?;
        demo.get("/sleep/{ms}", |Path(ms): Path<u64>| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            format!("slept {}ms", ms)
        })
        .post("/echo", |body: String| async move { body });
        Ok(())
    }

    fn name(&self) -> &str {
        "demo"
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    cli::run(Cli::parse(), |app| {
        app.register_service(Demo);
    })
    .await
}
