// src/main.rs

//! repoatlas service entry point.
//!
//! Configuration comes entirely from the environment and the working
//! directory; see `config`. The `DEBUG` flag raises the default log level,
//! `RUST_LOG` overrides it outright.

use anyhow::Result;
use repoatlas::config::{self, Config};
use repoatlas::server;

#[tokio::main]
async fn main() -> Result<()> {
    let default_level = if config::env_truthy("DEBUG") {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = Config::from_env()?;
    server::run_server(config).await
}
