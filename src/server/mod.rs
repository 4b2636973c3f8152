// src/server/mod.rs

//! HTTP service assembly: shared state, listeners and shutdown.
//!
//! The plain listener always binds `:8080`. When `cert.pem` + `key.pem` load,
//! a second TLS listener binds `:8443` serving the same router. SIGINT and
//! SIGTERM drain in-flight requests with a 5 s grace window.

pub mod handlers;
pub mod routes;
pub mod stats;

pub use routes::create_router;
pub use stats::{RequestStats, StatsSnapshot};

use crate::client::build_outbound_client;
use crate::config::Config;
use crate::diff::DiffCache;
use crate::probe::MirrorProber;
use anyhow::Result;
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Plain HTTP listener address.
const HTTP_ADDR: &str = "0.0.0.0:8080";

/// TLS listener address, used only when a server keypair loads.
const HTTPS_ADDR: &str = "0.0.0.0:8443";

/// How long in-flight requests get to finish after a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Shared server state, immutable after startup apart from the caches.
pub struct AppState {
    pub config: Config,
    pub client: reqwest::Client,
    pub prober: MirrorProber,
    pub diff_cache: DiffCache,
    pub stats: Arc<RequestStats>,
}

impl AppState {
    pub fn new(config: Config, client: reqwest::Client) -> Self {
        let prober = MirrorProber::new(client.clone());
        Self {
            config,
            client,
            prober,
            diff_cache: DiffCache::new(),
            stats: Arc::new(RequestStats::new()),
        }
    }
}

/// Build the shared state and serve until a shutdown signal arrives.
pub async fn run_server(config: Config) -> Result<()> {
    let client = build_outbound_client(&config)?;
    let state = Arc::new(AppState::new(config, client));
    let app = create_router(state.clone());

    let handle = Handle::new();
    tokio::spawn(shutdown_watcher(handle.clone()));

    let http_addr: SocketAddr = HTTP_ADDR.parse()?;
    info!(addr = %http_addr, "starting repoatlas");
    let http = axum_server::bind(http_addr)
        .handle(handle.clone())
        .serve(app.clone().into_make_service());

    let tls_config = match &state.config.tls_keypair {
        Some((cert, key)) => match RustlsConfig::from_pem_file(cert, key).await {
            Ok(tls) => Some(tls),
            Err(e) => {
                warn!(reason = %e, "TLS keypair not loaded, HTTPS will not be available");
                None
            }
        },
        None => {
            info!("TLS keypair not present, HTTPS will not be available");
            None
        }
    };

    match tls_config {
        Some(tls) => {
            let https_addr: SocketAddr = HTTPS_ADDR.parse()?;
            info!(addr = %https_addr, "https listener ready");
            let https = axum_server::bind_rustls(https_addr, tls)
                .handle(handle)
                .serve(app.into_make_service());
            tokio::try_join!(http, https)?;
        }
        None => http.await?,
    }

    info!("server stopped");
    Ok(())
}

/// Wait for SIGINT or SIGTERM, then drain connections gracefully.
async fn shutdown_watcher(handle: Handle) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl+c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("received shutdown signal, draining requests");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
