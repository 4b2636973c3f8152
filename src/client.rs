// src/client.rs

//! Shared outbound HTTP client.
//!
//! Every upstream fetch in the process goes through one `reqwest::Client` so
//! that TLS policy, client identity and proxying are uniform. Transport-level
//! response decompression stays off; the metadata decoder handles gzip
//! explicitly where the wire format calls for it.

use crate::config::Config;
use crate::error::{Error, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Idle connections are swept from the pool after this long.
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Build the process-wide outbound client from startup configuration.
pub fn build_outbound_client(config: &Config) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .user_agent(concat!("repoatlas/", env!("CARGO_PKG_VERSION")))
        .pool_idle_timeout(POOL_IDLE_TIMEOUT);

    if config.insecure_skip_verify {
        warn!("INSECURE_SKIP_VERIFY is set, upstream TLS certificates will not be verified");
        builder = builder.danger_accept_invalid_certs(true);
    }

    if let Some((cert, key)) = &config.client_keypair {
        match load_identity(cert, key) {
            Ok(identity) => {
                info!(cert = %cert.display(), "using client certificate for upstream requests");
                builder = builder.identity(identity);
            }
            Err(e) => {
                warn!(error = %e, "client keypair present but not loadable, continuing without");
            }
        }
    }

    if let Some(proxy) = &config.http_proxy {
        match reqwest::Proxy::all(proxy) {
            Ok(proxy_cfg) => {
                info!(proxy = %proxy, "routing outbound traffic through proxy");
                builder = builder.proxy(proxy_cfg);
            }
            Err(e) => {
                warn!(proxy = %proxy, error = %e, "could not parse HTTP_PROXY, ignoring");
            }
        }
    }

    builder
        .build()
        .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))
}

/// Load a PEM client identity from separate cert and key files.
fn load_identity(cert: &std::path::Path, key: &std::path::Path) -> Result<reqwest::Identity> {
    let mut pem = std::fs::read(cert).map_err(|e| Error::Io {
        path: cert.display().to_string(),
        source: e,
    })?;
    let key_pem = std::fs::read(key).map_err(|e| Error::Io {
        path: key.display().to_string(),
        source: e,
    })?;
    pem.extend_from_slice(&key_pem);

    reqwest::Identity::from_pem(&pem)
        .map_err(|e| Error::Config(format!("invalid client keypair: {e}")))
}
