// src/probe.rs

//! Mirror-liveness cache.
//!
//! Answers "does this mirror serve this repo right now?" with a freshness
//! window, so that fan-outs and mirrorlist requests do not hammer upstreams.
//! A probe is a `GET` of the repo's `repodata/repomd.xml` with a hard 2 s
//! timeout; anything other than a clean HTTP 200 is a cached negative.
//!
//! Records are never deleted. Two concurrent probes of the same URI may both
//! fire; the cache is last-writer-wins, which is fine because probes are
//! idempotent.

use reqwest::StatusCode;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Probes must answer within this window or the mirror is considered down.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// How long a probe result stays authoritative.
const FRESHNESS_WINDOW: Duration = Duration::from_secs(60);

/// Cached health of a single mirror-repo URL.
#[derive(Debug, Clone, Copy)]
pub struct MirrorHealth {
    /// Whether the last probe answered HTTP 200 in time.
    pub valid: bool,
    /// When the last probe completed.
    pub last_check: Instant,
    /// Latency of the last successful probe.
    pub latency: Duration,
}

/// Liveness cache over canonical mirror-repo URLs.
pub struct MirrorProber {
    client: reqwest::Client,
    cache: RwLock<HashMap<String, MirrorHealth>>,
    fresh_for: Duration,
}

impl MirrorProber {
    /// Create a prober with the standard 60 s freshness window.
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_freshness(client, FRESHNESS_WINDOW)
    }

    /// Create a prober with a custom freshness window. Used by tests to
    /// exercise expiry without waiting a minute.
    pub fn with_freshness(client: reqwest::Client, fresh_for: Duration) -> Self {
        Self {
            client,
            cache: RwLock::new(HashMap::new()),
            fresh_for,
        }
    }

    /// Check whether `uri` currently serves a repo.
    ///
    /// Returns the cached verdict when it is fresh; otherwise probes and
    /// caches the result. Probe failures never propagate, they cache a
    /// negative.
    pub async fn check(&self, uri: &str) -> bool {
        if let Some(record) = self.cache.read().await.get(uri) {
            if record.last_check.elapsed() < self.fresh_for {
                return record.valid;
            }
            debug!(uri = %uri, "mirror status stale, probing again");
        }

        let probe_url = format!("{uri}/repodata/repomd.xml");
        let started = Instant::now();
        let (valid, latency) = match self
            .client
            .get(&probe_url)
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(response) if response.status() == StatusCode::OK => {
                (true, Some(started.elapsed()))
            }
            Ok(response) => {
                warn!(uri = %uri, status = %response.status(), "mirror probe rejected");
                (false, None)
            }
            Err(e) => {
                warn!(uri = %uri, error = %e, "mirror probe failed");
                (false, None)
            }
        };

        let mut cache = self.cache.write().await;
        let record = cache.entry(uri.to_string()).or_insert(MirrorHealth {
            valid: false,
            last_check: started,
            latency: Duration::ZERO,
        });
        record.valid = valid;
        record.last_check = Instant::now();
        if let Some(latency) = latency {
            record.latency = latency;
        }

        valid
    }

    /// Current cache record for a URI, if one exists.
    pub async fn snapshot(&self, uri: &str) -> Option<MirrorHealth> {
        self.cache.read().await.get(uri).copied()
    }
}
