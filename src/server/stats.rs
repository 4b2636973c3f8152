// src/server/stats.rs

//! Request-stats middleware.
//!
//! Counts every request, buckets responses by status code and tracks the
//! running average response time. The `/stats` endpoint serves a JSON
//! snapshot of these counters.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Process-wide request statistics.
pub struct RequestStats {
    started: Instant,
    total_count: AtomicU64,
    response_micros: AtomicU64,
    status_counts: RwLock<HashMap<String, u64>>,
}

impl RequestStats {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            total_count: AtomicU64::new(0),
            response_micros: AtomicU64::new(0),
            status_counts: RwLock::new(HashMap::new()),
        }
    }

    /// Record one finished request.
    pub async fn record(&self, status: axum::http::StatusCode, elapsed: Duration) {
        self.total_count.fetch_add(1, Ordering::Relaxed);
        self.response_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);

        let mut counts = self.status_counts.write().await;
        *counts.entry(status.as_u16().to_string()).or_insert(0) += 1;
    }

    /// Current counters as a serialisable snapshot.
    pub async fn snapshot(&self) -> StatsSnapshot {
        let total = self.total_count.load(Ordering::Relaxed);
        let micros = self.response_micros.load(Ordering::Relaxed);
        let average_ms = if total > 0 {
            (micros as f64 / total as f64) / 1000.0
        } else {
            0.0
        };

        StatsSnapshot {
            uptime_secs: self.started.elapsed().as_secs(),
            total_count: total,
            average_response_time_ms: average_ms,
            total_status_code_count: self.status_counts.read().await.clone(),
        }
    }
}

impl Default for RequestStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot served by `/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Total requests processed.
    pub total_count: u64,
    /// Mean time to response in milliseconds.
    pub average_response_time_ms: f64,
    /// Responses bucketed by status code.
    pub total_status_code_count: HashMap<String, u64>,
}

/// Middleware wrapping every request with stats bookkeeping.
pub async fn track_requests(
    State(stats): State<Arc<RequestStats>>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let response = next.run(request).await;
    stats.record(response.status(), started.elapsed()).await;
    response
}
