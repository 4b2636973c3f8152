// src/fanout.rs

//! Bounded-parallelism fan-out over a package list.
//!
//! Both the health and mirror pipelines walk every package of a repo and run
//! one network action per package. This executor keeps at most
//! `fetch_routines` actions in flight: futures are created lazily as slots
//! free up, so pending actions are never launched early, and dropping the
//! fan-out (request cancellation) drops the in-flight actions with it.

use crate::repodata::Package;
use futures::stream::{self, StreamExt};
use std::future::Future;

/// Aggregate outcome of a fan-out run.
///
/// Outcome ordering is unspecified; only the counts and the set of failure
/// strings are meaningful.
#[derive(Debug, Clone, Default)]
pub struct FanoutReport {
    /// Number of packages acted on.
    pub total: usize,
    /// Number of failed actions.
    pub failed: usize,
    /// Human-readable failure strings, one per failed action.
    pub failures: Vec<String>,
}

/// Run `action` over every package with at most `limit` actions in flight.
///
/// Returns once every action has completed; no background work survives the
/// call.
pub async fn for_each_package<A, Fut>(
    packages: Vec<Package>,
    limit: usize,
    action: A,
) -> FanoutReport
where
    A: Fn(Package) -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    let outcomes: Vec<Result<(), String>> = stream::iter(packages.into_iter().map(&action))
        .buffer_unordered(limit.max(1))
        .collect()
        .await;

    let total = outcomes.len();
    let failures: Vec<String> = outcomes.into_iter().filter_map(Result::err).collect();

    FanoutReport {
        total,
        failed: failures.len(),
        failures,
    }
}
