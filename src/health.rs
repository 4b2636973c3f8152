// src/health.rs

//! Size-only health verification of a mirror's repo.
//!
//! For every package the primary listing declares, issue a `HEAD` request and
//! compare `Content-Length` against the declared package size. No hashing, no
//! content download; a repo is "healthy" when every advertised byte count
//! matches.

use crate::error::{Error, Result};
use crate::fanout::{self, FanoutReport};
use crate::repodata::{self, Package};
use tracing::debug;

/// Verify every package of the repo at `uri`.
///
/// Fails the whole call when the listing cannot be fetched or decodes to zero
/// packages; individual package mismatches are collected in the report.
pub async fn check_repository(
    client: &reqwest::Client,
    uri: &str,
    fetch_routines: usize,
) -> Result<FanoutReport> {
    let packages = repodata::fetch_package_metadata(client, uri).await?;

    let base = uri.to_string();
    let report = fanout::for_each_package(packages, fetch_routines, move |pkg| {
        let client = client.clone();
        let base = base.clone();
        async move { verify_package_size(&client, &base, &pkg).await }
    })
    .await;

    if report.total == 0 {
        return Err(Error::NoPackagesChecked(uri.to_string()));
    }

    debug!(
        uri = %uri,
        total = report.total,
        failed = report.failed,
        "repository health check finished"
    );
    Ok(report)
}

/// `HEAD` one package and compare the transported size to the declared one.
async fn verify_package_size(
    client: &reqwest::Client,
    base: &str,
    pkg: &Package,
) -> std::result::Result<(), String> {
    let url = repodata::resolve_href(base, &pkg.location.href);
    let declared = pkg.size.package;

    match client.head(&url).send().await {
        Ok(response) => {
            let actual = response.content_length().unwrap_or(0);
            if actual != declared {
                Err(format!("{url}: size {actual} != {declared}"))
            } else {
                Ok(())
            }
        }
        Err(e) => Err(format!("{url}: {e}")),
    }
}
