// src/mirror.rs

//! Local mirroring of a repo into the `pub/` tree.
//!
//! Downloads every package of a repo into `pub/<release>/<repo>[/<arch>]/...`
//! with the upstream path layout preserved, so the tree can be served back
//! out under `/pub/`. A package already on disk with the declared size is
//! skipped, which makes repeated runs cheap and lets an interrupted run
//! resume where it stopped.

use crate::error::{Error, Result};
use crate::fanout::{self, FanoutReport};
use crate::probe::MirrorProber;
use crate::repodata::{self, Package};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Mirror the repo at `uri` into `<pub_root>/<prefix>/`.
///
/// `prefix` is the repo path relative to the mirror base (release/repo/arch),
/// which keeps the local tree host-independent. The mirror is probed first so
/// a known-bad upstream never launches the fan-out.
pub async fn mirror_repository(
    client: &reqwest::Client,
    prober: &MirrorProber,
    pub_root: &Path,
    uri: &str,
    prefix: &str,
    fetch_routines: usize,
) -> Result<FanoutReport> {
    match tokio::fs::metadata(pub_root).await {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(Error::PubDirMissing(format!(
                "{} is not a directory",
                pub_root.display()
            )))
        }
        Err(e) => return Err(Error::PubDirMissing(e.to_string())),
    }

    if !prober.check(uri).await {
        return Err(Error::MirrorUnavailable(uri.to_string()));
    }

    let packages = repodata::fetch_package_metadata(client, uri).await?;

    let base = uri.to_string();
    let target = pub_root.join(prefix);
    let report = fanout::for_each_package(packages, fetch_routines, move |pkg| {
        let client = client.clone();
        let base = base.clone();
        let target = target.clone();
        async move { download_package(&client, &base, &target, &pkg).await }
    })
    .await;

    if report.total == 0 {
        return Err(Error::NoPackagesChecked(uri.to_string()));
    }

    debug!(
        uri = %uri,
        total = report.total,
        failed = report.failed,
        "repository mirror run finished"
    );
    Ok(report)
}

/// Download one package into the local tree, or skip it when it is already
/// present with the declared size.
async fn download_package(
    client: &reqwest::Client,
    base: &str,
    target: &Path,
    pkg: &Package,
) -> std::result::Result<(), String> {
    let declared = pkg.size.package;
    let local = local_path(target, &pkg.location.href);
    let pkg_name = local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| pkg.location.href.clone());

    if let Ok(meta) = tokio::fs::metadata(&local).await {
        if meta.len() == declared {
            debug!(package = %pkg_name, "already present, skipping download");
            return Ok(());
        }
        warn!(package = %pkg_name, on_disk = meta.len(), declared, "incorrect size on disk, re-downloading");
    }

    if let Some(parent) = local.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| format!("unable to create directory for {pkg_name} ({e})"))?;
    }

    let url = repodata::resolve_href(base, &pkg.location.href);
    let response = client
        .get(&url)
        .send()
        .await
        .map_err(|e| format!("unable to download package {pkg_name} ({e})"))?;
    if !response.status().is_success() {
        return Err(format!(
            "unable to download package {pkg_name} (HTTP {})",
            response.status()
        ));
    }

    let mut file = tokio::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(&local)
        .await
        .map_err(|e| format!("unable to write {pkg_name} ({e})"))?;

    let mut written: u64 = 0;
    let mut body = response.bytes_stream();
    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| format!("failure reading package {pkg_name} ({e})"))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| format!("failure writing package {pkg_name} ({e})"))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| format!("failure writing package {pkg_name} ({e})"))?;

    if written != declared {
        // The partial file stays on disk; the size check above catches it on
        // the next run and re-downloads.
        return Err(format!(
            "written size does not match expected size for {pkg_name}"
        ));
    }

    debug!(package = %pkg_name, bytes = written, "downloaded");
    Ok(())
}

/// Map a repo-relative href onto the local tree, normalising separators for
/// the host OS.
fn local_path(target: &Path, href: &str) -> PathBuf {
    let mut path = target.to_path_buf();
    for component in href.split('/').filter(|c| !c.is_empty()) {
        path.push(component);
    }
    path
}
