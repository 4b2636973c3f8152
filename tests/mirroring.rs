// tests/mirroring.rs

//! Mirror-pipeline tests: downloads into a local tree, skip-on-match
//! idempotence and re-download on size mismatch.

mod common;

use axum::Router;
use common::{dead_mirror, mount_repo, package_entry, primary_doc, serve, UpstreamHits};
use repoatlas::mirror::mirror_repository;
use repoatlas::MirrorProber;

const PREFIX: &str = "7.6.1810/os/x86_64";

async fn mirror_with_package(payload: &[u8], declared: u64, hits: &UpstreamHits) -> String {
    let primary = primary_doc(&[package_entry(
        "p",
        "1.0",
        "1",
        100,
        declared,
        "Packages/p.rpm",
    )]);
    let router = mount_repo(
        Router::new(),
        &format!("/{PREFIX}"),
        &primary,
        &[("Packages/p.rpm", payload.to_vec())],
        hits,
    );
    serve(router).await
}

#[tokio::test]
async fn test_mirror_downloads_and_skips_on_rerun() {
    let hits = UpstreamHits::new();
    let payload = b"these are rpm bytes.";
    let base = mirror_with_package(payload, payload.len() as u64, &hits).await;
    let uri = format!("{base}/{PREFIX}");

    let pub_root = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();
    let prober = MirrorProber::new(client.clone());

    let report = mirror_repository(&client, &prober, pub_root.path(), &uri, PREFIX, 4)
        .await
        .unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(hits.file_count(), 1);

    let local = pub_root.path().join(PREFIX).join("Packages/p.rpm");
    assert_eq!(std::fs::read(&local).unwrap(), payload);

    // Second run: the file is present with the declared size, so no package
    // is fetched again.
    let report = mirror_repository(&client, &prober, pub_root.path(), &uri, PREFIX, 4)
        .await
        .unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(hits.file_count(), 1);
}

#[tokio::test]
async fn test_mirror_redownloads_wrong_sized_file() {
    let hits = UpstreamHits::new();
    let payload = b"correct content bytes";
    let base = mirror_with_package(payload, payload.len() as u64, &hits).await;
    let uri = format!("{base}/{PREFIX}");

    let pub_root = tempfile::tempdir().unwrap();
    let local_dir = pub_root.path().join(PREFIX).join("Packages");
    std::fs::create_dir_all(&local_dir).unwrap();
    std::fs::write(local_dir.join("p.rpm"), b"stale").unwrap();

    let client = reqwest::Client::new();
    let prober = MirrorProber::new(client.clone());

    let report = mirror_repository(&client, &prober, pub_root.path(), &uri, PREFIX, 4)
        .await
        .unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(hits.file_count(), 1);
    assert_eq!(
        std::fs::read(local_dir.join("p.rpm")).unwrap(),
        payload.to_vec()
    );
}

#[tokio::test]
async fn test_mirror_records_truncated_download() {
    let hits = UpstreamHits::new();
    // Upstream serves fewer bytes than the listing declares.
    let base = mirror_with_package(b"short", 1024, &hits).await;
    let uri = format!("{base}/{PREFIX}");

    let pub_root = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();
    let prober = MirrorProber::new(client.clone());

    let report = mirror_repository(&client, &prober, pub_root.path(), &uri, PREFIX, 4)
        .await
        .unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.failed, 1);
    assert!(
        report.failures[0].contains("written size does not match expected size"),
        "{:?}",
        report.failures
    );
}

#[tokio::test]
async fn test_mirror_requires_pub_directory() {
    let hits = UpstreamHits::new();
    let base = mirror_with_package(b"x", 1, &hits).await;
    let uri = format!("{base}/{PREFIX}");

    let client = reqwest::Client::new();
    let prober = MirrorProber::new(client.clone());

    let missing = tempfile::tempdir().unwrap().path().join("nope");
    let err = mirror_repository(&client, &prober, &missing, &uri, PREFIX, 4)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("'pub' directory"), "{err}");
}

#[tokio::test]
async fn test_mirror_aborts_on_dead_upstream_before_fanout() {
    let base = dead_mirror().await;
    let uri = format!("{base}/{PREFIX}");

    let pub_root = tempfile::tempdir().unwrap();
    let client = reqwest::Client::new();
    let prober = MirrorProber::new(client.clone());

    let err = mirror_repository(&client, &prober, pub_root.path(), &uri, PREFIX, 4)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not answering"), "{err}");
}
