// tests/pipelines.rs

//! End-to-end tests driving the four request pipelines over real sockets:
//! mock upstream mirrors on one side, the repoatlas router on the other.

mod common;

use axum::Router;
use common::{
    dead_mirror, mount_repo, package_entry, primary_doc, serve, start_app, UpstreamHits,
};
use repoatlas::Config;
use std::collections::HashMap;

fn aliases() -> HashMap<String, String> {
    HashMap::from([
        ("6".to_string(), "6.9".to_string()),
        ("7".to_string(), "7.6.1810".to_string()),
    ])
}

fn config(mirrors: Vec<String>) -> Config {
    Config {
        mirrors,
        aliases: aliases(),
        fetch_routines: 4,
        ..Config::default()
    }
}

/// A mirror carrying one release of `os/x86_64` with a single healthy
/// package.
async fn simple_mirror(release: &str) -> String {
    let hits = UpstreamHits::new();
    let primary = primary_doc(&[package_entry(
        "zlib", "1.2.7", "18", 100, 4, "Packages/zlib.rpm",
    )]);
    let router = mount_repo(
        Router::new(),
        &format!("/{release}/os/x86_64"),
        &primary,
        &[("Packages/zlib.rpm", b"RPM!".to_vec())],
        &hits,
    );
    serve(router).await
}

#[tokio::test]
async fn test_mirrorlist_happy_path() {
    let a = simple_mirror("7.6.1810").await;
    let b = simple_mirror("7.6.1810").await;
    let app = start_app(config(vec![a.clone(), b.clone()])).await;

    let response = reqwest::get(format!("{app}/?release=7&repo=os&arch=x86_64"))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("x-mirrors-found").unwrap(),
        "2/2"
    );
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "max-age=3600"
    );
    // Mirror order in the body follows configuration order.
    assert_eq!(
        response.text().await.unwrap(),
        format!("{a}/7.6.1810/os/x86_64\n{b}/7.6.1810/os/x86_64\n")
    );
}

#[tokio::test]
async fn test_mirrorlist_partial() {
    let a = simple_mirror("7.6.1810").await;
    let b = dead_mirror().await;
    let app = start_app(config(vec![a.clone(), b])).await;

    let response = reqwest::get(format!("{app}/mirrorlist?release=7&repo=os&arch=x86_64"))
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers().get("x-mirrors-found").unwrap(), "1/2");
    assert_eq!(
        response.text().await.unwrap(),
        format!("{a}/7.6.1810/os/x86_64\n")
    );
}

#[tokio::test]
async fn test_mirrorlist_missing_params_is_400() {
    let a = simple_mirror("7.6.1810").await;
    let app = start_app(config(vec![a])).await;

    let response = reqwest::get(format!("{app}/?release=7")).await.unwrap();
    assert_eq!(response.status(), 400);

    let response = reqwest::get(format!("{app}/?release=&repo=os")).await.unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_no_mirrors_configured_is_204() {
    let app = start_app(config(Vec::new())).await;

    for path in [
        "/?release=7&repo=os",
        "/repodiff?old=6&new=7&repo=os",
        "/repohealth?release=7&repo=os",
        "/repomirror?release=7&repo=os",
    ] {
        let response = reqwest::get(format!("{app}{path}")).await.unwrap();
        assert_eq!(response.status(), 204, "for {path}");
    }
}

#[tokio::test]
async fn test_mirrorlist_no_live_mirrors_is_404() {
    let app = start_app(config(vec![dead_mirror().await])).await;

    let response = reqwest::get(format!("{app}/?release=7&repo=os"))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let a = simple_mirror("7.6.1810").await;
    let app = start_app(config(vec![a])).await;

    let response = reqwest::get(format!("{app}/not-a-pipeline?release=7&repo=os"))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_repodiff_supersede_and_cache() {
    let hits = UpstreamHits::new();

    // Old release: foo-1.0-1, gone-2.0-1. New release: foo appears twice and
    // the later build must win; bar is new; gone is gone.
    let old_primary = primary_doc(&[
        package_entry("foo", "1.0", "1", 100, 10, "Packages/foo.rpm"),
        package_entry("gone", "2.0", "1", 100, 10, "Packages/gone.rpm"),
    ]);
    let new_primary = primary_doc(&[
        package_entry("foo", "1.0", "1", 100, 10, "Packages/foo.rpm"),
        package_entry("foo", "1.0", "2", 200, 10, "Packages/foo2.rpm"),
        package_entry("bar", "0.5", "3", 150, 10, "Packages/bar.rpm"),
    ]);

    let router = mount_repo(Router::new(), "/6.9/os/x86_64", &old_primary, &[], &hits);
    let router = mount_repo(router, "/7.6.1810/os/x86_64", &new_primary, &[], &hits);
    let mirror = serve(router).await;

    let app = start_app(config(vec![mirror])).await;

    let response = reqwest::get(format!("{app}/repodiff?old=6&new=7&repo=os&arch=x86_64"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "max-age=86400"
    );
    assert!(response.headers().contains_key("x-content-age"));

    let body = response.text().await.unwrap();
    assert!(body.contains("added:\n\tbar-0.5-3.x86_64"), "{body}");
    assert!(
        body.contains("changed:\n\tfoo-1.0-1.x86_64 -> foo-1.0-2.x86_64"),
        "{body}"
    );
    assert!(body.contains("removed:\n\tgone-2.0-1.x86_64"), "{body}");

    let listings_after_first = hits.primary_count();
    assert_eq!(listings_after_first, 2);

    // Second request within the cache lifetime: no new metadata fetches.
    let response = reqwest::get(format!("{app}/repodiff?old=6&new=7&repo=os&arch=x86_64"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-content-age"));
    assert_eq!(hits.primary_count(), listings_after_first);
}

#[tokio::test]
async fn test_repodiff_identical_releases_report_no_changes() {
    let hits = UpstreamHits::new();
    let primary = primary_doc(&[package_entry("foo", "1.0", "1", 100, 10, "Packages/foo.rpm")]);

    let router = mount_repo(Router::new(), "/6.9/os", &primary, &[], &hits);
    let router = mount_repo(router, "/7.6.1810/os", &primary, &[], &hits);
    let mirror = serve(router).await;

    let app = start_app(config(vec![mirror])).await;

    let response = reqwest::get(format!("{app}/repodiff?old=6&new=7&repo=os"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "no changes in packages\n");
}

#[tokio::test]
async fn test_repodiff_without_live_mirror_is_404() {
    let app = start_app(config(vec![dead_mirror().await])).await;

    let response = reqwest::get(format!("{app}/repodiff?old=6&new=7&repo=os"))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_repodiff_missing_params_is_400() {
    let a = simple_mirror("7.6.1810").await;
    let app = start_app(config(vec![a])).await;

    let response = reqwest::get(format!("{app}/repodiff?old=6&repo=os"))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_repohealth_reports_size_mismatch() {
    let hits = UpstreamHits::new();

    // Declares 1024 bytes, serves 1000.
    let primary = primary_doc(&[package_entry(
        "p", "1.0", "1", 100, 1024, "Packages/p.rpm",
    )]);
    let router = mount_repo(
        Router::new(),
        "/7.6.1810/os/x86_64",
        &primary,
        &[("Packages/p.rpm", vec![0u8; 1000])],
        &hits,
    );
    let mirror = serve(router).await;

    let app = start_app(config(vec![mirror.clone()])).await;

    let response = reqwest::get(format!("{app}/repohealth?release=7&repo=os&arch=x86_64"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        format!("{mirror}/7.6.1810/os/x86_64 1 FAILED PACKAGES\n")
    );
}

#[tokio::test]
async fn test_repohealth_healthy_and_unreachable_mirrors() {
    let healthy = simple_mirror("7.6.1810").await;
    let dead = dead_mirror().await;

    let app = start_app(config(vec![healthy.clone(), dead.clone()])).await;

    let response = reqwest::get(format!("{app}/repohealth?release=7&repo=os&arch=x86_64"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.text().await.unwrap(),
        format!(
            "{healthy}/7.6.1810/os/x86_64 OK\n{dead}/7.6.1810/os/x86_64 NOT CHECKED\n"
        )
    );
}

#[tokio::test]
async fn test_stats_and_liveness_endpoints() {
    let app = start_app(config(Vec::new())).await;

    let response = reqwest::get(format!("{app}/health")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ALIVE\n");

    let response = reqwest::get(format!("{app}/favicon.ico")).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "");

    let response = reqwest::get(format!("{app}/stats")).await.unwrap();
    assert_eq!(response.status(), 200);
    let stats: serde_json::Value = response.json().await.unwrap();
    // The two requests above are already on the books.
    assert!(stats["total_count"].as_u64().unwrap() >= 2);
    assert!(stats["total_status_code_count"]["200"].as_u64().unwrap() >= 2);
}
