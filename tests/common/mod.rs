// tests/common/mod.rs

//! Shared helpers for integration tests: mock upstream mirrors on ephemeral
//! ports and a spawner for the repoatlas app itself.

use axum::routing::get;
use axum::Router;
use flate2::write::GzEncoder;
use flate2::Compression;
use repoatlas::{AppState, Config};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Manifest naming a primary listing at the conventional location.
pub const REPOMD_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo">
  <revision>1553282324</revision>
  <data type="primary">
    <checksum type="sha256">feed</checksum>
    <location href="repodata/primary.xml.gz"/>
  </data>
</repomd>"#;

/// One `<package>` fragment for a synthetic primary listing.
pub fn package_entry(
    name: &str,
    ver: &str,
    rel: &str,
    time: u64,
    size: u64,
    href: &str,
) -> String {
    format!(
        r#"<package type="rpm">
    <name>{name}</name>
    <arch>x86_64</arch>
    <version epoch="0" ver="{ver}" rel="{rel}"/>
    <time file="{time}" build="{time}"/>
    <size package="{size}" installed="{size}" archive="{size}"/>
    <location href="{href}"/>
  </package>"#
    )
}

/// A full primary listing document.
pub fn primary_doc(entries: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" packages="{}">
  {}
</metadata>"#,
        entries.len(),
        entries.join("\n  ")
    )
}

pub fn gzip(data: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

/// Counters for upstream traffic, shared into the mock handlers.
#[derive(Clone, Default)]
pub struct UpstreamHits {
    pub primary: Arc<AtomicUsize>,
    pub files: Arc<AtomicUsize>,
}

impl UpstreamHits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn primary_count(&self) -> usize {
        self.primary.load(Ordering::SeqCst)
    }

    pub fn file_count(&self) -> usize {
        self.files.load(Ordering::SeqCst)
    }
}

/// Mount a repo at `prefix` (e.g. `/7.6.1810/os/x86_64`) on a router:
/// `repodata/repomd.xml`, the gzipped primary listing, and the package files.
pub fn mount_repo(
    router: Router,
    prefix: &str,
    primary_xml: &str,
    files: &[(&str, Vec<u8>)],
    hits: &UpstreamHits,
) -> Router {
    let gz = gzip(primary_xml);
    let primary_hits = hits.primary.clone();

    let mut router = router
        .route(
            &format!("{prefix}/repodata/repomd.xml"),
            get(|| async { REPOMD_DOC }),
        )
        .route(
            &format!("{prefix}/repodata/primary.xml.gz"),
            get(move || {
                primary_hits.fetch_add(1, Ordering::SeqCst);
                async move { gz }
            }),
        );

    for (href, bytes) in files {
        let file_hits = hits.files.clone();
        let bytes = bytes.clone();
        router = router.route(
            &format!("{prefix}/{href}"),
            get(move || {
                file_hits.fetch_add(1, Ordering::SeqCst);
                async move { bytes }
            }),
        );
    }

    router
}

/// Serve a router on an ephemeral port, returning its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL on which nothing is listening, for dead-mirror cases.
pub async fn dead_mirror() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Spawn the repoatlas app itself with the given config, returning its base
/// URL.
pub async fn start_app(config: Config) -> String {
    let client = repoatlas::client::build_outbound_client(&config).unwrap();
    let state = Arc::new(AppState::new(config, client));
    serve(repoatlas::server::create_router(state)).await
}
