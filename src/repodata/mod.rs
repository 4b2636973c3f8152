// src/repodata/mod.rs

//! Repository metadata fetching and the in-memory package catalogue.
//!
//! The wire protocol is a two-stage XML document tree: `repodata/repomd.xml`
//! names the metadata files, and the `primary` entry points at a
//! gzip-compressed package listing. [`fetch_package_metadata`] drives both
//! stages and streams the decompressed listing through the XML decoder on a
//! blocking task, so the document is never buffered whole.

pub mod primary;
pub mod repomd;

pub use primary::{Package, Primary};
pub use repomd::RepoMd;

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use futures::TryStreamExt;
use std::collections::HashMap;
use std::io::BufReader;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tracing::debug;

/// Buffer size for the streaming gzip/XML decode path.
const DECODE_BUFFER_SIZE: usize = 64 * 1024;

/// Identity of a package within a repo: name plus architecture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PkgKey {
    pub name: String,
    pub arch: String,
}

/// Version information retained for a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkgVer {
    pub ver: String,
    pub rel: String,
    /// Build timestamp, used only to arbitrate duplicate keys.
    pub time: u64,
}

/// An immutable package catalogue derived from a primary listing.
///
/// When a `(name, arch)` key appears more than once in the source document,
/// the entry with the largest build timestamp wins.
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    entries: HashMap<PkgKey, PkgVer>,
}

impl Catalogue {
    /// Build a catalogue from a package listing, applying the supersede rule.
    pub fn from_packages(packages: &[Package]) -> Self {
        let mut entries: HashMap<PkgKey, PkgVer> = HashMap::with_capacity(packages.len());

        for pkg in packages {
            let key = PkgKey {
                name: pkg.name.clone(),
                arch: pkg.arch.clone(),
            };
            let ver = PkgVer {
                ver: pkg.version.version.clone(),
                rel: pkg.version.release.clone(),
                time: pkg.time.build,
            };

            match entries.get(&key) {
                Some(existing) if existing.time >= ver.time => {
                    debug!(
                        package = %key.name,
                        kept = format!("{}-{}", existing.ver, existing.rel),
                        dropped = format!("{}-{}", ver.ver, ver.rel),
                        "older package information ignored"
                    );
                }
                Some(existing) => {
                    debug!(
                        package = %key.name,
                        superseded = format!("{}-{}", existing.ver, existing.rel),
                        by = format!("{}-{}", ver.ver, ver.rel),
                        "superseded package information"
                    );
                    entries.insert(key, ver);
                }
                None => {
                    entries.insert(key, ver);
                }
            }
        }

        Self { entries }
    }

    pub fn get(&self, key: &PkgKey) -> Option<&PkgVer> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PkgKey, &PkgVer)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Join a repo-relative href onto a base URL, tolerating a leading slash on
/// the href.
pub fn resolve_href(base: &str, href: &str) -> String {
    format!("{}/{}", base, href.strip_prefix('/').unwrap_or(href))
}

/// Fetch and decode the package listing of the repo at `uri`.
///
/// Drives the full two-stage protocol: fetch the manifest, select the
/// `primary` entry, fetch and gunzip the listing, stream-decode it. Any
/// network, transport or decode failure fails the whole call; retry policy
/// belongs to the caller.
pub async fn fetch_package_metadata(
    client: &reqwest::Client,
    uri: &str,
) -> Result<Vec<Package>> {
    let manifest_url = format!("{uri}/repodata/repomd.xml");
    let response = client.get(&manifest_url).send().await.map_err(|e| Error::Fetch {
        url: manifest_url.clone(),
        reason: e.to_string(),
    })?;
    if !response.status().is_success() {
        return Err(Error::Fetch {
            url: manifest_url,
            reason: format!("HTTP {}", response.status()),
        });
    }
    let manifest_xml = response.text().await.map_err(|e| Error::Fetch {
        url: manifest_url.clone(),
        reason: e.to_string(),
    })?;

    let manifest = RepoMd::from_xml(&manifest_xml)?;
    let primary_entry = manifest.primary().ok_or(Error::MissingPrimary)?;

    let listing_url = resolve_href(uri, &primary_entry.location.href);
    debug!(url = %listing_url, "fetching primary package listing");

    let response = client.get(&listing_url).send().await.map_err(|e| Error::Fetch {
        url: listing_url.clone(),
        reason: e.to_string(),
    })?;
    if !response.status().is_success() {
        return Err(Error::Fetch {
            url: listing_url,
            reason: format!("HTTP {}", response.status()),
        });
    }

    // Bridge the async body into the blocking gzip + XML pipeline. The body
    // is pulled through chunk by chunk; only the decoder's window and the
    // growing package list live in memory.
    let body = StreamReader::new(Box::pin(
        response.bytes_stream().map_err(std::io::Error::other),
    ));
    let bridge = SyncIoBridge::new(body);

    let decode_url = listing_url.clone();
    let listing = tokio::task::spawn_blocking(move || -> Result<Primary> {
        let gz = GzDecoder::new(BufReader::with_capacity(DECODE_BUFFER_SIZE, bridge));
        Primary::from_reader(BufReader::with_capacity(DECODE_BUFFER_SIZE, gz))
    })
    .await
    .map_err(|e| Error::Decode {
        url: decode_url,
        reason: format!("decode task failed: {e}"),
    })??;

    debug!(uri = %uri, packages = listing.packages.len(), "decoded package listing");
    Ok(listing.packages)
}
