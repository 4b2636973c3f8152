// src/diff.rs

//! Diff computation between two repository catalogues.
//!
//! Compares the catalogues of two releases of a repo and produces three
//! sorted, human-readable lists: packages added, changed and removed. Results
//! are cached per `(old, new, repo, arch)` for the lifetime of the process;
//! consumers read the age off `X-Content-Age` and decide for themselves how
//! stale is too stale.

use crate::repodata::{self, Catalogue};
use std::collections::HashMap;
use std::time::Instant;
use tokio::sync::RwLock;
use tracing::warn;

/// The computed difference between two releases of a repo.
#[derive(Debug, Clone)]
pub struct RepoDiff {
    /// When this diff was computed.
    pub last_check: Instant,
    /// `name-ver-rel.arch` entries present only in the new release.
    pub added: Vec<String>,
    /// `old -> new` entries whose version or release differ.
    pub changed: Vec<String>,
    /// `name-ver-rel.arch` entries present only in the old release.
    pub removed: Vec<String>,
}

impl RepoDiff {
    /// Whether the two releases carry identical package sets.
    pub fn is_unchanged(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Cache key for computed diffs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DiffKey {
    pub old: String,
    pub new: String,
    pub repo: String,
    pub arch: String,
}

/// Process-wide diff cache. Entries are never evicted; they age in place.
#[derive(Default)]
pub struct DiffCache {
    entries: RwLock<HashMap<DiffKey, RepoDiff>>,
}

impl DiffCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &DiffKey) -> Option<RepoDiff> {
        self.entries.read().await.get(key).cloned()
    }

    pub async fn insert(&self, key: DiffKey, diff: RepoDiff) {
        self.entries.write().await.insert(key, diff);
    }
}

/// Compare two catalogues under `(ver, rel)` equality.
///
/// Each output list comes back lexicographically sorted. Supersede has
/// already happened during catalogue construction; timestamps play no part
/// here.
pub fn diff_catalogues(
    old: &Catalogue,
    new: &Catalogue,
) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut added = Vec::new();
    let mut changed = Vec::new();
    let mut removed = Vec::new();

    for (key, new_ver) in new.iter() {
        match old.get(key) {
            Some(old_ver) if old_ver.ver == new_ver.ver && old_ver.rel == new_ver.rel => {}
            Some(old_ver) => changed.push(format!(
                "{}-{}-{}.{} -> {}-{}-{}.{}",
                key.name, old_ver.ver, old_ver.rel, key.arch,
                key.name, new_ver.ver, new_ver.rel, key.arch,
            )),
            None => added.push(format!(
                "{}-{}-{}.{}",
                key.name, new_ver.ver, new_ver.rel, key.arch
            )),
        }
    }

    for (key, old_ver) in old.iter() {
        if new.get(key).is_none() {
            removed.push(format!(
                "{}-{}-{}.{}",
                key.name, old_ver.ver, old_ver.rel, key.arch
            ));
        }
    }

    added.sort();
    changed.sort();
    removed.sort();

    (added, changed, removed)
}

/// Fetch both catalogues concurrently and diff them.
///
/// A failed fetch degrades that side to an empty catalogue with a warning, so
/// the diff collapses to "everything on the other side is added/removed".
pub async fn diff_repositories(
    client: &reqwest::Client,
    old_uri: &str,
    new_uri: &str,
) -> RepoDiff {
    let (old_packages, new_packages) = tokio::join!(
        repodata::fetch_package_metadata(client, old_uri),
        repodata::fetch_package_metadata(client, new_uri),
    );

    let old_catalogue = match old_packages {
        Ok(packages) => Catalogue::from_packages(&packages),
        Err(e) => {
            warn!(uri = %old_uri, error = %e, "could not fetch old-side catalogue, treating as empty");
            Catalogue::default()
        }
    };
    let new_catalogue = match new_packages {
        Ok(packages) => Catalogue::from_packages(&packages),
        Err(e) => {
            warn!(uri = %new_uri, error = %e, "could not fetch new-side catalogue, treating as empty");
            Catalogue::default()
        }
    };

    let (added, changed, removed) = diff_catalogues(&old_catalogue, &new_catalogue);
    RepoDiff {
        last_check: Instant::now(),
        added,
        changed,
        removed,
    }
}
