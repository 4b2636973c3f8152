// src/server/handlers.rs

//! The four request pipelines, as axum handlers.
//!
//! All pipelines share the same parameter handling: release names resolve
//! through the alias map, a missing `release`/`repo` (or diff's `old`/`new`)
//! is a 400, and an empty mirror list is a 204. The health and mirror
//! pipelines stream one line per mirror as each mirror completes.

use crate::diff::{self, DiffKey};
use crate::server::AppState;
use crate::{health, mirror};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::stream::{self, StreamExt};
use serde::Deserialize;
use std::convert::Infallible;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Root of the local mirror tree, relative to the working directory.
const PUB_ROOT: &str = "pub";

/// Query parameters shared by mirrorlist, repohealth and repomirror.
#[derive(Debug, Deserialize)]
pub struct RepoQuery {
    pub release: Option<String>,
    pub repo: Option<String>,
    pub arch: Option<String>,
}

/// Query parameters for repodiff.
#[derive(Debug, Deserialize)]
pub struct DiffQuery {
    pub old: Option<String>,
    pub new: Option<String>,
    pub repo: Option<String>,
    pub arch: Option<String>,
}

/// Compose the canonical mirror-repo URL for one mirror.
fn repo_url(mirror: &str, release: &str, repo: &str, arch: Option<&str>) -> String {
    match arch {
        Some(arch) => format!("{mirror}/{release}/{repo}/{arch}"),
        None => format!("{mirror}/{release}/{repo}"),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// GET `/` and GET `/mirrorlist`
///
/// Probe every configured mirror for `release/repo[/arch]` and answer with
/// the live ones, one URL per line, in configuration order.
pub async fn mirrorlist(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RepoQuery>,
) -> Response {
    let (release, repo) = match (non_empty(params.release), non_empty(params.repo)) {
        (Some(release), Some(repo)) => (release, repo),
        _ => {
            warn!("not enough parameters sent for mirrorlist request");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    if state.config.mirrors.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }

    let release = state.config.resolve_release(&release).to_string();
    let arch = non_empty(params.arch);

    let mut body = String::new();
    let mut found = 0usize;
    for mirror in &state.config.mirrors {
        let uri = repo_url(mirror, &release, &repo, arch.as_deref());
        if state.prober.check(&uri).await {
            body.push_str(&uri);
            body.push('\n');
            found += 1;
        } else {
            warn!(mirror = %mirror, release = %release, repo = %repo, "mirror does not have requested repo");
        }
    }

    let total = state.config.mirrors.len();
    if found > 0 {
        debug!(up = found, total, release = %release, repo = %repo, "sending mirrors");
        (
            StatusCode::OK,
            [
                (header::CACHE_CONTROL, "max-age=3600".to_string()),
                (
                    HeaderName::from_static("x-mirrors-found"),
                    format!("{found}/{total}"),
                ),
            ],
            body,
        )
            .into_response()
    } else {
        warn!(release = %release, repo = %repo, "no mirrors sent");
        StatusCode::NOT_FOUND.into_response()
    }
}

/// GET `/repodiff`
///
/// Diff the package catalogues of two releases, served from the process-wide
/// cache when one is already computed for this `(old, new, repo, arch)`.
pub async fn repodiff(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DiffQuery>,
) -> Response {
    let (old, new, repo) = match (
        non_empty(params.old),
        non_empty(params.new),
        non_empty(params.repo),
    ) {
        (Some(old), Some(new), Some(repo)) => (old, new, repo),
        _ => {
            warn!("not enough parameters sent for repodiff request");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    if state.config.mirrors.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }

    let old = state.config.resolve_release(&old).to_string();
    let new = state.config.resolve_release(&new).to_string();
    let arch = non_empty(params.arch);

    let key = DiffKey {
        old: old.clone(),
        new: new.clone(),
        repo: repo.clone(),
        arch: arch.clone().unwrap_or_default(),
    };

    let diff = match state.diff_cache.get(&key).await {
        Some(diff) => diff,
        None => {
            // Pick the first live mirror for each side, in config order. The
            // new side is only worth probing once the old side has a mirror.
            let mut old_mirror = None;
            for mirror in &state.config.mirrors {
                let uri = repo_url(mirror, &old, &repo, arch.as_deref());
                if state.prober.check(&uri).await {
                    old_mirror = Some(uri);
                    break;
                }
                warn!(mirror = %mirror, release = %old, repo = %repo, "mirror does not have requested repo");
            }

            let mut new_mirror = None;
            if old_mirror.is_some() {
                for mirror in &state.config.mirrors {
                    let uri = repo_url(mirror, &new, &repo, arch.as_deref());
                    if state.prober.check(&uri).await {
                        new_mirror = Some(uri);
                        break;
                    }
                    warn!(mirror = %mirror, release = %new, repo = %repo, "mirror does not have requested repo");
                }
            }

            match (old_mirror, new_mirror) {
                (Some(old_uri), Some(new_uri)) => {
                    info!(old = %old_uri, new = %new_uri, "diffing packages");
                    let diff = diff::diff_repositories(&state.client, &old_uri, &new_uri).await;
                    state.diff_cache.insert(key, diff.clone()).await;
                    diff
                }
                _ => {
                    warn!(old = %old, new = %new, repo = %repo, "not enough mirrors to diff packages");
                    return StatusCode::NOT_FOUND.into_response();
                }
            }
        }
    };

    let body = if diff.is_unchanged() {
        "no changes in packages\n".to_string()
    } else {
        format!(
            "added:\n\t{}\nchanged:\n\t{}\nremoved:\n\t{}\n",
            diff.added.join("\n\t"),
            diff.changed.join("\n\t"),
            diff.removed.join("\n\t"),
        )
    };

    (
        StatusCode::OK,
        [
            (header::CACHE_CONTROL, "max-age=86400".to_string()),
            (
                HeaderName::from_static("x-content-age"),
                diff.last_check.elapsed().as_secs().to_string(),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET `/repohealth`
///
/// Verify every package size on every configured mirror, streaming one
/// verdict line per mirror.
pub async fn repohealth(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RepoQuery>,
) -> Response {
    let (release, repo) = match (non_empty(params.release), non_empty(params.repo)) {
        (Some(release), Some(repo)) => (release, repo),
        _ => {
            warn!("not enough parameters sent for repohealth request");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    if state.config.mirrors.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }

    let release = state.config.resolve_release(&release).to_string();
    let arch = non_empty(params.arch);
    let mirrors = state.config.mirrors.clone();

    let lines = stream::iter(mirrors).then(move |mirror| {
        let state = state.clone();
        let release = release.clone();
        let repo = repo.clone();
        let arch = arch.clone();
        async move {
            let uri = repo_url(&mirror, &release, &repo, arch.as_deref());
            let line = match health::check_repository(
                &state.client,
                &uri,
                state.config.fetch_routines,
            )
            .await
            {
                Ok(report) if report.failed > 0 => {
                    warn!(uri = %uri, failed = report.failed, "some packages failed check");
                    format!("{uri} {} FAILED PACKAGES\n", report.failed)
                }
                Ok(_) => {
                    info!(uri = %uri, "all packages verified successfully");
                    format!("{uri} OK\n")
                }
                Err(e) => {
                    warn!(uri = %uri, error = %e, "unable to check health");
                    format!("{uri} NOT CHECKED\n")
                }
            };
            Ok::<_, Infallible>(line)
        }
    });

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(lines),
    )
        .into_response()
}

/// GET `/repomirror`
///
/// Download every package of `release/repo[/arch]` from each configured
/// mirror into the local `pub/` tree, streaming one verdict line per mirror.
pub async fn repomirror(
    State(state): State<Arc<AppState>>,
    Query(params): Query<RepoQuery>,
) -> Response {
    let (release, repo) = match (non_empty(params.release), non_empty(params.repo)) {
        (Some(release), Some(repo)) => (release, repo),
        _ => {
            warn!("not enough parameters sent for repomirror request");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    if state.config.mirrors.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }

    let release = state.config.resolve_release(&release).to_string();
    let arch = non_empty(params.arch);
    let mirrors = state.config.mirrors.clone();

    let lines = stream::iter(mirrors).then(move |mirror| {
        let state = state.clone();
        let release = release.clone();
        let repo = repo.clone();
        let arch = arch.clone();
        async move {
            let uri = repo_url(&mirror, &release, &repo, arch.as_deref());
            let prefix = match &arch {
                Some(arch) => format!("{release}/{repo}/{arch}"),
                None => format!("{release}/{repo}"),
            };
            let line = match mirror::mirror_repository(
                &state.client,
                &state.prober,
                Path::new(PUB_ROOT),
                &uri,
                &prefix,
                state.config.fetch_routines,
            )
            .await
            {
                Ok(report) if report.failed > 0 => {
                    warn!(uri = %uri, failed = report.failed, "some packages not mirrored");
                    format!("{uri} {} FAILED PACKAGES\n", report.failed)
                }
                Ok(_) => {
                    info!(uri = %uri, "all packages mirrored successfully");
                    format!("{uri} OK\n")
                }
                Err(e) => {
                    warn!(uri = %uri, error = %e, "unable to mirror repo");
                    format!("{uri} NOT MIRRORED\n")
                }
            };
            Ok::<_, Infallible>(line)
        }
    });

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(lines),
    )
        .into_response()
}
