// src/config.rs

//! Startup configuration from environment variables and well-known files.
//!
//! Everything here is read once at startup and immutable afterwards:
//! - `REPO_MIRRORS` - comma-separated mirror base URLs (ordered)
//! - `RELEASE_ALIASES` - comma-separated `name=canonical` pairs
//! - `FETCH_ROUTINES` - bounded fan-out concurrency (default 16)
//! - `DEBUG` / `INSECURE_SKIP_VERIFY` - truthy flags
//! - `HTTP_PROXY` - optional forward proxy URL
//!
//! The working directory is probed for optional keypairs (`cert.pem` +
//! `key.pem` for the TLS listener, `client-cert.pem` + `client-key.pem` for
//! upstream client auth) and for a `pub` directory that enables both the
//! static file server and the mirror pipeline's download target.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default number of concurrent per-package fetch routines.
const DEFAULT_FETCH_ROUTINES: usize = 16;

/// Process-wide configuration, immutable after startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Mirror base URLs in declaration order (trailing slashes stripped).
    pub mirrors: Vec<String>,
    /// Caller-facing release name to canonical release name.
    pub aliases: HashMap<String, String>,
    /// Bounded concurrency for per-package fan-outs.
    pub fetch_routines: usize,
    /// Skip TLS verification of upstream mirrors.
    pub insecure_skip_verify: bool,
    /// Forward proxy for outbound traffic, if any.
    pub http_proxy: Option<String>,
    /// Debug logging requested.
    pub debug: bool,
    /// Server TLS keypair (`cert.pem`, `key.pem`), if both exist.
    pub tls_keypair: Option<(PathBuf, PathBuf)>,
    /// Client TLS keypair for upstream auth, if both exist.
    pub client_keypair: Option<(PathBuf, PathBuf)>,
    /// Local `pub` directory, if present at startup.
    pub pub_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the environment and the working directory.
    ///
    /// A malformed `RELEASE_ALIASES` entry is fatal; everything else degrades
    /// with a warning.
    pub fn from_env() -> Result<Self> {
        let mirrors = match std::env::var("REPO_MIRRORS") {
            Ok(v) => parse_mirrors(&v),
            Err(_) => {
                warn!(
                    "no repository mirrors specified in REPO_MIRRORS \
                     environment variable, replies will be status 204"
                );
                Vec::new()
            }
        };

        let aliases = match std::env::var("RELEASE_ALIASES") {
            Ok(v) => parse_aliases(&v)?,
            Err(_) => {
                warn!("no release aliases specified in RELEASE_ALIASES environment variable");
                HashMap::new()
            }
        };

        let fetch_routines = match std::env::var("FETCH_ROUTINES") {
            Ok(v) => match v.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(value = %v, "could not parse FETCH_ROUTINES, keeping default");
                    DEFAULT_FETCH_ROUTINES
                }
            },
            Err(_) => DEFAULT_FETCH_ROUTINES,
        };

        Ok(Self {
            mirrors,
            aliases,
            fetch_routines,
            insecure_skip_verify: env_truthy("INSECURE_SKIP_VERIFY"),
            http_proxy: std::env::var("HTTP_PROXY").ok(),
            debug: env_truthy("DEBUG"),
            tls_keypair: keypair_if_present("cert.pem", "key.pem"),
            client_keypair: keypair_if_present("client-cert.pem", "client-key.pem"),
            pub_dir: dir_if_present("pub"),
        })
    }

    /// Resolve a caller-facing release name through the alias map.
    ///
    /// Missing keys pass through unchanged.
    pub fn resolve_release<'a>(&'a self, release: &'a str) -> &'a str {
        self.aliases.get(release).map(String::as_str).unwrap_or(release)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mirrors: Vec::new(),
            aliases: HashMap::new(),
            fetch_routines: DEFAULT_FETCH_ROUTINES,
            insecure_skip_verify: false,
            http_proxy: None,
            debug: false,
            tls_keypair: None,
            client_keypair: None,
            pub_dir: None,
        }
    }
}

/// Split and normalise the mirror list: trim whitespace, strip trailing
/// slashes, drop empty entries.
pub fn parse_mirrors(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|m| m.trim().trim_end_matches('/').to_string())
        .filter(|m| !m.is_empty())
        .collect()
}

/// Parse `name=canonical` alias pairs. Malformed entries are fatal.
pub fn parse_aliases(raw: &str) -> Result<HashMap<String, String>> {
    let mut aliases = HashMap::new();
    for entry in raw.split(',') {
        let entry = entry.trim();
        let mut parts = entry.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(name), Some(canonical)) if !name.is_empty() && !canonical.is_empty() => {
                aliases.insert(name.to_string(), canonical.to_string());
            }
            _ => {
                return Err(Error::Config(format!(
                    "could not parse release alias '{entry}'"
                )));
            }
        }
    }
    Ok(aliases)
}

/// Truthiness rule for flag variables: any value other than `0`, `no` or
/// `false` (case-insensitive) enables the flag.
pub fn truthy(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "0" | "no" | "false")
}

/// Whether a flag environment variable is set and truthy.
pub fn env_truthy(name: &str) -> bool {
    std::env::var(name).map(|v| truthy(&v)).unwrap_or(false)
}

fn keypair_if_present(cert: &str, key: &str) -> Option<(PathBuf, PathBuf)> {
    let cert = PathBuf::from(cert);
    let key = PathBuf::from(key);
    if cert.is_file() && key.is_file() {
        Some((cert, key))
    } else {
        None
    }
}

fn dir_if_present(name: &str) -> Option<PathBuf> {
    let path = Path::new(name);
    if path.is_dir() {
        Some(path.to_path_buf())
    } else {
        None
    }
}
