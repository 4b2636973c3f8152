// src/error.rs

//! Error types for the repoatlas core.
//!
//! Pipelines report failures per-mirror or per-package as strings; this enum
//! covers the failures that abort a whole operation.

use thiserror::Error;

/// Error type for this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unable to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("unable to decode {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("unable to find primary filelist in repomd.xml")]
    MissingPrimary,

    #[error("mirror is not answering: {0}")]
    MirrorUnavailable(String),

    #[error("no packages checked for {0}")]
    NoPackagesChecked(String),

    #[error("'pub' directory not set up correctly: {0}")]
    PubDirMissing(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
