// src/lib.rs

//! repoatlas - mirror-aware assistant for RPM-style package repositories
//!
//! Sits in front of a configured, ordered set of upstream mirror base URLs
//! and answers with fresh, cached views of their state:
//!
//! - `mirrorlist`: which mirrors currently serve a release/repo/arch
//! - `repodiff`: how packages differ between two releases
//! - `repohealth`: whether a mirror's repo is internally size-consistent
//! - `repomirror`: download a full repo into the local `pub/` tree
//!
//! # Architecture
//!
//! - One shared outbound HTTP client carrying TLS policy and proxying
//! - A liveness cache over mirror-repo URLs with a 60 s freshness window
//! - A streaming two-stage XML metadata decoder producing package catalogues
//! - A bounded-parallelism fan-out driving per-package HEAD/GET work

pub mod client;
pub mod config;
pub mod diff;
mod error;
pub mod fanout;
pub mod health;
pub mod mirror;
pub mod probe;
pub mod repodata;
pub mod server;

pub use config::Config;
pub use diff::{DiffCache, DiffKey, RepoDiff};
pub use error::{Error, Result};
pub use fanout::FanoutReport;
pub use probe::{MirrorHealth, MirrorProber};
pub use repodata::{Catalogue, PkgKey, PkgVer};
pub use server::{AppState, RequestStats};
