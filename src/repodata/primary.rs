// src/repodata/primary.rs

//! `primary.xml` document structure.
//!
//! The package list referenced from `repomd.xml` under `type="primary"`.
//! Primary listings for large repos run to hundreds of megabytes
//! decompressed, so parsing always happens from a reader; the decoder never
//! materialises the whole document as a string.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::io::Read;

/// A parsed `primary.xml` package listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Primary {
    /// `<package>` elements in this document.
    #[serde(default, rename = "package")]
    pub packages: Vec<Package>,
}

impl Primary {
    /// Parse a listing by streaming XML from a reader.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        serde_xml_rs::from_reader(reader).map_err(|e| Error::Decode {
            url: "primary.xml".to_string(),
            reason: e.to_string(),
        })
    }

    /// Parse a listing from an XML string. Test and tooling convenience.
    pub fn from_xml(xml: &str) -> Result<Self> {
        Self::from_reader(xml.as_bytes())
    }
}

/// A package as advertised in a `primary.xml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    /// The name of the package.
    pub name: String,

    /// The machine architecture the package targets.
    pub arch: String,

    /// The package version.
    pub version: PackageVersion,

    /// Build and file timestamps.
    pub time: PackageTime,

    /// Declared sizes.
    pub size: PackageSize,

    /// Where the package file lives, relative to the repo root.
    pub location: super::repomd::Location,
}

/// Describes a package version.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageVersion {
    /// When the version came into existence.
    #[serde(default)]
    pub epoch: u64,

    /// Version string.
    #[serde(rename = "ver")]
    pub version: String,

    /// Release string.
    #[serde(rename = "rel")]
    pub release: String,
}

/// Times associated with a package.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageTime {
    #[serde(default)]
    pub file: u64,
    #[serde(default)]
    pub build: u64,
}

/// Sizes associated with a package. Only the on-the-wire package size is
/// consumed; installed and archive sizes are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct PackageSize {
    pub package: u64,
}
