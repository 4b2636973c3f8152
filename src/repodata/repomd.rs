// src/repodata/repomd.rs

//! `repomd.xml` document structure.
//!
//! The top-level manifest of a repo's `repodata/` directory. Only the fields
//! the pipelines consume are modelled; everything else in the document is
//! ignored by the decoder.

use crate::error::{Error, Result};
use serde::Deserialize;

/// A parsed `repomd.xml` manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoMd {
    /// The `<data type="...">` entries naming the metadata files.
    #[serde(default, rename = "data")]
    pub data: Vec<RepoMdData>,
}

impl RepoMd {
    /// Parse a manifest from an XML string.
    pub fn from_xml(xml: &str) -> Result<Self> {
        serde_xml_rs::from_str(xml).map_err(|e| Error::Decode {
            url: "repomd.xml".to_string(),
            reason: e.to_string(),
        })
    }

    /// The first entry with `type == "primary"`, if any.
    pub fn primary(&self) -> Option<&RepoMdData> {
        self.data.iter().find(|d| d.data_type == "primary")
    }
}

/// A `<data>` element in a `repomd.xml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoMdData {
    /// The type of data (`primary`, `filelists`, `other`, ...).
    #[serde(rename = "type")]
    pub data_type: String,
    /// Where the file lives, relative to the repo root.
    pub location: Location,
}

/// The location of a metadata or package file.
#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub href: String,
}
