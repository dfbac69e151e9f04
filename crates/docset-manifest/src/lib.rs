//! Build configuration for docsets.
//!
//! This crate provides:
//! - Parsing and validation of `docset.toml` manifests
//! - Resolution of per-language inputs relative to the manifest

mod manifest;

pub use manifest::{DocsetSection, Manifest, ManifestError, SourceSection, MANIFEST_FILE};
