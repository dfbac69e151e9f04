//! Docset Core - search-index builder for rendered manuals
//!
//! This crate provides the core functionality:
//! - Metadata: read-only access to the renderer's symbol metadata table
//! - Rules: classification of metadata rows into typed index entries
//! - Resolve: name recovery for anchored symbols from rendered pages
//! - Index: the deduplicated `searchIndex` table and its single writer
//! - Docset: bundle layout, `Info.plist` and staging of complete docsets

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Index entry types
pub mod entry;

/// Metadata store access and structured filters
pub mod metadata;

/// Rendered pages and structural lookups
pub mod document;

/// Classification rules
pub mod rules;

/// Anchor name resolution
pub mod resolve;

/// Field escaping for the index load script
pub mod escape;

/// Search index writer
pub mod index;

/// Drop observation
pub mod diagnostics;

/// Builder combining every extraction job
pub mod builder;

/// Docset bundle assembly
pub mod docset;

pub use builder::{BuildError, BuildSummary, Extraction, IndexBuilder};
pub use diagnostics::{BuildObserver, DropLog, DropReason, Dropped};
pub use docset::{build_docset, BundleInfo, DocsetError, DocsetLayout, DocsetReport, LanguageSource};
pub use document::{Document, DocumentError, DocumentStore};
pub use entry::{EntryType, IndexEntry};
pub use escape::escape;
pub use index::{IndexError, IndexWriter, LoadSummary, INDEX_FILE};
pub use metadata::{
    Column, Filter, InMemoryMetadataStore, MetadataRow, MetadataStore, SqliteMetadataStore,
    StoreError,
};
