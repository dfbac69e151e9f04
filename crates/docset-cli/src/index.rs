//! Implementation of the `docset index` command.

use anyhow::{Context, Result};
use docset_core::{DocumentStore, DropLog, IndexBuilder, IndexWriter, SqliteMetadataStore};
use std::path::PathBuf;

/// Options for the index command.
#[derive(Debug)]
pub struct IndexOptions {
    pub metadata: PathBuf,
    pub documents: PathBuf,
    /// Index file; replaced only if the build succeeds.
    pub output: PathBuf,
    pub table: String,
    pub verbose: bool,
}

/// Build a standalone search index.
pub fn build_index(options: IndexOptions) -> Result<()> {
    let store = SqliteMetadataStore::open(&options.metadata, &options.table)
        .with_context(|| format!("Failed to open '{}'", options.metadata.display()))?;
    if !options.documents.is_dir() {
        anyhow::bail!("Documents directory '{}' not found", options.documents.display());
    }
    let documents = DocumentStore::new(&options.documents);

    let log = DropLog::new(options.verbose);
    let mut writer = IndexWriter::create(&options.output)
        .with_context(|| format!("Failed to create '{}'", options.output.display()))?;
    let summary = IndexBuilder::new(&store, &documents)
        .with_observer(&log)
        .build(&mut writer)
        .context("Failed to build search index")?;
    writer
        .finish()
        .with_context(|| format!("Failed to write '{}'", options.output.display()))?;

    println!(
        "Wrote {} entries to {} ({} candidates, {} dropped)",
        summary.load.inserted,
        options.output.display(),
        summary.load.candidates,
        log.total()
    );
    for (kind, count) in &summary.candidates {
        println!("  {kind:<10} {count}");
    }

    Ok(())
}
