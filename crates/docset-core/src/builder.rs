//! Search-index builder
//!
//! Candidates come from four independent extraction jobs: the
//! classification rules and one anchor resolver per anchored type. The jobs
//! only read the metadata and document stores, so they run in parallel;
//! their results are merged in a fixed order and funneled through a single
//! [`IndexWriter`].

use std::collections::BTreeMap;

use rayon::prelude::*;
use thiserror::Error;

use crate::diagnostics::BuildObserver;
use crate::document::DocumentStore;
use crate::entry::{EntryType, IndexEntry};
use crate::index::{IndexError, IndexWriter, LoadSummary};
use crate::metadata::{MetadataStore, StoreError};
use crate::resolve::anchor_rule;
use crate::rules::classify;

/// Errors that abort a build
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// One independent source of index candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Pages named by the metadata itself
    Classification,
    /// Anchors of one type, named from rendered markup
    Anchors(EntryType),
}

/// Every extraction job of a build, in merge order
pub const EXTRACTIONS: [Extraction; 4] = [
    Extraction::Classification,
    Extraction::Anchors(EntryType::Constant),
    Extraction::Anchors(EntryType::Setting),
    Extraction::Anchors(EntryType::Property),
];

/// Result of a completed build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub load: LoadSummary,
    /// Candidates produced per entry type, before deduplication
    pub candidates: BTreeMap<EntryType, usize>,
}

/// Builds a search index from a metadata store and its rendered pages
pub struct IndexBuilder<'a, S: ?Sized> {
    store: &'a S,
    documents: &'a DocumentStore,
    observer: &'a dyn BuildObserver,
}

impl<'a, S> IndexBuilder<'a, S>
where
    S: MetadataStore + ?Sized,
{
    pub fn new(store: &'a S, documents: &'a DocumentStore) -> Self {
        Self {
            store,
            documents,
            observer: &(),
        }
    }

    /// Report dropped candidates to `observer`
    pub fn with_observer(mut self, observer: &'a dyn BuildObserver) -> Self {
        self.observer = observer;
        self
    }

    /// Run a single extraction job
    pub fn extract(&self, extraction: Extraction) -> Result<Vec<IndexEntry>, StoreError> {
        let entries = match extraction {
            Extraction::Classification => classify(self.store, self.documents, self.observer)?,
            Extraction::Anchors(kind) => match anchor_rule(kind) {
                Some(rule) => rule.resolve(self.store, self.documents, self.observer)?,
                None => Vec::new(),
            },
        };
        tracing::debug!(?extraction, count = entries.len(), "extracted index candidates");
        Ok(entries)
    }

    /// All candidates, in job order.
    ///
    /// The result may contain duplicates; they collapse when loaded.
    pub fn collect(&self) -> Result<Vec<IndexEntry>, StoreError> {
        let batches = EXTRACTIONS
            .par_iter()
            .map(|&extraction| self.extract(extraction))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// Collect every candidate and load them into `writer`
    pub fn build(&self, writer: &mut IndexWriter) -> Result<BuildSummary, BuildError> {
        let entries = self.collect()?;

        let mut candidates = BTreeMap::new();
        for entry in &entries {
            *candidates.entry(entry.kind).or_insert(0) += 1;
        }

        let load = writer.load(&entries)?;
        Ok(BuildSummary { load, candidates })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DropLog, DropReason};
    use crate::metadata::{InMemoryMetadataStore, MetadataRow};

    fn row(docbook_id: &str, element: &str, chunk: bool, filename: &str, sdesc: &str) -> MetadataRow {
        MetadataRow {
            id: 0,
            docbook_id: docbook_id.to_string(),
            parent_id: None,
            element: element.to_string(),
            chunk,
            filename: filename.to_string(),
            sdesc: sdesc.to_string(),
            ldesc: String::new(),
        }
    }

    #[test]
    fn test_builder_merges_all_jobs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("function.strlen.html"), "<html/>").unwrap();
        std::fs::write(
            dir.path().join("errorfunc.constants.html"),
            r#"<html><body><dt id="constant.e-all"><code>E_ALL</code></dt></body></html>"#,
        )
        .unwrap();
        let documents = DocumentStore::new(dir.path());

        let store: InMemoryMetadataStore = [
            row("function.strlen", "refentry", true, "function.strlen", "strlen"),
            row("constant.e-all", "varlistentry", false, "errorfunc.constants", ""),
            row("constant.e-strict", "varlistentry", false, "errorfunc.gone", ""),
        ]
        .into_iter()
        .collect();

        let log = DropLog::new(false);
        let builder = IndexBuilder::new(&store, &documents).with_observer(&log);
        let mut writer = IndexWriter::in_memory().unwrap();
        let summary = builder.build(&mut writer).unwrap();

        assert_eq!(summary.load.inserted, 2);
        assert_eq!(summary.candidates.get(&EntryType::Function), Some(&1));
        assert_eq!(summary.candidates.get(&EntryType::Constant), Some(&1));
        assert_eq!(
            writer.entries().unwrap(),
            vec![
                IndexEntry::new("strlen", EntryType::Function, "function.strlen.html"),
                IndexEntry::new("E_ALL", EntryType::Constant, "errorfunc.constants.html#constant.e-all"),
            ]
        );
        assert_eq!(log.count(DropReason::MissingDocument), 1);
    }

    #[test]
    fn test_extract_unanchored_type_is_empty() {
        let documents = DocumentStore::new("/nonexistent");
        let store = InMemoryMetadataStore::default();
        let builder = IndexBuilder::new(&store, &documents);
        assert!(builder
            .extract(Extraction::Anchors(EntryType::Function))
            .unwrap()
            .is_empty());
    }
}
