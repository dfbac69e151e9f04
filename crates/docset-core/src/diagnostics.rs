//! Observation of candidates dropped during a build
//!
//! Dropping a candidate is never an error: the builder reports every drop
//! decision to a [`BuildObserver`] and carries on.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Mutex;

use crate::entry::EntryType;

/// Why a candidate did not make it into the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DropReason {
    /// The target page is not in the document store
    MissingDocument,
    /// The target page exists but could not be read or parsed
    UnreadableDocument,
    /// No lookup produced a non-empty name
    UnresolvedName,
    /// A property's enclosing class has no display name
    MissingScope,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingDocument => "missing document",
            DropReason::UnreadableDocument => "unreadable document",
            DropReason::UnresolvedName => "unresolved name",
            DropReason::MissingScope => "missing class name",
        }
    }
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dropped candidate as reported to observers
#[derive(Debug, Clone, Copy)]
pub struct Dropped<'a> {
    pub kind: EntryType,
    /// Metadata identifier of the row that produced the candidate
    pub identifier: &'a str,
    /// Page the candidate pointed into
    pub filename: &'a str,
    pub reason: DropReason,
}

/// Receives every drop decision made during a build.
///
/// Observers are shared by the parallel extraction jobs.
pub trait BuildObserver: Sync {
    fn dropped(&self, candidate: &Dropped<'_>);
}

/// Ignores everything
impl BuildObserver for () {
    fn dropped(&self, _candidate: &Dropped<'_>) {}
}

/// Counts drops per type and reason, optionally logging each one
#[derive(Debug, Default)]
pub struct DropLog {
    verbose: bool,
    counts: Mutex<BTreeMap<(EntryType, DropReason), usize>>,
}

impl DropLog {
    pub fn new(verbose: bool) -> Self {
        Self {
            verbose,
            counts: Mutex::default(),
        }
    }

    /// Total number of dropped candidates
    pub fn total(&self) -> usize {
        self.snapshot().values().sum()
    }

    /// Number of drops for one reason, across all types
    pub fn count(&self, reason: DropReason) -> usize {
        self.snapshot()
            .iter()
            .filter(|((_, r), _)| *r == reason)
            .map(|(_, n)| n)
            .sum()
    }

    /// Drop counts keyed by type and reason
    pub fn snapshot(&self) -> BTreeMap<(EntryType, DropReason), usize> {
        match self.counts.lock() {
            Ok(counts) => counts.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl BuildObserver for DropLog {
    fn dropped(&self, candidate: &Dropped<'_>) {
        if self.verbose {
            tracing::info!(
                kind = %candidate.kind,
                id = candidate.identifier,
                document = candidate.filename,
                reason = %candidate.reason,
                "skipped index candidate"
            );
        }

        let mut counts = match self.counts.lock() {
            Ok(counts) => counts,
            Err(poisoned) => poisoned.into_inner(),
        };
        *counts.entry((candidate.kind, candidate.reason)).or_default() += 1;
    }
}
