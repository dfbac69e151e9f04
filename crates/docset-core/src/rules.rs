//! Classification of metadata rows into index entries
//!
//! Pages whose names are already present in the metadata are classified by
//! a fixed list of `(type, filter)` rules. Rules are independent: a row can
//! satisfy several of them and yield one entry per rule. Every entry points
//! at the row's page, never at an anchor.

use crate::diagnostics::{BuildObserver, DropReason, Dropped};
use crate::document::DocumentStore;
use crate::entry::{page_path, EntryType, IndexEntry};
use crate::metadata::{Column, Filter, MetadataStore, StoreError};

/// A classification rule
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub kind: EntryType,
    pub filter: Filter<'static>,
}

const CONTROL_STRUCTURES: &str = "language.control-structures";
const ALTERNATIVE_SYNTAX: &str = "control-structures.alternative-syntax";

/// The classification rules, in evaluation order
pub static RULES: [Rule; 16] = [
    Rule {
        kind: EntryType::Interface,
        filter: Filter::All(&[
            Filter::Eq(Column::Element, "classref"),
            Filter::Chunk(true),
            Filter::Like(Column::LongDesc, "%interface%"),
        ]),
    },
    Rule {
        kind: EntryType::Enum,
        filter: Filter::All(&[
            Filter::Eq(Column::Element, "classref"),
            Filter::Chunk(true),
            Filter::Like(Column::Filename, "enum.%"),
        ]),
    },
    Rule {
        kind: EntryType::Class,
        filter: Filter::All(&[
            Filter::Eq(Column::Element, "classref"),
            Filter::Chunk(true),
            Filter::Like(Column::Filename, "class.%"),
            Filter::Not(&Filter::Like(Column::LongDesc, "%interface%")),
            Filter::Not(&Filter::Like(Column::ShortDesc, "%Exception")),
            Filter::Not(&Filter::Like(Column::ShortDesc, "%Error")),
        ]),
    },
    Rule {
        kind: EntryType::Exception,
        filter: Filter::All(&[
            Filter::Eq(Column::Element, "classref"),
            Filter::Chunk(true),
            Filter::Any(&[
                Filter::Like(Column::ShortDesc, "%Exception"),
                Filter::Like(Column::ShortDesc, "%Error"),
            ]),
        ]),
    },
    Rule {
        kind: EntryType::Method,
        filter: Filter::All(&[
            Filter::Eq(Column::Element, "refentry"),
            Filter::Like(Column::ShortDesc, "%::%"),
        ]),
    },
    Rule {
        kind: EntryType::Function,
        filter: Filter::All(&[
            Filter::Eq(Column::Element, "refentry"),
            Filter::Not(&Filter::Like(Column::ShortDesc, "%::%")),
        ]),
    },
    Rule {
        kind: EntryType::Keyword,
        filter: Filter::All(&[
            Filter::Chunk(true),
            Filter::Like(Column::Filename, "control-structures.%"),
            Filter::Not(&Filter::Eq(Column::Filename, ALTERNATIVE_SYNTAX)),
        ]),
    },
    Rule {
        kind: EntryType::Keyword,
        filter: Filter::All(&[
            Filter::Chunk(true),
            Filter::Eq(Column::ParentId, CONTROL_STRUCTURES),
            Filter::Not(&Filter::Like(Column::Filename, "control-structures.%")),
        ]),
    },
    Rule {
        kind: EntryType::Variable,
        filter: Filter::All(&[
            Filter::Chunk(true),
            Filter::Eq(Column::ParentId, "reserved.variables"),
        ]),
    },
    Rule {
        kind: EntryType::Type,
        filter: Filter::All(&[
            Filter::Chunk(true),
            Filter::Eq(Column::ParentId, "language.types"),
        ]),
    },
    Rule {
        kind: EntryType::Operator,
        filter: Filter::All(&[
            Filter::Chunk(true),
            Filter::Eq(Column::ParentId, "language.operators"),
        ]),
    },
    Rule {
        kind: EntryType::Extension,
        filter: Filter::All(&[
            Filter::Eq(Column::Element, "set"),
            Filter::Chunk(true),
            Filter::Like(Column::Filename, "refs.%"),
        ]),
    },
    Rule {
        kind: EntryType::Extension,
        filter: Filter::All(&[
            Filter::Eq(Column::Element, "book"),
            Filter::Chunk(true),
            Filter::Not(&Filter::Eq(Column::Filename, "index")),
        ]),
    },
    Rule {
        kind: EntryType::Guide,
        filter: Filter::All(&[
            Filter::Chunk(true),
            Filter::Eq(Column::Filename, ALTERNATIVE_SYNTAX),
        ]),
    },
    Rule {
        kind: EntryType::Guide,
        filter: Filter::All(&[
            Filter::Chunk(true),
            Filter::Eq(Column::ParentId, "reserved"),
        ]),
    },
    Rule {
        kind: EntryType::Guide,
        filter: Filter::All(&[
            Filter::Chunk(true),
            Filter::Like(Column::Filename, "language.%"),
            Filter::Not(&Filter::Eq(Column::ParentId, "language.types")),
            Filter::Not(&Filter::Eq(Column::ParentId, "language.operators")),
        ]),
    },
];

impl Rule {
    /// Entries for every row this rule selects.
    ///
    /// Rows without a name or without a rendered page are reported to
    /// `observer` and skipped.
    pub fn apply<S>(
        &self,
        store: &S,
        documents: &DocumentStore,
        observer: &dyn BuildObserver,
    ) -> Result<Vec<IndexEntry>, StoreError>
    where
        S: MetadataStore + ?Sized,
    {
        let rows = store.select(&self.filter)?;
        let mut entries = Vec::with_capacity(rows.len());

        for row in &rows {
            let reason = if !documents.exists(&row.filename) {
                DropReason::MissingDocument
            } else if let Some(name) = row.display_name() {
                entries.push(IndexEntry::new(name, self.kind, page_path(&row.filename)));
                continue;
            } else {
                DropReason::UnresolvedName
            };

            observer.dropped(&Dropped {
                kind: self.kind,
                identifier: &row.docbook_id,
                filename: &row.filename,
                reason,
            });
        }

        Ok(entries)
    }
}

/// Apply every rule in order.
///
/// A failing query aborts classification; nothing from earlier rules is
/// returned in that case.
pub fn classify<S>(
    store: &S,
    documents: &DocumentStore,
    observer: &dyn BuildObserver,
) -> Result<Vec<IndexEntry>, StoreError>
where
    S: MetadataStore + ?Sized,
{
    let mut entries = Vec::new();
    for rule in &RULES {
        let found = rule.apply(store, documents, observer)?;
        tracing::trace!(kind = %rule.kind, count = found.len(), "applied classification rule");
        entries.extend(found);
    }
    Ok(entries)
}
