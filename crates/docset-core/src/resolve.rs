//! Name resolution for symbols that live at an anchor inside a page
//!
//! Constants, settings and object properties have no page of their own and
//! their metadata rows carry no usable name. For these the builder selects
//! anchor rows from the metadata store, opens the page each anchor lives in
//! and recovers the name from the rendered markup.
//!
//! Every type owns an ordered chain of [`NameLookup`]s; the first lookup
//! returning a name wins. A candidate no lookup can name is dropped.

use std::collections::BTreeMap;

use crate::diagnostics::{BuildObserver, DropReason, Dropped};
use crate::document::{xpath_literal, Document, DocumentStore};
use crate::entry::{anchor_path, EntryType, IndexEntry};
use crate::metadata::{Column, Filter, MetadataRow, MetadataStore, StoreError};

/// An addressable location inside a rendered page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Element identifier, the fragment of the anchor's path
    pub id: String,
    /// Page the anchor lives in, without extension
    pub filename: String,
    /// Display name of the enclosing class, for scoped anchors
    pub scope: Option<String>,
}

impl Anchor {
    pub fn new(id: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            scope: None,
        }
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Document-relative locator, `page.html#id`
    pub fn path(&self) -> String {
        anchor_path(&self.filename, &self.id)
    }
}

/// One step of a name-resolution chain
pub type NameLookup = fn(&Document, &Anchor) -> Option<String>;

/// Text of the first code span under the anchor element
pub fn code_span(document: &Document, anchor: &Anchor) -> Option<String> {
    document.text(&format!(
        "(//*[@id={}]//code)[1]",
        xpath_literal(&anchor.id)
    ))
}

/// Text of the first link, in document order, targeting the anchor
pub fn link_text(document: &Document, anchor: &Anchor) -> Option<String> {
    document.text(&format!(
        "(//a[@href={} or @href={}])[1]",
        xpath_literal(&anchor.path()),
        xpath_literal(&format!("#{}", anchor.id)),
    ))
}

/// `Scope::name` from the first variable-name span under the anchor element
pub fn scoped_varname(document: &Document, anchor: &Anchor) -> Option<String> {
    let scope = anchor.scope.as_deref()?;
    let name = document.text(&format!(
        "(//*[@id={}]//*[contains(concat(' ', normalize-space(@class), ' '), ' varname ')])[1]",
        xpath_literal(&anchor.id)
    ))?;
    Some(format!("{scope}::{name}"))
}

/// How anchors of one entry type are selected and named
#[derive(Clone, Copy)]
pub struct AnchorRule {
    pub kind: EntryType,
    /// Selects the anchor rows from the metadata store
    pub filter: Filter<'static>,
    /// Whether anchors are named relative to their page's class
    pub scoped: bool,
    /// Name-resolution chain, tried in order
    pub lookups: &'static [NameLookup],
}

/// Anchor rules for constants, settings and properties
pub static ANCHOR_RULES: [AnchorRule; 3] = [
    AnchorRule {
        kind: EntryType::Constant,
        filter: Filter::Any(&[
            Filter::Like(Column::DocbookId, "constant.%"),
            Filter::Like(Column::DocbookId, "%.constant.%"),
            Filter::Like(Column::DocbookId, "%.constants.%"),
        ]),
        scoped: false,
        lookups: &[code_span],
    },
    AnchorRule {
        kind: EntryType::Setting,
        filter: Filter::Like(Column::DocbookId, "ini.%"),
        scoped: false,
        lookups: &[link_text, code_span],
    },
    AnchorRule {
        kind: EntryType::Property,
        filter: Filter::All(&[
            Filter::Like(Column::DocbookId, "%.props.%"),
            Filter::Like(Column::Filename, "class.%"),
        ]),
        scoped: true,
        lookups: &[scoped_varname],
    },
];

/// The anchor rule for `kind`, if that type is resolved from anchors
pub fn anchor_rule(kind: EntryType) -> Option<&'static AnchorRule> {
    ANCHOR_RULES.iter().find(|rule| rule.kind == kind)
}

impl AnchorRule {
    /// Select this rule's anchors and resolve their names.
    ///
    /// Only a failing selection query is an error; every per-anchor miss is
    /// reported to `observer` and skipped.
    pub fn resolve<S>(
        &self,
        store: &S,
        documents: &DocumentStore,
        observer: &dyn BuildObserver,
    ) -> Result<Vec<IndexEntry>, StoreError>
    where
        S: MetadataStore + ?Sized,
    {
        let rows = store.select(&self.filter)?;

        let mut pages: BTreeMap<&str, Vec<&MetadataRow>> = BTreeMap::new();
        for row in rows.iter().filter(|row| !row.docbook_id.is_empty()) {
            pages.entry(row.filename.as_str()).or_default().push(row);
        }

        let mut entries = Vec::new();
        for (filename, rows) in pages {
            let drop_all = |reason| {
                for row in &rows {
                    observer.dropped(&Dropped {
                        kind: self.kind,
                        identifier: &row.docbook_id,
                        filename,
                        reason,
                    });
                }
            };

            if !documents.exists(filename) {
                drop_all(DropReason::MissingDocument);
                continue;
            }

            let scope = if self.scoped {
                match store.page_title(filename)? {
                    Some(scope) => Some(scope),
                    None => {
                        drop_all(DropReason::MissingScope);
                        continue;
                    }
                }
            } else {
                None
            };

            let document = match documents.load(filename) {
                Ok(document) => document,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable document");
                    drop_all(DropReason::UnreadableDocument);
                    continue;
                }
            };

            for row in &rows {
                let mut anchor = Anchor::new(row.docbook_id.as_str(), filename);
                if let Some(scope) = &scope {
                    anchor = anchor.with_scope(scope.as_str());
                }

                match self.lookups.iter().find_map(|lookup| lookup(&document, &anchor)) {
                    Some(name) => entries.push(IndexEntry::new(name, self.kind, anchor.path())),
                    None => observer.dropped(&Dropped {
                        kind: self.kind,
                        identifier: &row.docbook_id,
                        filename,
                        reason: DropReason::UnresolvedName,
                    }),
                }
            }
        }

        Ok(entries)
    }
}
