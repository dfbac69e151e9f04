//! Read-only access to the renderer's symbol metadata table
//!
//! The documentation renderer emits one row per addressable element of the
//! manual: standalone pages (chunks) and inline fragments alike. The builder
//! never writes to this table; it only selects rows with [`Filter`]s.

mod filter;
mod memory;
mod sqlite;

use std::path::PathBuf;

use thiserror::Error;

pub use filter::{like, Column, Filter};
pub use memory::InMemoryMetadataStore;
pub use sqlite::{is_valid_table_name, SqliteMetadataStore, DEFAULT_TABLE};

/// A single row of renderer metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRow {
    /// Row identifier
    pub id: i64,
    /// Structured identifier, also the `id` attribute of the rendered element
    pub docbook_id: String,
    /// Identifier of the enclosing element
    pub parent_id: Option<String>,
    /// Structural element tag (`refentry`, `classref`, `set`, ...)
    pub element: String,
    /// Whether the row is a standalone output page
    pub chunk: bool,
    /// Output filename without extension
    pub filename: String,
    /// Short description
    pub sdesc: String,
    /// Long description
    pub ldesc: String,
}

impl MetadataRow {
    /// The row's display name: the short description when present, the
    /// long description otherwise. `None` when both are blank.
    pub fn display_name(&self) -> Option<&str> {
        [self.sdesc.trim(), self.ldesc.trim()]
            .into_iter()
            .find(|name| !name.is_empty())
    }
}

/// Errors raised by a metadata store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to open metadata database '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("invalid metadata table name '{0}'")]
    InvalidTable(String),

    #[error("metadata query on '{table}' failed: {source}")]
    Query {
        table: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("metadata store lock poisoned")]
    Poisoned,
}

/// Read-only view over metadata rows.
///
/// Implementations must be shareable across the builder's parallel
/// extraction jobs.
pub trait MetadataStore: Sync {
    /// All rows matching `filter`, in row order
    fn select(&self, filter: &Filter<'_>) -> Result<Vec<MetadataRow>, StoreError>;

    /// The display name of the standalone page written to `filename`
    fn page_title(&self, filename: &str) -> Result<Option<String>, StoreError> {
        let parts = [Filter::Eq(Column::Filename, filename), Filter::Chunk(true)];
        let rows = self.select(&Filter::All(&parts))?;
        Ok(rows
            .iter()
            .map(|row| row.sdesc.trim())
            .find(|title| !title.is_empty())
            .map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sdesc: &str, ldesc: &str) -> MetadataRow {
        MetadataRow {
            id: 1,
            docbook_id: "function.strlen".to_string(),
            parent_id: None,
            element: "refentry".to_string(),
            chunk: true,
            filename: "function.strlen".to_string(),
            sdesc: sdesc.to_string(),
            ldesc: ldesc.to_string(),
        }
    }

    #[test]
    fn test_display_name_prefers_short_description() {
        assert_eq!(row("strlen", "Get string length").display_name(), Some("strlen"));
        assert_eq!(row("", "Get string length").display_name(), Some("Get string length"));
        assert_eq!(row("  ", " \n").display_name(), None);
    }
}
