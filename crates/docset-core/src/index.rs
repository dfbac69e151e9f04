//! The persisted search index
//!
//! Entries are written to a `searchIndex` table with a unique index over
//! `(name, type, path)`. All candidates of a build are loaded in one
//! transaction with insert-or-ignore semantics, so colliding candidates
//! collapse to the first one loaded.
//!
//! An on-disk index is assembled in a temporary file next to its
//! destination and only moved into place by [`IndexWriter::finish`]. A
//! writer dropped before that leaves nothing behind.

use std::path::{Path, PathBuf};

use rusqlite::Connection;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::entry::{EntryType, IndexEntry};
use crate::escape::escape;

/// Name of the index file inside a docset's resources
pub const INDEX_FILE: &str = "docSet.dsidx";

const SCHEMA: &str = "
    CREATE TABLE searchIndex(id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, type TEXT, path TEXT);
    CREATE UNIQUE INDEX anchor ON searchIndex (name, type, path);
";

/// Errors raised while writing the index
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("failed to create index file in '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to move index into place at '{path}': {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("index contains unknown entry type '{0}'")]
    UnknownType(String),
}

/// Outcome of a bulk load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadSummary {
    /// Candidates handed to the writer
    pub candidates: usize,
    /// Rows actually added; the rest were duplicates
    pub inserted: usize,
}

enum Target {
    Memory,
    File {
        temp: NamedTempFile,
        destination: PathBuf,
    },
}

/// Single write path into a search index
pub struct IndexWriter {
    conn: Connection,
    target: Target,
}

impl IndexWriter {
    /// An index that lives only as long as the writer
    pub fn in_memory() -> Result<Self, IndexError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            target: Target::Memory,
        })
    }

    /// Start a fresh index that [`finish`](Self::finish) moves to `destination`
    pub fn create(destination: impl AsRef<Path>) -> Result<Self, IndexError> {
        let destination = destination.as_ref().to_path_buf();
        let dir = match destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let temp = tempfile::Builder::new()
            .prefix(".searchindex")
            .suffix(".tmp")
            .tempfile_in(&dir)
            .map_err(|source| IndexError::Create { path: dir, source })?;

        let conn = Connection::open(temp.path())?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn,
            target: Target::File { temp, destination },
        })
    }

    /// Load candidates atomically.
    ///
    /// Either every candidate is visible afterwards (duplicates collapsed)
    /// or, on error, none of them are.
    pub fn load(&mut self, entries: &[IndexEntry]) -> Result<LoadSummary, IndexError> {
        let before = self.len()?;

        let tx = self.conn.transaction()?;
        tx.execute_batch(&load_script(entries))?;
        tx.commit()?;

        Ok(LoadSummary {
            candidates: entries.len(),
            inserted: self.len()? - before,
        })
    }

    /// Number of rows in the index
    fn len(&self) -> Result<usize, IndexError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM searchIndex", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// All rows, in insertion order
    pub fn entries(&self) -> Result<Vec<IndexEntry>, IndexError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, type, path FROM searchIndex ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (name, kind, path) = row?;
            let kind: EntryType = kind.parse().map_err(|_| IndexError::UnknownType(kind))?;
            entries.push(IndexEntry { name, kind, path });
        }
        Ok(entries)
    }

    /// Close the index and move it to its destination.
    ///
    /// Returns the destination path, or `None` for an in-memory index.
    pub fn finish(self) -> Result<Option<PathBuf>, IndexError> {
        let IndexWriter { conn, target } = self;
        conn.close().map_err(|(_, e)| e)?;

        match target {
            Target::Memory => Ok(None),
            Target::File { temp, destination } => {
                temp.persist(&destination)
                    .map_err(|e| IndexError::Persist {
                        path: destination.clone(),
                        source: e.error,
                    })?;
                Ok(Some(destination))
            }
        }
    }
}

/// SQL literal for an escaped field; `replace` undoes the backslash doubling
fn literal(raw: &str) -> String {
    format!("replace('{}', '\\\\', '\\')", escape(raw))
}

/// Insert-or-ignore statements for every entry
pub fn load_script(entries: &[IndexEntry]) -> String {
    let mut script = String::new();
    for entry in entries {
        script.push_str(&format!(
            "INSERT OR IGNORE INTO searchIndex(name, type, path) VALUES ({}, {}, {});\n",
            literal(&entry.name),
            literal(entry.kind.as_str()),
            literal(&entry.path),
        ));
    }
    script
}
