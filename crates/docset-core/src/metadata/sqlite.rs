use std::path::Path;
use std::sync::Mutex;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};

use super::{Filter, MetadataRow, MetadataStore, StoreError};

/// Table the renderer writes its metadata to
pub const DEFAULT_TABLE: &str = "ids";

const COLUMNS: &str = "rowid, docbook_id, parent_id, element, chunk, filename, sdesc, ldesc";

/// Metadata store backed by the renderer's SQLite database
pub struct SqliteMetadataStore {
    conn: Mutex<Connection>,
    table: String,
}

impl SqliteMetadataStore {
    /// Open a metadata database read-only.
    ///
    /// The table itself is not checked here; a missing table surfaces as a
    /// [`StoreError::Query`] on the first select.
    pub fn open(path: impl AsRef<Path>, table: &str) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn, table)
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: Connection, table: &str) -> Result<Self, StoreError> {
        if !is_valid_table_name(table) {
            return Err(StoreError::InvalidTable(table.to_string()));
        }
        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }

    fn query_error(&self, source: rusqlite::Error) -> StoreError {
        StoreError::Query {
            table: self.table.clone(),
            source,
        }
    }
}

impl MetadataStore for SqliteMetadataStore {
    fn select(&self, filter: &Filter<'_>) -> Result<Vec<MetadataRow>, StoreError> {
        let mut params = Vec::new();
        let clause = filter.to_sql(&mut params);
        let sql = format!(
            "SELECT {COLUMNS} FROM \"{}\" WHERE {clause} ORDER BY rowid",
            self.table
        );

        let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let mut stmt = conn.prepare(&sql).map_err(|e| self.query_error(e))?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), row_from_sql)
            .map_err(|e| self.query_error(e))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| self.query_error(e))
    }
}

fn row_from_sql(row: &Row<'_>) -> rusqlite::Result<MetadataRow> {
    let text = |index: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(index)?.unwrap_or_default())
    };

    Ok(MetadataRow {
        id: row.get(0)?,
        docbook_id: text(1)?,
        parent_id: row.get(2)?,
        element: text(3)?,
        chunk: chunk_flag(row.get_ref(4)?),
        filename: text(5)?,
        sdesc: text(6)?,
        ldesc: text(7)?,
    })
}

fn chunk_flag(value: ValueRef<'_>) -> bool {
    match value {
        ValueRef::Null => false,
        ValueRef::Integer(i) => i != 0,
        ValueRef::Real(f) => f != 0.0,
        ValueRef::Text(t) => !t.is_empty() && t != b"0",
        ValueRef::Blob(b) => !b.is_empty(),
    }
}

/// Whether `name` can be used as an unquoted SQLite identifier
pub fn is_valid_table_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Column;

    fn store() -> SqliteMetadataStore {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE ids (
                docbook_id TEXT, filename TEXT, parent_id TEXT, sdesc TEXT,
                ldesc TEXT, element TEXT, previous TEXT, next TEXT, chunk INTEGER
            );
            INSERT INTO ids VALUES
                ('function.strlen', 'function.strlen', 'ref.strings', 'strlen', 'Get string length', 'refentry', NULL, NULL, 1),
                ('datetime.format', 'datetime.format', 'class.datetime', 'DateTime::format', NULL, 'refentry', NULL, NULL, 1),
                ('constant.e-all', 'errorfunc.constants', 'errorfunc.constants', NULL, NULL, 'varlistentry', NULL, NULL, 0);",
        )
        .unwrap();
        SqliteMetadataStore::from_connection(conn, DEFAULT_TABLE).unwrap()
    }

    #[test]
    fn test_select_reads_all_columns() {
        let rows = store().select(&Filter::Eq(Column::DocbookId, "datetime.format")).unwrap();
        assert_eq!(rows.len(), 1);

        let row = &rows[0];
        assert_eq!(row.id, 2);
        assert_eq!(row.parent_id.as_deref(), Some("class.datetime"));
        assert_eq!(row.element, "refentry");
        assert!(row.chunk);
        assert_eq!(row.filename, "datetime.format");
        assert_eq!(row.sdesc, "DateTime::format");
        assert_eq!(row.ldesc, "");
    }

    #[test]
    fn test_select_matches_in_memory_semantics() {
        let method = Filter::Like(Column::ShortDesc, "%::%");
        let parts = [Filter::Eq(Column::Element, "refentry"), Filter::Not(&method)];
        let rows = store().select(&Filter::All(&parts)).unwrap();

        let ids: Vec<_> = rows.iter().map(|r| r.docbook_id.as_str()).collect();
        assert_eq!(ids, vec!["function.strlen"]);
    }

    #[test]
    fn test_null_columns_compare_as_empty() {
        let rows = store().select(&Filter::Eq(Column::ShortDesc, "")).unwrap();
        assert_eq!(rows.len(), 1);
        assert!(!rows[0].chunk);
    }

    #[test]
    fn test_chunk_filter_agrees_with_decoded_rows() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE ids (docbook_id, filename, parent_id, sdesc, ldesc, element, chunk);
            INSERT INTO ids (docbook_id, chunk) VALUES
                ('int-zero', 0), ('int-one', 1), ('text-zero', '0'), ('text-one', '1'),
                ('text-empty', ''), ('text-yes', 'yes'), ('null', NULL), ('real-zero', 0.0),
                ('real-half', 0.5), ('blob-empty', X''), ('blob-zero', X'00');",
        )
        .unwrap();
        let store = SqliteMetadataStore::from_connection(conn, DEFAULT_TABLE).unwrap();
        let all = store.select(&Filter::All(&[])).unwrap();
        assert_eq!(all.len(), 11);

        for filter in [Filter::Chunk(true), Filter::Chunk(false)] {
            let from_sql: Vec<_> = store
                .select(&filter)
                .unwrap()
                .into_iter()
                .map(|r| r.docbook_id)
                .collect();
            let in_memory: Vec<_> = all
                .iter()
                .filter(|r| filter.matches(r))
                .map(|r| r.docbook_id.clone())
                .collect();
            assert_eq!(from_sql, in_memory, "{filter:?}");
        }

        let chunked = store.select(&Filter::Chunk(true)).unwrap();
        let ids: Vec<_> = chunked.iter().map(|r| r.docbook_id.as_str()).collect();
        assert_eq!(ids, vec!["int-one", "text-one", "text-yes", "real-half", "blob-zero"]);
    }

    #[test]
    fn test_page_title() {
        let store = store();
        assert_eq!(
            store.page_title("function.strlen").unwrap().as_deref(),
            Some("strlen")
        );
        assert_eq!(store.page_title("errorfunc.constants").unwrap(), None);
    }

    #[test]
    fn test_missing_table_is_a_query_error() {
        let conn = Connection::open_in_memory().unwrap();
        let store = SqliteMetadataStore::from_connection(conn, "ids").unwrap();
        let err = store.select(&Filter::All(&[])).unwrap_err();
        assert!(matches!(err, StoreError::Query { .. }));
    }

    #[test]
    fn test_rejects_invalid_table_name() {
        let conn = Connection::open_in_memory().unwrap();
        let result = SqliteMetadataStore::from_connection(conn, "ids; DROP TABLE ids");
        assert!(matches!(result, Err(StoreError::InvalidTable(_))));
    }

    #[test]
    fn test_open_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = SqliteMetadataStore::open(dir.path().join("missing.sqlite"), "ids");
        assert!(matches!(result, Err(StoreError::Open { .. })));
    }
}
