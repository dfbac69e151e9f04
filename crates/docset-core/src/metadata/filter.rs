//! Structured predicates over metadata rows
//!
//! A [`Filter`] is a small expression tree that can either be evaluated
//! directly against a [`MetadataRow`] or compiled into a parameterised SQL
//! `WHERE` clause. Both forms share the same semantics:
//!
//! - NULL text columns compare as the empty string
//! - `Like` follows SQL `LIKE`: `%` matches any run, `_` one character,
//!   ASCII letters match case-insensitively
//! - `Chunk` reads the flag the way rows are decoded: zero, `''`, `'0'`,
//!   empty blobs and NULL are false
//!
//! Filters only borrow their operands, so rule tables can be built as
//! `static` data.

use super::MetadataRow;

/// A metadata column a filter can inspect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    DocbookId,
    ParentId,
    Element,
    Filename,
    ShortDesc,
    LongDesc,
}

impl Column {
    /// Column name in the renderer's table
    pub fn sql_name(&self) -> &'static str {
        match self {
            Column::DocbookId => "docbook_id",
            Column::ParentId => "parent_id",
            Column::Element => "element",
            Column::Filename => "filename",
            Column::ShortDesc => "sdesc",
            Column::LongDesc => "ldesc",
        }
    }

    fn value<'r>(&self, row: &'r MetadataRow) -> &'r str {
        match self {
            Column::DocbookId => &row.docbook_id,
            Column::ParentId => row.parent_id.as_deref().unwrap_or(""),
            Column::Element => &row.element,
            Column::Filename => &row.filename,
            Column::ShortDesc => &row.sdesc,
            Column::LongDesc => &row.ldesc,
        }
    }
}

/// Predicate over a metadata row
#[derive(Debug, Clone, Copy)]
pub enum Filter<'a> {
    /// Column equals the value exactly
    Eq(Column, &'a str),
    /// Column matches an SQL `LIKE` pattern
    Like(Column, &'a str),
    /// Chunk flag has the given value
    Chunk(bool),
    /// Negation
    Not(&'a Filter<'a>),
    /// Every sub-filter holds (true when empty)
    All(&'a [Filter<'a>]),
    /// At least one sub-filter holds (false when empty)
    Any(&'a [Filter<'a>]),
}

impl Filter<'_> {
    /// Evaluate the filter against a row
    pub fn matches(&self, row: &MetadataRow) -> bool {
        match self {
            Filter::Eq(column, value) => column.value(row) == *value,
            Filter::Like(column, pattern) => like(pattern, column.value(row)),
            Filter::Chunk(chunk) => row.chunk == *chunk,
            Filter::Not(inner) => !inner.matches(row),
            Filter::All(filters) => filters.iter().all(|f| f.matches(row)),
            Filter::Any(filters) => filters.iter().any(|f| f.matches(row)),
        }
    }

    /// Compile the filter into an SQL boolean expression.
    ///
    /// Operand values are appended to `params` and referenced with positional
    /// `?` placeholders, in order.
    pub fn to_sql(&self, params: &mut Vec<String>) -> String {
        match self {
            Filter::Eq(column, value) => {
                params.push((*value).to_string());
                format!("COALESCE({}, '') = ?", column.sql_name())
            }
            Filter::Like(column, pattern) => {
                params.push((*pattern).to_string());
                format!("COALESCE({}, '') LIKE ?", column.sql_name())
            }
            Filter::Chunk(true) => CHUNK_SQL.to_string(),
            Filter::Chunk(false) => format!("NOT ({CHUNK_SQL})"),
            Filter::Not(inner) => format!("NOT ({})", inner.to_sql(params)),
            Filter::All(filters) => join_sql(filters, " AND ", "1", params),
            Filter::Any(filters) => join_sql(filters, " OR ", "0", params),
        }
    }
}

/// Truth value of the `chunk` column, by storage class
const CHUNK_SQL: &str = "CASE typeof(chunk) \
    WHEN 'integer' THEN chunk <> 0 \
    WHEN 'real' THEN chunk <> 0 \
    WHEN 'text' THEN chunk NOT IN ('', '0') \
    WHEN 'blob' THEN length(chunk) > 0 \
    ELSE 0 END";

fn join_sql(filters: &[Filter<'_>], separator: &str, empty: &str, params: &mut Vec<String>) -> String {
    if filters.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = filters
        .iter()
        .map(|f| format!("({})", f.to_sql(params)))
        .collect();
    parts.join(separator)
}

/// SQL `LIKE` matching with SQLite's default ASCII case folding
pub fn like(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `%` seen and the text index it is currently absorbing up to
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len()
            && (pattern[p] == '_' || pattern[p].eq_ignore_ascii_case(&text[t]))
        {
            p += 1;
            t += 1;
        } else if let Some((star, absorbed)) = backtrack {
            p = star + 1;
            t = absorbed + 1;
            backtrack = Some((star, absorbed + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '%')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(docbook_id: &str, filename: &str, sdesc: &str) -> MetadataRow {
        MetadataRow {
            id: 1,
            docbook_id: docbook_id.to_string(),
            parent_id: None,
            element: "refentry".to_string(),
            chunk: true,
            filename: filename.to_string(),
            sdesc: sdesc.to_string(),
            ldesc: String::new(),
        }
    }

    #[test]
    fn test_like_wildcards() {
        assert!(like("constant.%", "constant.e-all"));
        assert!(like("%.constants.%", "errorfunc.constants.e-all"));
        assert!(!like("%.constants.%", "errorfunc.constants"));
        assert!(like("%::%", "DateTime::format"));
        assert!(!like("%::%", "strlen"));
        assert!(like("class._", "class.a"));
        assert!(!like("class._", "class.ab"));
        assert!(like("%", ""));
        assert!(!like("_", ""));
    }

    #[test]
    fn test_like_is_ascii_case_insensitive() {
        assert!(like("%interface%", "The Countable Interface"));
        assert!(like("%EXCEPTION", "RuntimeException"));
    }

    #[test]
    fn test_like_backtracks_over_repeated_prefix() {
        assert!(like("%ab%ab", "xabyabab"));
        assert!(!like("%ab%abc", "xabyabab"));
    }

    #[test]
    fn test_filter_evaluation() {
        let r = row("function.strlen", "function.strlen", "strlen");

        let not_method = Filter::Like(Column::ShortDesc, "%::%");
        let parts = [
            Filter::Eq(Column::Element, "refentry"),
            Filter::Not(&not_method),
        ];
        assert!(Filter::All(&parts).matches(&r));
        assert!(!Filter::Any(&[]).matches(&r));
        assert!(Filter::All(&[]).matches(&r));
        assert!(!Filter::Chunk(false).matches(&r));
    }

    #[test]
    fn test_filter_to_sql_collects_params_in_order() {
        let inner = Filter::Like(Column::ShortDesc, "%::%");
        let parts = [
            Filter::Eq(Column::Element, "refentry"),
            Filter::Not(&inner),
            Filter::Chunk(true),
        ];
        let mut params = Vec::new();
        let sql = Filter::All(&parts).to_sql(&mut params);

        assert_eq!(
            sql,
            format!(
                "(COALESCE(element, '') = ?) AND (NOT (COALESCE(sdesc, '') LIKE ?)) AND ({CHUNK_SQL})"
            )
        );
        assert_eq!(params, vec!["refentry".to_string(), "%::%".to_string()]);
    }
}
