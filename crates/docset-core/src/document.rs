//! Rendered pages and structural lookups over them
//!
//! The renderer writes one XHTML page per chunk. Pages are parsed with
//! `sxd-document` and queried with XPath 1.0. Before parsing, markup is
//! normalised so that plain XHTML parses as namespace-free XML:
//!
//! - the DOCTYPE declaration is removed
//! - default `xmlns` declarations are removed, so element names match
//!   unprefixed XPath steps
//! - HTML named character references become numeric references; unknown
//!   names and stray ampersands are escaped literally

use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;
use sxd_document::Package;
use sxd_xpath::Value;
use thiserror::Error;

use crate::entry::page_path;

/// Errors raised while reading a rendered page
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("failed to read document '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse document '{document}': {message}")]
    Parse { document: String, message: String },
}

/// Directory of rendered pages, one `<filename>.html` per chunk
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Location of the page written for `filename`
    pub fn page(&self, filename: &str) -> PathBuf {
        self.root.join(page_path(filename))
    }

    /// Whether a page exists for `filename`.
    ///
    /// Filenames that would escape the store's root never exist.
    pub fn exists(&self, filename: &str) -> bool {
        is_plain_filename(filename) && self.page(filename).is_file()
    }

    /// Read and parse the page written for `filename`
    pub fn load(&self, filename: &str) -> Result<Document, DocumentError> {
        let path = self.page(filename);
        let source = std::fs::read_to_string(&path).map_err(|source| DocumentError::Io {
            path: path.clone(),
            source,
        })?;
        Document::parse(filename, &source)
    }
}

fn is_plain_filename(filename: &str) -> bool {
    !filename.is_empty()
        && filename != ".."
        && !filename.contains(['/', '\\'])
}

/// A parsed page
pub struct Document {
    package: Package,
}

impl Document {
    /// Parse page markup; `name` is only used in error messages
    pub fn parse(name: &str, source: &str) -> Result<Self, DocumentError> {
        let markup = normalize_markup(source);
        let package = sxd_document::parser::parse(&markup).map_err(|e| DocumentError::Parse {
            document: name.to_string(),
            message: format!("{e:?}"),
        })?;
        Ok(Self { package })
    }

    /// Trimmed string value of the first node, in document order, selected
    /// by `xpath`. `None` when nothing matches or the text is blank.
    pub fn text(&self, xpath: &str) -> Option<String> {
        let document = self.package.as_document();
        let value = match sxd_xpath::evaluate_xpath(&document, xpath) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(xpath, error = ?e, "xpath evaluation failed");
                return None;
            }
        };

        let text = match value {
            Value::Nodeset(nodes) => nodes.document_order_first()?.string_value(),
            Value::String(s) => s,
            Value::Boolean(_) | Value::Number(_) => return None,
        };

        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// Quote `value` as an XPath 1.0 string literal.
///
/// XPath literals have no escape syntax, so values holding both quote kinds
/// are assembled with `concat()`.
pub fn xpath_literal(value: &str) -> String {
    if !value.contains('\'') {
        return format!("'{value}'");
    }
    if !value.contains('"') {
        return format!("\"{value}\"");
    }

    let parts: Vec<String> = value
        .split('\'')
        .map(|part| format!("'{part}'"))
        .collect();
    format!("concat({})", parts.join(", \"'\", "))
}

fn doctype_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<!DOCTYPE[^>\[]*(\[[^\]]*\])?\s*>").expect("valid doctype pattern")
    })
}

fn xmlns_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\sxmlns\s*=\s*("[^"]*"|'[^']*')"#).expect("valid xmlns pattern")
    })
}

/// Rewrite XHTML markup into XML `sxd-document` accepts
pub fn normalize_markup(source: &str) -> String {
    let without_doctype = doctype_pattern().replace(source, "");
    let without_xmlns = xmlns_pattern().replace_all(&without_doctype, "");
    normalize_entities(&without_xmlns)
}

const XML_ENTITIES: [&str; 5] = ["amp", "lt", "gt", "quot", "apos"];

const HTML_ENTITIES: &[(&str, u32)] = &[
    ("nbsp", 160),
    ("iexcl", 161),
    ("cent", 162),
    ("pound", 163),
    ("yen", 165),
    ("sect", 167),
    ("copy", 169),
    ("laquo", 171),
    ("shy", 173),
    ("reg", 174),
    ("deg", 176),
    ("plusmn", 177),
    ("para", 182),
    ("middot", 183),
    ("raquo", 187),
    ("times", 215),
    ("divide", 247),
    ("ndash", 8211),
    ("mdash", 8212),
    ("lsquo", 8216),
    ("rsquo", 8217),
    ("ldquo", 8220),
    ("rdquo", 8221),
    ("bull", 8226),
    ("hellip", 8230),
    ("euro", 8364),
    ("trade", 8482),
    ("larr", 8592),
    ("rarr", 8594),
    ("harr", 8596),
    ("ne", 8800),
    ("le", 8804),
    ("ge", 8805),
];

fn normalize_entities(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos + 1..];

        match reference_len(tail) {
            Some(len) => {
                let name = &tail[..len - 1];
                if name.starts_with('#') || XML_ENTITIES.contains(&name) {
                    out.push('&');
                    out.push_str(&tail[..len]);
                } else if let Some((_, code)) = HTML_ENTITIES.iter().find(|(n, _)| *n == name) {
                    out.push_str(&format!("&#{code};"));
                } else {
                    out.push_str("&amp;");
                    out.push_str(&tail[..len]);
                }
                rest = &tail[len..];
            }
            None => {
                out.push_str("&amp;");
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Length of a well-formed reference body (including the `;`) at the start
/// of `tail`, which follows an `&`
fn reference_len(tail: &str) -> Option<usize> {
    let end = tail.find(';')?;
    let body = &tail[..end];

    let valid = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
        !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
    } else if let Some(dec) = body.strip_prefix('#') {
        !dec.is_empty() && dec.chars().all(|c| c.is_ascii_digit())
    } else {
        let mut chars = body.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric())
    };

    valid.then_some(end + 1)
}
