//! Index entry types

use std::fmt;
use std::str::FromStr;

/// Kind of symbol recorded in the search index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryType {
    Interface,
    Enum,
    Class,
    Exception,
    Method,
    Function,
    Keyword,
    Variable,
    Type,
    Operator,
    Extension,
    Guide,
    Constant,
    Setting,
    Property,
}

impl EntryType {
    /// Every entry type, in declaration order
    pub const ALL: [EntryType; 15] = [
        EntryType::Interface,
        EntryType::Enum,
        EntryType::Class,
        EntryType::Exception,
        EntryType::Method,
        EntryType::Function,
        EntryType::Keyword,
        EntryType::Variable,
        EntryType::Type,
        EntryType::Operator,
        EntryType::Extension,
        EntryType::Guide,
        EntryType::Constant,
        EntryType::Setting,
        EntryType::Property,
    ];

    /// The name stored in the `type` column of the index
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Interface => "Interface",
            EntryType::Enum => "Enum",
            EntryType::Class => "Class",
            EntryType::Exception => "Exception",
            EntryType::Method => "Method",
            EntryType::Function => "Function",
            EntryType::Keyword => "Keyword",
            EntryType::Variable => "Variable",
            EntryType::Type => "Type",
            EntryType::Operator => "Operator",
            EntryType::Extension => "Extension",
            EntryType::Guide => "Guide",
            EntryType::Constant => "Constant",
            EntryType::Setting => "Setting",
            EntryType::Property => "Property",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Error returned when a string names no known entry type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEntryType(pub String);

impl fmt::Display for UnknownEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown entry type '{}'", self.0)
    }
}

impl std::error::Error for UnknownEntryType {}

impl FromStr for EntryType {
    type Err = UnknownEntryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntryType::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownEntryType(s.to_string()))
    }
}

/// A single `(name, type, path)` triple of the search index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndexEntry {
    /// Human-visible symbol label
    pub name: String,
    /// Symbol kind
    pub kind: EntryType,
    /// Document-relative locator, `page.html` or `page.html#anchor`
    pub path: String,
}

impl IndexEntry {
    /// Create a new index entry
    pub fn new(name: impl Into<String>, kind: EntryType, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            path: path.into(),
        }
    }
}

/// Path of a standalone page
pub fn page_path(filename: &str) -> String {
    format!("{filename}.html")
}

/// Path of an anchor inside a page
pub fn anchor_path(filename: &str, anchor: &str) -> String {
    format!("{filename}.html#{anchor}")
}
