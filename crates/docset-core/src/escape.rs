//! Quoting of index fields for the textual load script

/// Escape a raw field for a single-quoted load-script literal.
///
/// Single quotes are doubled first, then backslashes. Apply exactly once:
/// the load script decodes one level of backslash doubling.
pub fn escape(raw: &str) -> String {
    raw.replace('\'', "''").replace('\\', "\\\\")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_quotes() {
        assert_eq!(escape("O'Reilly"), "O''Reilly");
    }

    #[test]
    fn test_escape_backslashes() {
        assert_eq!(escape(r"Random\Randomizer"), r"Random\\Randomizer");
        assert_eq!(escape(r"a\'b"), r"a\\''b");
    }

    #[test]
    fn test_escape_plain_text_unchanged() {
        assert_eq!(escape("DateTime::format"), "DateTime::format");
        assert_eq!(escape(""), "");
    }
}
