//! Normalized query shape keys.
//!
//! Two queries share a shape when they differ only in literal values:
//! integers, quoted strings, and `LIMIT`/`OFFSET` amounts. Requests with the
//! same shape arriving in one batch window are near-duplicates and can be
//! executed jointly.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::executor::QueryKind;

static STRING_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"'[^']*'").unwrap());
static INT_LITERAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").unwrap());
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Compute the grouping key for a request.
///
/// String literals are masked before integers so digits inside quotes do not
/// leak placeholders. `LIMIT n` / `OFFSET n` are covered by the integer
/// rule. The kind tag keeps same-text requests with different result forms
/// apart.
pub fn shape_key(kind: QueryKind, sql: &str) -> String {
    let text = STRING_LITERAL.replace_all(sql, "?");
    let text = INT_LITERAL.replace_all(&text, "?");
    let text = WHITESPACE.replace_all(text.trim(), " ");
    format!("{}:{}", kind.tag(), text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_literals_collapse() {
        assert_eq!(
            shape_key(QueryKind::Rows, "SELECT * FROM t WHERE id = 1"),
            shape_key(QueryKind::Rows, "SELECT * FROM t WHERE id = 42"),
        );
    }

    #[test]
    fn test_string_literals_collapse() {
        assert_eq!(
            shape_key(QueryKind::Rows, "SELECT * FROM t WHERE name = 'alice'"),
            shape_key(QueryKind::Rows, "SELECT * FROM t WHERE name = 'bob'"),
        );
    }

    #[test]
    fn test_limit_offset_collapse() {
        assert_eq!(
            shape_key(QueryKind::Rows, "SELECT * FROM t LIMIT 10 OFFSET 0"),
            shape_key(QueryKind::Rows, "SELECT * FROM t LIMIT 50 OFFSET 100"),
        );
    }

    #[test]
    fn test_whitespace_collapses() {
        assert_eq!(
            shape_key(QueryKind::Rows, "SELECT *\n  FROM t\tWHERE id = 1"),
            shape_key(QueryKind::Rows, "SELECT * FROM t WHERE id = 2"),
        );
    }

    #[test]
    fn test_different_tables_differ() {
        assert_ne!(
            shape_key(QueryKind::Rows, "SELECT * FROM users"),
            shape_key(QueryKind::Rows, "SELECT * FROM orders"),
        );
    }

    #[test]
    fn test_kind_separates_groups() {
        assert_ne!(
            shape_key(QueryKind::Rows, "SELECT * FROM t"),
            shape_key(QueryKind::Columnar, "SELECT * FROM t"),
        );
    }

    #[test]
    fn test_digits_inside_strings_masked_once() {
        assert_eq!(
            shape_key(QueryKind::Rows, "SELECT * FROM t WHERE tag = '2024-01'"),
            shape_key(QueryKind::Rows, "SELECT * FROM t WHERE tag = 'archive'"),
        );
    }
}
