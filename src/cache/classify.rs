//! Non-cacheable statement classification.
//!
//! Caching a mutating statement, a session command, or anything calling a
//! non-deterministic function would silently replay stale or wrong values,
//! so `store` refuses them outright.

const MUTATING_PREFIXES: [&str; 6] = ["create", "drop", "alter", "insert", "update", "delete"];
const SESSION_PREFIXES: [&str; 2] = ["pragma", "set"];
const NON_DETERMINISTIC: [&str; 4] = ["random()", "uuid()", "now()", "current_timestamp"];

/// Whether a statement's result must never be cached.
pub fn is_non_cacheable(sql: &str) -> bool {
    let text = sql.trim().to_lowercase();

    MUTATING_PREFIXES.iter().any(|p| text.starts_with(p))
        || SESSION_PREFIXES.iter().any(|p| text.starts_with(p))
        || NON_DETERMINISTIC.iter().any(|f| text.contains(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_select_is_cacheable() {
        assert!(!is_non_cacheable("SELECT * FROM users WHERE id = 1"));
    }

    #[test]
    fn test_mutating_statements() {
        assert!(is_non_cacheable("INSERT INTO t VALUES (1)"));
        assert!(is_non_cacheable("UPDATE t SET x = 1"));
        assert!(is_non_cacheable("DELETE FROM t"));
        assert!(is_non_cacheable("CREATE TABLE t (x INT)"));
        assert!(is_non_cacheable("DROP TABLE t"));
        assert!(is_non_cacheable("ALTER TABLE t ADD y INT"));
    }

    #[test]
    fn test_session_statements() {
        assert!(is_non_cacheable("PRAGMA journal_mode = WAL"));
        assert!(is_non_cacheable("SET search_path TO app"));
    }

    #[test]
    fn test_non_deterministic_functions() {
        assert!(is_non_cacheable("SELECT random() FROM t"));
        assert!(is_non_cacheable("SELECT uuid(), name FROM t"));
        assert!(is_non_cacheable("SELECT now()"));
        assert!(is_non_cacheable("SELECT CURRENT_TIMESTAMP"));
    }

    #[test]
    fn test_case_and_leading_whitespace() {
        assert!(is_non_cacheable("  InSeRt INTO t VALUES (1)"));
        assert!(is_non_cacheable("SELECT RANDOM() FROM t"));
    }

    #[test]
    fn test_select_mentioning_update_column_is_cacheable() {
        // Prefix check only; "updated_at" in a projection does not start
        // the statement.
        assert!(!is_non_cacheable("SELECT updated_at FROM t"));
    }
}
