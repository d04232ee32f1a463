//! Bypass routing predicates.
//!
//! An ordered set of pattern checks over the raw SQL text decides whether a
//! request is unsafe or unprofitable to batch and must go straight to the
//! executor. The heuristics are deliberately approximate: a column literally
//! named `create` triggers a false-positive DDL bypass. That is an accepted
//! limitation, not a contract to strengthen.

/// Why a request skipped the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BypassReason {
    /// Batching is globally disabled.
    Disabled,
    /// Text contains a schema-mutating keyword; batching DDL with
    /// concurrent reads is unsafe.
    SchemaMutation,
    /// Text contains a session-mutating statement.
    SessionStatement,
    /// Text exceeds the configured length threshold; grouping heuristics
    /// are unreliable on large statements and batching buys little.
    Oversized,
}

const SCHEMA_KEYWORDS: [&str; 3] = ["create", "drop", "alter"];
const SESSION_KEYWORDS: [&str; 2] = ["set ", "pragma"];

/// Evaluate the text-based bypass rules in order. The disabled check is the
/// batcher's own first rule and happens before this is consulted.
pub fn bypass_reason(sql: &str, max_sql_len: usize) -> Option<BypassReason> {
    let text = sql.to_lowercase();

    if SCHEMA_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return Some(BypassReason::SchemaMutation);
    }
    if SESSION_KEYWORDS.iter().any(|kw| text.contains(kw)) {
        return Some(BypassReason::SessionStatement);
    }
    if sql.len() > max_sql_len {
        return Some(BypassReason::Oversized);
    }

    None
}
