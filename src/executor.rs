//! The executor seam and the query/result types that cross it.
//!
//! The executor itself is an external collaborator: an opaque asynchronous
//! function that takes a query description and returns a result or fails.
//! querygate assumes no ordering or idempotency guarantees from it.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;

use crate::error::QueryError;

/// What the caller expects back from a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    /// No result expected (DDL, session statements, writes).
    Exec,
    /// Materialized rows.
    Rows,
    /// Native columnar handle, shared rather than copied.
    Columnar,
}

impl QueryKind {
    /// Short tag used as a shape-key prefix so identical SQL submitted with
    /// different result kinds never lands in the same group.
    pub fn tag(&self) -> &'static str {
        match self {
            QueryKind::Exec => "exec",
            QueryKind::Rows => "rows",
            QueryKind::Columnar => "columnar",
        }
    }
}

/// One caller-submitted unit of work. Immutable once created; owned by the
/// batcher until it is resolved or rejected exactly once.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// The query text.
    pub sql: String,
    /// Expected result form.
    pub kind: QueryKind,
    /// When the caller submitted this request.
    pub submitted_at: Instant,
}

impl QueryRequest {
    /// Create a request stamped with the current time.
    pub fn new(sql: impl Into<String>, kind: QueryKind) -> Self {
        Self { sql: sql.into(), kind, submitted_at: Instant::now() }
    }

    /// Shorthand for a row-producing query.
    pub fn rows(sql: impl Into<String>) -> Self {
        Self::new(sql, QueryKind::Rows)
    }

    /// Shorthand for a statement with no result.
    pub fn exec(sql: impl Into<String>) -> Self {
        Self::new(sql, QueryKind::Exec)
    }
}

/// A columnar result handle. Externally immutable once produced, so the
/// cache and concurrent consumers share it by reference instead of copying.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnarBatch {
    /// Field names, one per column.
    pub fields: Vec<String>,
    /// Column-major values; `columns[i]` belongs to `fields[i]`.
    pub columns: Vec<Vec<serde_json::Value>>,
}

impl ColumnarBatch {
    pub fn row_count(&self) -> usize {
        self.columns.first().map(Vec::len).unwrap_or(0)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// A query outcome.
///
/// `Clone` gives the ownership semantics the cache relies on: `Rows` clones
/// are deep copies, while `Columnar` clones share the immutable handle.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    /// Statement executed, nothing to return.
    None,
    /// Materialized rows, one JSON object per row.
    Rows(Vec<serde_json::Value>),
    /// Shared columnar handle.
    Columnar(Arc<ColumnarBatch>),
}

/// The underlying query engine.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Execute one query. Per-query failures come back as
    /// [`QueryError::Executor`].
    async fn execute(&self, request: &QueryRequest) -> Result<QueryValue, QueryError>;
}
