//! Error types for querygate.

/// Failures surfaced to a query's caller.
///
/// Cache-side failures (a refused store, an oversized result) are never
/// represented here: they are recovered locally and only visible through
/// statistics and logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// The executor rejected this specific query. Scoped to one request;
    /// siblings in the same batch are unaffected.
    #[error("executor error: {message}")]
    Executor { message: String },

    /// A failure during dispatch bookkeeping that is not attributable to a
    /// single query. Every request in the affected batch receives it.
    #[error("batch failed: {0}")]
    BatchFailed(String),

    /// Synthetic failure issued to all queued requests when the batcher is
    /// shut down, and to any submit attempted afterwards.
    #[error("connector destroyed")]
    ConnectorDestroyed,
}

impl QueryError {
    /// Convenience constructor for executor-side failures.
    pub fn executor(message: impl Into<String>) -> Self {
        Self::Executor { message: message.into() }
    }
}
