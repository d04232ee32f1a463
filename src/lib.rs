//! querygate — query admission, batching, and result caching in front of a
//! slow query executor.
//!
//! The crate sits between arbitrary callers and a single underlying
//! executor and minimizes per-query overhead and repeated work with two
//! independent components:
//!
//! - [`QueryBatcher`]: coalesces queued requests over a bounded window,
//!   groups near-duplicates by normalized shape, and dispatches one batch
//!   at a time. Unsafe or unprofitable statements bypass the queue.
//! - [`ResultCache`]: a TTL + LRU store keyed by normalized query shape,
//!   with a size ceiling, lazy and background expiry, and live shrink
//!   levers for an external memory-pressure controller.
//!
//! The two never call each other. The caller mediates:
//!
//! ```text
//! caller ──▶ ResultCache::lookup ──hit──▶ done
//!                │ miss
//!                ▼
//!         QueryBatcher::submit ──▶ executor
//!                │ ok, read-only
//!                ▼
//!         ResultCache::store
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use querygate::{
//!     BatcherConfig, CacheConfig, CacheOptions, QueryBatcher, QueryError,
//!     QueryExecutor, QueryRequest, ResultCache,
//! };
//!
//! async fn run(executor: Arc<dyn QueryExecutor>) -> Result<(), QueryError> {
//!     let batcher = QueryBatcher::new(executor, BatcherConfig::default());
//!     let cache = ResultCache::new(CacheConfig::default());
//!
//!     let sql = "SELECT * FROM users WHERE id = 1";
//!     let opts = CacheOptions::default();
//!     let value = match cache.lookup(sql, &opts) {
//!         Some(hit) => hit,
//!         None => {
//!             let value = batcher.submit(QueryRequest::rows(sql)).await?;
//!             cache.store(sql, &value, &opts);
//!             value
//!         }
//!     };
//!     let _ = value;
//!     Ok(())
//! }
//! ```
//!
//! # Memory pressure
//!
//! Under pressure an external controller can shrink the cache live
//! (`reconfigure` with reduced capacity and TTL, then `sweep_now`) or stop
//! it (`set_enabled(false)` plus `invalidate_all`). The batcher's only
//! lever is `set_enabled`; batching itself is not memory-sensitive.
//!
//! # Consistency caveats, by design
//!
//! Bypassed mutating statements are not serialized against in-flight
//! batched reads, and the cache does not invalidate prior reads when a
//! write is observed — a cached read can be served stale until its TTL
//! expires. Both are preserved behaviors of the system this crate fronts.

pub mod batcher;
pub mod cache;
pub mod error;
pub mod executor;

pub use batcher::{BatcherConfig, BatcherStats, BypassReason, QueryBatcher};
pub use cache::{CacheConfig, CacheOptions, CacheStats, ResultCache};
pub use error::QueryError;
pub use executor::{ColumnarBatch, QueryExecutor, QueryKind, QueryRequest, QueryValue};
