//! Sloggo Store
//!
//! Embedded log storage and the query surface over it.
//!
//! # Architecture
//!
//! - [`LogStore`] - SQLite-backed store with a single writer connection
//!   (serialized appends, no WAL contention) and a small pool of read-only
//!   reader connections for query endpoints
//! - [`BatchWriter`] - bounded in-memory queue amortizing per-row insert
//!   cost; flushes on size (10 000) or time (5 s)
//! - [`retention`] - periodic deletion of entries older than the retention
//!   window
//! - [`query`] - typed filter conditions translated into WHERE clauses,
//!   cursor pagination, sort allow-list, chart bucketing
//!
//! Rows are queried by timestamp, not insert order: within a flushed batch
//! rows keep submission order, across batches there is no ordering
//! guarantee.

pub mod batch;
pub mod query;
pub mod retention;
pub mod store;

mod error;

pub use batch::{BatchWriter, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BATCH};
pub use error::StoreError;
pub use query::{
    ChartBucket, Direction, FilterCondition, LogFilter, LogQuery, MAX_PAGE_SIZE, SortField,
    SortOrder,
};
pub use retention::{DEFAULT_SWEEP_INTERVAL, spawn_retention_task};
pub use store::{ChartDataPoint, FacetMetadata, FacetRow, FacetValue, LogPage, LogStore};

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;
