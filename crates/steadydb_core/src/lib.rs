//! Resilient blocking database access for SQLite.
//! Wraps a raw `execute` call with scoped connections, transactions,
//! bounded retry, result caching, streaming and concurrent fan-out.

pub mod config;
pub mod db;
pub mod error;
pub mod fanout;
pub mod logging;
pub mod policy;
pub mod service;
pub mod stream;

pub use config::{Policy, PolicyError};
pub use db::{
    execute, with_connection, Connector, Row, Rows, ScopedConnection, SqliteConnector,
    Statement, StoreError,
};
pub use error::{AccessError, AccessResult, FailureLayer};
pub use fanout::{concurrently, ReadTask};
pub use logging::{default_log_level, init_logging, logging_status};
pub use policy::{
    cached, transactional, with_retry, CacheKey, Cached, Cancellation, Operation, QueryCache,
    RetryPolicy, RetryState, Retrying, Transactional,
};
pub use service::resilient::ResilientExecutor;
pub use stream::{paginate, stream_average, stream_batches, Batch, Batches, Page, Pages};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
