//! Composable access policies.
//!
//! # Responsibility
//! - Define the `Operation` shape every policy consumes and produces.
//! - Provide transaction, retry and cache transformers over operations.
//!
//! # Invariants
//! - A policy never inspects the operation it wraps; it only observes the
//!   returned value or failure.
//! - Wrapping preserves the operation shape, so policies nest freely:
//!   `transactional(with_retry(policy, cached(cache, execute)))`.

use crate::db::Statement;
use crate::error::AccessResult;
use rusqlite::Connection;

pub mod cache;
pub mod cancel;
pub mod retry;
pub mod transaction;

pub use cache::{cached, CacheKey, Cached, QueryCache};
pub use cancel::Cancellation;
pub use retry::{with_retry, RetryPolicy, RetryState, Retrying};
pub use transaction::{transactional, Transactional};

/// A unit of work against one connection.
///
/// Closures and functions of shape
/// `FnMut(&Connection, &Statement) -> AccessResult<T>` are operations, and so
/// is every policy wrapper.
pub trait Operation {
    type Output;

    fn run(&mut self, conn: &Connection, statement: &Statement) -> AccessResult<Self::Output>;
}

impl<F, T> Operation for F
where
    F: FnMut(&Connection, &Statement) -> AccessResult<T>,
{
    type Output = T;

    fn run(&mut self, conn: &Connection, statement: &Statement) -> AccessResult<T> {
        self(conn, statement)
    }
}
