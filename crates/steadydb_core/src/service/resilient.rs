//! Policy-driven entry point for callers outside the core.
//!
//! # Responsibility
//! - Compose connection, transaction, retry and cache policies from a
//!   `Policy` value.
//! - Own the injected `QueryCache` and cancellation token for its callers.
//!
//! # Invariants
//! - Layering is `with_connection(transactional(retry(cached(execute))))` for
//!   cached reads and the same without `cached` otherwise. Statements that
//!   are not read-only pass through `cached` unmemoized.
//! - Policies are validated before any connection is opened.

use crate::config::Policy;
use crate::db::{execute, with_connection, Connector, Rows, Statement};
use crate::error::AccessResult;
use crate::fanout::{concurrently, ReadTask};
use crate::policy::{cached, transactional, Cancellation, Operation, QueryCache};
use crate::stream::{paginate, stream_batches, Batches, Pages};
use log::error;
use std::sync::Arc;

/// Executes statements against one connector under configurable policies.
pub struct ResilientExecutor<C: Connector> {
    connector: C,
    cache: Arc<QueryCache>,
    cancellation: Cancellation,
}

impl<C: Connector> ResilientExecutor<C> {
    /// Creates an executor sharing `cache` with any other holder of the `Arc`.
    pub fn new(connector: C, cache: Arc<QueryCache>) -> Self {
        Self {
            connector,
            cache,
            cancellation: Cancellation::new(),
        }
    }

    /// Uses `cancellation` to interrupt retries of every subsequent call.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancellation
    }

    /// Runs `statement` with retry, transaction and optional caching.
    ///
    /// # Errors
    /// - `InvalidPolicy` when `policy` fails validation.
    /// - `Connection` when no handle can be acquired.
    /// - `ExhaustedRetries` when every attempt failed (more than one attempt
    ///   configured), otherwise the single attempt's failure.
    /// - `Cancelled` when the executor's token fires.
    pub fn run_resilient(&self, statement: &Statement, policy: &Policy) -> AccessResult<Rows> {
        policy.validate()?;
        let retry = policy.retry_policy()?;

        let outcome = with_connection(&self.connector, |conn| {
            if policy.use_cache {
                let read = cached(Arc::clone(&self.cache), execute);
                transactional(retry.wrap(read).with_cancellation(self.cancellation.clone()))
                    .run(conn, statement)
            } else {
                transactional(retry.wrap(execute).with_cancellation(self.cancellation.clone()))
                    .run(conn, statement)
            }
        });

        if let Err(err) = &outcome {
            error!(
                "event=run_resilient module=service status=error layer={} error_code={} error={}",
                err.layer().as_str(),
                err.error_code(),
                err
            );
        }
        outcome
    }

    /// Streams `statement` in batches of `policy.batch_size` rows.
    pub fn stream<T, F>(&self, statement: &Statement, policy: &Policy, consume: F) -> AccessResult<T>
    where
        F: FnOnce(&mut Batches<'_>) -> AccessResult<T>,
    {
        stream_batches(&self.connector, statement, policy.batch_size, consume)
    }

    /// Pages through `statement` with `policy.batch_size` rows per page.
    pub fn paginate(&self, statement: &Statement, policy: &Policy) -> AccessResult<Pages<'_, C>> {
        paginate(&self.connector, statement, policy.batch_size)
    }

    /// Runs independent reads concurrently; outcomes follow input order.
    pub fn fetch_concurrently(&self, statements: Vec<Statement>) -> Vec<AccessResult<Rows>> {
        let tasks = statements
            .into_iter()
            .map(|statement| ReadTask::new(statement, execute))
            .collect();
        concurrently(&self.connector, tasks)
    }
}
