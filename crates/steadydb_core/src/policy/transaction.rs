//! Commit-on-success, rollback-on-failure wrapper.
//!
//! # Invariants
//! - Exactly one of commit or rollback runs per invocation.
//! - The inner failure reaches the caller unchanged after rollback.

use super::Operation;
use crate::db::{StoreError, Statement};
use crate::error::{AccessError, AccessResult};
use log::{info, warn};
use rusqlite::Connection;

/// Operation that runs its inner operation inside one transaction.
#[derive(Debug, Clone)]
pub struct Transactional<O> {
    inner: O,
}

/// Wraps `inner` so it commits when it returns normally and rolls back
/// otherwise.
pub fn transactional<O: Operation>(inner: O) -> Transactional<O> {
    Transactional { inner }
}

impl<O> Transactional<O> {
    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: Operation> Operation for Transactional<O> {
    type Output = O::Output;

    fn run(&mut self, conn: &Connection, statement: &Statement) -> AccessResult<O::Output> {
        let tx = conn
            .unchecked_transaction()
            .map_err(|err| AccessError::Transaction(StoreError::Sqlite(err)))?;

        match self.inner.run(&tx, statement) {
            Ok(value) => {
                tx.commit()
                    .map_err(|err| AccessError::Transaction(StoreError::Sqlite(err)))?;
                info!("event=txn_commit module=policy status=ok");
                Ok(value)
            }
            Err(err) => {
                // Rollback failure is logged only; the caller sees the original error.
                if let Err(rollback_err) = tx.rollback() {
                    warn!(
                        "event=txn_rollback module=policy status=error error={}",
                        rollback_err
                    );
                } else {
                    info!(
                        "event=txn_rollback module=policy status=ok cause={}",
                        err.error_code()
                    );
                }
                Err(err)
            }
        }
    }
}
