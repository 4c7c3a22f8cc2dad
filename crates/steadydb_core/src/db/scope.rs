//! Scoped connection acquisition.
//!
//! # Invariants
//! - Exactly one `Connector::open` and at most one `Connector::close` per
//!   scope; the close runs on normal return, on failure and on unwinding.
//! - A failure from the body is never replaced by a close failure.

use super::open::Connector;
use crate::error::AccessResult;
use log::warn;
use rusqlite::Connection;
use std::ops::Deref;

/// Connection guard that releases its handle through the owning connector.
pub struct ScopedConnection<'c, C: Connector + ?Sized> {
    connector: &'c C,
    conn: Option<Connection>,
}

impl<'c, C: Connector + ?Sized> ScopedConnection<'c, C> {
    pub fn open(connector: &'c C) -> AccessResult<Self> {
        let conn = connector.open()?;
        Ok(Self {
            connector,
            conn: Some(conn),
        })
    }

    /// Releases the connection and reports the close outcome.
    pub fn close(mut self) -> AccessResult<()> {
        match self.conn.take() {
            Some(conn) => self.connector.close(conn),
            None => Ok(()),
        }
    }
}

impl<C: Connector + ?Sized> Deref for ScopedConnection<'_, C> {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // `conn` is only taken by `close`, which consumes the guard.
        match self.conn.as_ref() {
            Some(conn) => conn,
            None => unreachable!("scoped connection used after close"),
        }
    }
}

impl<C: Connector + ?Sized> Drop for ScopedConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(err) = self.connector.close(conn) {
                warn!(
                    "event=db_close module=db status=error error_code={} error={}",
                    err.error_code(),
                    err
                );
            }
        }
    }
}

/// Runs `body` with a freshly opened connection and always closes it.
///
/// The body's failure is propagated after cleanup. A close failure is only
/// reported when the body itself succeeded.
pub fn with_connection<C, T, F>(connector: &C, body: F) -> AccessResult<T>
where
    C: Connector + ?Sized,
    F: FnOnce(&Connection) -> AccessResult<T>,
{
    let scoped = ScopedConnection::open(connector)?;
    let conn: &Connection = &scoped;
    let outcome = body(conn);
    let closed = scoped.close();

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(close_err)) => {
            warn!(
                "event=db_close module=db status=error error_code={} error={} masked_by=body_failure",
                close_err.error_code(),
                close_err
            );
            Err(err)
        }
    }
}
