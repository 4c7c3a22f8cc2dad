//! Connection acquisition and release for SQLite.
//!
//! # Responsibility
//! - Open file-backed SQLite connections with the pragmas core relies on.
//! - Release connections explicitly so close failures are observable.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON` and a busy timeout.
//! - Open failures surface as `AccessError::Connection`, never as operation
//!   failures.

use crate::db::StoreError;
use crate::error::{AccessError, AccessResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Source of exclusively-owned data-store connections.
///
/// Implementations must be shareable across fan-out threads; each call to
/// `open` yields a fresh handle that is never shared.
pub trait Connector: Sync {
    /// Acquires a new connection.
    fn open(&self) -> AccessResult<Connection>;

    /// Releases a connection previously returned by `open`.
    fn close(&self, conn: Connection) -> AccessResult<()> {
        conn.close()
            .map_err(|(_, err)| AccessError::Connection(StoreError::Sqlite(err)))
    }
}

impl<C: Connector + ?Sized> Connector for &C {
    fn open(&self) -> AccessResult<Connection> {
        (**self).open()
    }

    fn close(&self, conn: Connection) -> AccessResult<()> {
        (**self).close(conn)
    }
}

/// Connector for one SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
}

impl SqliteConnector {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Connector for SqliteConnector {
    /// Opens the database file and applies connection pragmas.
    ///
    /// # Side effects
    /// - Emits `db_open` logging events with duration and status.
    fn open(&self) -> AccessResult<Connection> {
        let started_at = Instant::now();

        let conn = match Connection::open(&self.path) {
            Ok(conn) => conn,
            Err(err) => {
                error!(
                    "event=db_open module=db status=error duration_ms={} error_code=db_open_failed error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                return Err(AccessError::Connection(err.into()));
            }
        };

        if let Err(err) = configure_connection(&conn) {
            error!(
                "event=db_open module=db status=error duration_ms={} error_code=db_configure_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            return Err(AccessError::Connection(err.into()));
        }

        info!(
            "event=db_open module=db status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        );
        Ok(conn)
    }

    fn close(&self, conn: Connection) -> AccessResult<()> {
        match conn.close() {
            Ok(()) => {
                info!("event=db_close module=db status=ok");
                Ok(())
            }
            Err((_, err)) => {
                error!(
                    "event=db_close module=db status=error error_code=db_close_failed error={}",
                    err
                );
                Err(AccessError::Connection(err.into()))
            }
        }
    }
}

fn configure_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}
