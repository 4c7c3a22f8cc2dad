//! Batch mode: fixed-size fetches from one open cursor.

use super::{ensure_batch_size, FlattenRows};
use crate::db::{log_sql, read_row, with_connection, Connector, Row, Statement};
use crate::error::{AccessError, AccessResult};
use log::debug;
use rusqlite::params_from_iter;

/// Rows returned by one cursor fetch, at most `batch_size` long.
pub type Batch = Vec<Row>;

/// Lazy sequence of batches drawn from a single cursor.
///
/// Ends at the first empty fetch or the first failure.
pub struct Batches<'stmt> {
    rows: rusqlite::Rows<'stmt>,
    column_count: usize,
    batch_size: usize,
    fetches: usize,
    rows_seen: usize,
    finished: bool,
}

impl<'stmt> Batches<'stmt> {
    /// Fetches issued so far, including the terminating empty one.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Flattens the remaining batches into rows.
    pub fn rows(&mut self) -> FlattenRows<&mut Batches<'stmt>> {
        FlattenRows::new(self)
    }

    fn fail(&mut self, err: rusqlite::Error) -> Option<AccessResult<Batch>> {
        self.finished = true;
        Some(Err(AccessError::from(err)))
    }
}

impl Iterator for Batches<'_> {
    type Item = AccessResult<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.fetches += 1;
        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.rows.next() {
                Ok(Some(row)) => match read_row(row, self.column_count) {
                    Ok(row) => batch.push(row),
                    Err(err) => return self.fail(err),
                },
                Ok(None) => break,
                Err(err) => return self.fail(err),
            }
        }

        debug!(
            "event=stream_fetch module=stream fetch={} rows={}",
            self.fetches,
            batch.len()
        );
        if batch.is_empty() {
            self.finished = true;
            return None;
        }
        self.rows_seen += batch.len();
        Some(Ok(batch))
    }
}

/// Opens one connection and one cursor for `statement` and hands the
/// batch sequence to `consume`.
///
/// The connection is closed when `consume` returns, so the sequence cannot
/// escape the call.
pub fn stream_batches<C, T, F>(
    connector: &C,
    statement: &Statement,
    batch_size: usize,
    consume: F,
) -> AccessResult<T>
where
    C: Connector + ?Sized,
    F: FnOnce(&mut Batches<'_>) -> AccessResult<T>,
{
    ensure_batch_size(batch_size)?;

    with_connection(connector, |conn| {
        log_sql("stream_open", statement);
        let mut stmt = conn.prepare(statement.sql())?;
        let column_count = stmt.column_count();
        let rows = stmt.query(params_from_iter(statement.params().iter()))?;

        let mut batches = Batches {
            rows,
            column_count,
            batch_size,
            fetches: 0,
            rows_seen: 0,
            finished: false,
        };
        let outcome = consume(&mut batches);
        debug!(
            "event=stream_close module=stream fetches={} rows={}",
            batches.fetches, batches.rows_seen
        );
        outcome
    })
}

/// Mean of a numeric column in one streaming pass; `0.0` when no row holds
/// a numeric value in that column.
pub fn stream_average<C>(
    connector: &C,
    statement: &Statement,
    column: usize,
    batch_size: usize,
) -> AccessResult<f64>
where
    C: Connector + ?Sized,
{
    stream_batches(connector, statement, batch_size, |batches| {
        let mut total = 0.0;
        let mut count: u64 = 0;
        for row in batches.rows() {
            if let Some(value) = row?.get_f64(column) {
                total += value;
                count += 1;
            }
        }
        if count == 0 {
            return Ok(0.0);
        }
        Ok(total / count as f64)
    })
}
