//! Bounded-memory streaming over large result sets.
//!
//! # Responsibility
//! - Turn one unbounded fetch into a lazy sequence of fixed-size chunks.
//! - Flatten chunks into rows and compose filters without materializing the
//!   full result set.
//!
//! # Invariants
//! - Peak memory is proportional to the batch or page size.
//! - An empty chunk ends the sequence; nothing is fetched after it.
//! - A zero batch or page size fails before any connection is opened.

use crate::db::Row;
use crate::error::{AccessError, AccessResult};

mod batch;
mod page;

pub use batch::{stream_average, stream_batches, Batch, Batches};
pub use page::{paginate, Page, Pages};

pub(crate) fn ensure_batch_size(batch_size: usize) -> AccessResult<()> {
    if batch_size == 0 {
        return Err(AccessError::InvalidBatchSize(batch_size));
    }
    Ok(())
}

/// Flattens a sequence of row chunks into individual rows.
pub struct FlattenRows<I> {
    chunks: I,
    current: std::vec::IntoIter<Row>,
}

impl<I> FlattenRows<I> {
    pub(crate) fn new(chunks: I) -> Self {
        Self {
            chunks,
            current: Vec::new().into_iter(),
        }
    }

    /// Keeps only rows accepted by `predicate`; failures always pass through.
    pub fn filter_rows<P>(self, predicate: P) -> FilteredRows<I, P>
    where
        P: FnMut(&Row) -> bool,
    {
        FilteredRows {
            rows: self,
            predicate,
        }
    }
}

impl<I, B> Iterator for FlattenRows<I>
where
    I: Iterator<Item = AccessResult<B>>,
    B: Into<Vec<Row>>,
{
    type Item = AccessResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.current.next() {
                return Some(Ok(row));
            }
            match self.chunks.next()? {
                Ok(chunk) => self.current = chunk.into().into_iter(),
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

/// Row stream with a predicate stage applied.
pub struct FilteredRows<I, P> {
    rows: FlattenRows<I>,
    predicate: P,
}

impl<I, B, P> Iterator for FilteredRows<I, P>
where
    I: Iterator<Item = AccessResult<B>>,
    B: Into<Vec<Row>>,
    P: FnMut(&Row) -> bool,
{
    type Item = AccessResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.rows.next()? {
                Ok(row) if !(self.predicate)(&row) => continue,
                other => return Some(other),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ensure_batch_size, FlattenRows};
    use crate::db::Row;
    use crate::error::{AccessError, AccessResult};
    use rusqlite::types::Value;

    fn row(value: i64) -> Row {
        Row::new(vec![Value::Integer(value)])
    }

    #[test]
    fn zero_batch_size_fails_fast() {
        assert!(matches!(
            ensure_batch_size(0),
            Err(AccessError::InvalidBatchSize(0))
        ));
        assert!(ensure_batch_size(1).is_ok());
    }

    #[test]
    fn flatten_skips_empty_chunks_and_keeps_order() {
        let chunks: Vec<AccessResult<Vec<Row>>> =
            vec![Ok(vec![row(1), row(2)]), Ok(vec![]), Ok(vec![row(3)])];
        let values: Vec<i64> = FlattenRows::new(chunks.into_iter())
            .map(|row| row.unwrap().get_i64(0).unwrap())
            .collect();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn filter_passes_failures_through() {
        let chunks: Vec<AccessResult<Vec<Row>>> = vec![
            Ok(vec![row(1), row(2)]),
            Err(AccessError::operation("cursor lost")),
        ];
        let mut rows = FlattenRows::new(chunks.into_iter())
            .filter_rows(|row| row.get_i64(0).is_some_and(|value| value % 2 == 0));

        assert_eq!(rows.next().unwrap().unwrap().get_i64(0), Some(2));
        assert!(rows.next().unwrap().is_err());
        assert!(rows.next().is_none());
    }
}
