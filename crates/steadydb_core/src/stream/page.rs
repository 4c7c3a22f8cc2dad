//! Page mode: `LIMIT`/`OFFSET` queries, one fresh connection per page.
//!
//! Pages are only consistent when the base statement orders by a stable key
//! (usually the primary key). Rows inserted or deleted between page fetches
//! can still shift offsets; concurrent writers are not guarded against.

use super::{ensure_batch_size, FlattenRows};
use crate::db::{execute, with_connection, Connector, Row, Statement};
use crate::error::AccessResult;
use log::debug;
use rusqlite::types::Value;

/// One page of rows plus the offset it was fetched at.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub offset: usize,
    pub rows: Vec<Row>,
}

impl From<Page> for Vec<Row> {
    fn from(page: Page) -> Self {
        page.rows
    }
}

/// Lazy page sequence. Ends at the first empty page or the first failure.
pub struct Pages<'c, C: Connector + ?Sized> {
    connector: &'c C,
    paged_sql: String,
    params: Vec<Value>,
    page_size: usize,
    next_offset: usize,
    fetches: usize,
    finished: bool,
}

/// Builds a page sequence over `statement`, which must not carry its own
/// `LIMIT`/`OFFSET` and should end with an `ORDER BY` on a stable key.
pub fn paginate<'c, C>(
    connector: &'c C,
    statement: &Statement,
    page_size: usize,
) -> AccessResult<Pages<'c, C>>
where
    C: Connector + ?Sized,
{
    ensure_batch_size(page_size)?;

    let base = statement.sql().trim().trim_end_matches(';').trim_end();
    Ok(Pages {
        connector,
        paged_sql: format!("{base} LIMIT ? OFFSET ?"),
        params: statement.params().to_vec(),
        page_size,
        next_offset: 0,
        fetches: 0,
        finished: false,
    })
}

impl<'c, C: Connector + ?Sized> Pages<'c, C> {
    /// Page queries issued so far, including the terminating empty one.
    pub fn fetches(&self) -> usize {
        self.fetches
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Flattens the remaining pages into rows.
    pub fn rows(self) -> FlattenRows<Self> {
        FlattenRows::new(self)
    }

    fn page_statement(&self) -> Statement {
        let mut params = self.params.clone();
        params.push(Value::Integer(to_sql_integer(self.page_size)));
        params.push(Value::Integer(to_sql_integer(self.next_offset)));
        Statement::with_params(self.paged_sql.clone(), params)
    }
}

impl<C: Connector + ?Sized> Iterator for Pages<'_, C> {
    type Item = AccessResult<Page>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        self.fetches += 1;
        let statement = self.page_statement();
        let offset = self.next_offset;
        let rows = match with_connection(self.connector, |conn| execute(conn, &statement)) {
            Ok(rows) => rows,
            Err(err) => {
                self.finished = true;
                return Some(Err(err));
            }
        };

        debug!(
            "event=page_fetch module=stream page={} offset={} rows={}",
            self.fetches,
            offset,
            rows.len()
        );
        if rows.is_empty() {
            self.finished = true;
            return None;
        }
        self.next_offset += self.page_size;
        Some(Ok(Page { offset, rows }))
    }
}

fn to_sql_integer(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
