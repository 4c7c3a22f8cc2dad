//! The raw blocking data-store call every policy wraps.

use super::{Row, Rows, Statement};
use crate::error::AccessResult;
use crate::logging::sanitize_message;
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

const MAX_LOGGED_SQL_CHARS: usize = 200;

/// Executes `statement` on `conn` and collects every produced row.
///
/// Statements that produce no rows (DDL, DML) return an empty result.
pub fn execute(conn: &Connection, statement: &Statement) -> AccessResult<Rows> {
    log_sql("query_execute", statement);

    let mut stmt = conn.prepare(statement.sql())?;
    let column_count = stmt.column_count();
    let mut rows = stmt.query(params_from_iter(statement.params().iter()))?;

    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        collected.push(read_row(row, column_count)?);
    }
    Ok(collected)
}

pub(crate) fn read_row(row: &rusqlite::Row<'_>, column_count: usize) -> rusqlite::Result<Row> {
    let mut values = Vec::with_capacity(column_count);
    for index in 0..column_count {
        values.push(row.get::<_, Value>(index)?);
    }
    Ok(Row::new(values))
}

pub(crate) fn log_sql(event: &str, statement: &Statement) {
    debug!(
        "event={} module=db status=start params={} sql={}",
        event,
        statement.params().len(),
        sanitize_message(statement.sql(), MAX_LOGGED_SQL_CHARS)
    );
}

#[cfg(test)]
mod tests {
    use super::execute;
    use crate::db::Statement;
    use rusqlite::types::Value;
    use rusqlite::Connection;

    #[test]
    fn execute_returns_owned_rows_with_bound_params() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO t (name) VALUES ('a'), ('b'), ('c');",
        )
        .unwrap();

        let rows = execute(
            &conn,
            &Statement::new("SELECT id, name FROM t WHERE id > ?1 ORDER BY id").bind(1_i64),
        )
        .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get_i64(0), Some(2));
        assert_eq!(rows[1].get(1), Some(&Value::Text("c".to_string())));
    }

    #[test]
    fn execute_runs_statements_without_result_columns() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT);")
            .unwrap();

        let rows = execute(
            &conn,
            &Statement::new("INSERT INTO t (name) VALUES (?1)").bind("z".to_string()),
        )
        .unwrap();
        assert!(rows.is_empty());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn execute_surfaces_sql_errors_as_operation_failures() {
        let conn = Connection::open_in_memory().unwrap();
        let err = execute(&conn, &Statement::new("SELECT * FROM missing_table")).unwrap_err();
        assert_eq!(err.error_code(), "operation_failed");
    }
}
