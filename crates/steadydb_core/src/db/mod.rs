//! Data-store boundary: connections, statements and owned rows.
//!
//! # Responsibility
//! - Open and release SQLite connections through a `Connector`.
//! - Execute one statement against one connection and return owned rows.
//! - Keep rusqlite details behind a small set of value types.
//!
//! # Invariants
//! - A connection opened by this module is closed exactly once.
//! - Rows returned to callers never borrow from a statement or connection.

use rusqlite::types::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod execute;
mod open;
mod scope;
pub mod seed;

pub use execute::execute;
pub(crate) use execute::{log_sql, read_row};
pub use open::{Connector, SqliteConnector};
pub use scope::{with_connection, ScopedConnection};

/// Owned result set of a fully executed statement.
pub type Rows = Vec<Row>;

/// Failure raised by the underlying data store or by an operation body.
#[derive(Debug)]
pub enum StoreError {
    Sqlite(rusqlite::Error),
    /// Seed data could not be read or decoded.
    Csv(csv::Error),
    /// Failure reported by caller code rather than by SQLite.
    Message(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::Csv(err) => write!(f, "seed data: {err}"),
            Self::Message(message) => write!(f, "{message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::Csv(err) => Some(err),
            Self::Message(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<csv::Error> for StoreError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    /// Creates a statement without bound parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Creates a statement with an explicit parameter list.
    pub fn with_params(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Appends one positional parameter.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.params.push(value.into());
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// One owned result row, columns in select-list order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the column as an integer when it is stored as one.
    pub fn get_i64(&self, index: usize) -> Option<i64> {
        match self.values.get(index)? {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns numeric columns (integer or real) widened to `f64`.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        match self.values.get(index)? {
            Value::Integer(value) => Some(*value as f64),
            Value::Real(value) => Some(*value),
            _ => None,
        }
    }

    pub fn get_text(&self, index: usize) -> Option<&str> {
        match self.values.get(index)? {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}
