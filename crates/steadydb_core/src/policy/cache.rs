//! Memoization of read results keyed by statement digest.
//!
//! # Responsibility
//! - Derive a deterministic key from statement text and bound parameters.
//! - Store successful read results in an injected, lock-guarded map.
//!
//! # Invariants
//! - Equal normalized text and equal parameters produce equal keys.
//! - Entries are never evicted or expired; only `clear` removes them.
//! - Failures are never stored.
//! - Only read-only statements are cached; writes always reach the inner
//!   operation.
//! - Concurrent misses on one key may compute twice; the first stored value
//!   wins and every caller returns the stored value.

use super::Operation;
use crate::db::{Rows, Statement};
use crate::error::AccessResult;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::Value;
use rusqlite::Connection;
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Hex-encoded BLAKE3 digest of a statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn for_statement(statement: &Statement) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(normalize_sql(statement.sql()).as_bytes());
        for param in statement.params() {
            hash_param(&mut hasher, param);
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trims and collapses whitespace runs so formatting does not split keys.
fn normalize_sql(sql: &str) -> String {
    WHITESPACE_RE.replace_all(sql.trim(), " ").into_owned()
}

// Tag + length prefixes keep `("ab", "c")` and `("a", "bc")` apart.
fn hash_param(hasher: &mut blake3::Hasher, param: &Value) {
    match param {
        Value::Null => {
            hasher.update(&[0u8]);
        }
        Value::Integer(value) => {
            hasher.update(&[1u8]);
            hasher.update(&value.to_le_bytes());
        }
        Value::Real(value) => {
            hasher.update(&[2u8]);
            hasher.update(&value.to_bits().to_le_bytes());
        }
        Value::Text(value) => {
            hasher.update(&[3u8]);
            hasher.update(&(value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
        Value::Blob(value) => {
            hasher.update(&[4u8]);
            hasher.update(&(value.len() as u64).to_le_bytes());
            hasher.update(value);
        }
    }
}

/// Process-wide result store, shared by handing out `Arc<QueryCache>`.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: Mutex<HashMap<CacheKey, Rows>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Rows> {
        self.lock().get(key).cloned()
    }

    /// Stores `rows` unless the key is already present and returns the
    /// stored value.
    pub fn insert(&self, key: CacheKey, rows: Rows) -> Rows {
        self.lock().entry(key).or_insert(rows).clone()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock cannot leave a half-written entry.
    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Rows>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Operation that serves repeated statements from a `QueryCache`.
#[derive(Debug)]
pub struct Cached<O> {
    cache: Arc<QueryCache>,
    inner: O,
}

/// Wraps a read operation so its results are memoized in `cache`.
pub fn cached<O>(cache: Arc<QueryCache>, inner: O) -> Cached<O>
where
    O: Operation<Output = Rows>,
{
    Cached { cache, inner }
}

impl<O> Operation for Cached<O>
where
    O: Operation<Output = Rows>,
{
    type Output = Rows;

    fn run(&mut self, conn: &Connection, statement: &Statement) -> AccessResult<Rows> {
        if !is_read_only(conn, statement) {
            debug!("event=cache_bypass module=policy reason=not_read_only");
            return self.inner.run(conn, statement);
        }

        let key = CacheKey::for_statement(statement);
        if let Some(rows) = self.cache.get(&key) {
            debug!("event=cache_hit module=policy key={} rows={}", key, rows.len());
            return Ok(rows);
        }

        debug!("event=cache_miss module=policy key={}", key);
        let rows = self.inner.run(conn, statement)?;
        Ok(self.cache.insert(key, rows))
    }
}

// Statements that fail to prepare are left to the inner operation to report.
fn is_read_only(conn: &Connection, statement: &Statement) -> bool {
    conn.prepare(statement.sql())
        .map(|stmt| stmt.readonly())
        .unwrap_or(false)
}
