//! Sample `users` table used by demos and integration tests.
//!
//! # Invariants
//! - `id` is a monotonically assigned integer primary key, the stable order
//!   key for page-mode streaming.
//! - Seeding is idempotent per email address.

use crate::db::StoreError;
use crate::error::{AccessError, AccessResult};
use log::{error, info};
use rusqlite::{params, Connection};
use serde::Deserialize;
use std::path::Path;
use uuid::Uuid;

const CREATE_USERS_SQL: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    age INTEGER NOT NULL
);";

/// One user to insert when seeding.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserRecord {
    pub name: String,
    pub email: String,
    pub age: i64,
}

impl UserRecord {
    pub fn new(name: impl Into<String>, email: impl Into<String>, age: i64) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            age,
        }
    }
}

/// Creates the `users` table when it does not exist yet.
pub fn ensure_users_table(conn: &Connection) -> AccessResult<()> {
    conn.execute_batch(CREATE_USERS_SQL)?;
    Ok(())
}

/// Inserts records whose email is not present yet and returns how many rows
/// were added. All inserts share one transaction.
pub fn seed_users(conn: &Connection, records: &[UserRecord]) -> AccessResult<usize> {
    ensure_users_table(conn)?;

    let tx = conn.unchecked_transaction()?;
    let mut inserted = 0;
    {
        let mut exists = tx.prepare("SELECT COUNT(*) FROM users WHERE email = ?1")?;
        let mut insert = tx.prepare(
            "INSERT INTO users (user_id, name, email, age) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for record in records {
            let count: i64 = exists.query_row([record.email.as_str()], |row| row.get(0))?;
            if count > 0 {
                continue;
            }
            insert.execute(params![
                Uuid::new_v4().to_string(),
                record.name.as_str(),
                record.email.as_str(),
                record.age,
            ])?;
            inserted += 1;
        }
    }
    tx.commit()?;

    info!(
        "event=seed_users module=db status=ok requested={} inserted={}",
        records.len(),
        inserted
    );
    Ok(inserted)
}

/// Reads seed records from a CSV file with a `name,email,age` header.
///
/// Extra columns are ignored; header order does not matter.
///
/// # Errors
/// - `Operation` when the file cannot be read or a record does not decode.
pub fn load_users_csv(path: impl AsRef<Path>) -> AccessResult<Vec<UserRecord>> {
    let path = path.as_ref();
    let records = read_user_rows(path).map_err(|err| {
        error!(
            "event=seed_load module=db status=error path={} error={}",
            path.display(),
            err
        );
        AccessError::Operation(StoreError::from(err))
    })?;

    info!(
        "event=seed_load module=db status=ok path={} records={}",
        path.display(),
        records.len()
    );
    Ok(records)
}

fn read_user_rows(path: &Path) -> csv::Result<Vec<UserRecord>> {
    let mut reader = csv::Reader::from_path(path)?;
    let records = reader.deserialize().collect::<csv::Result<Vec<UserRecord>>>()?;
    Ok(records)
}

/// Deterministic sample records: `user-{n}` aged `20 + n % 50`.
pub fn sample_users(count: usize) -> Vec<UserRecord> {
    (1..=count)
        .map(|n| {
            UserRecord::new(
                format!("user-{n}"),
                format!("user{n}@example.com"),
                20 + (n % 50) as i64,
            )
        })
        .collect()
}
