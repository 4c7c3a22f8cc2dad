#![allow(dead_code)]

use rusqlite::Connection;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use steadydb_core::db::seed::{sample_users, seed_users};
use steadydb_core::{AccessError, AccessResult, Connector, SqliteConnector};
use tempfile::TempDir;

pub const USERS_BY_ID: &str = "SELECT id, name, email, age FROM users ORDER BY id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnEvent {
    Open,
    Close,
}

/// Connector that records every open/close it performs.
pub struct CountingConnector {
    inner: SqliteConnector,
    events: Mutex<Vec<ConnEvent>>,
    refuse_opens: AtomicBool,
}

impl CountingConnector {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            inner: SqliteConnector::new(path),
            events: Mutex::new(Vec::new()),
            refuse_opens: AtomicBool::new(false),
        }
    }

    pub fn refuse_opens(&self) {
        self.refuse_opens.store(true, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<ConnEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn opens(&self) -> usize {
        self.count(ConnEvent::Open)
    }

    pub fn closes(&self) -> usize {
        self.count(ConnEvent::Close)
    }

    fn count(&self, wanted: ConnEvent) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|event| **event == wanted)
            .count()
    }
}

impl Connector for CountingConnector {
    fn open(&self) -> AccessResult<Connection> {
        if self.refuse_opens.load(Ordering::SeqCst) {
            return Err(AccessError::connection("connection refused"));
        }
        let conn = self.inner.open()?;
        self.events.lock().unwrap().push(ConnEvent::Open);
        Ok(conn)
    }

    fn close(&self, conn: Connection) -> AccessResult<()> {
        self.events.lock().unwrap().push(ConnEvent::Close);
        self.inner.close(conn)
    }
}

/// Temp database file holding `user_count` seeded users.
pub fn seeded_db(user_count: usize) -> (TempDir, SqliteConnector) {
    let dir = tempfile::tempdir().unwrap();
    let connector = SqliteConnector::new(dir.path().join("users.db"));
    let conn = connector.open().unwrap();
    seed_users(&conn, &sample_users(user_count)).unwrap();
    connector.close(conn).unwrap();
    (dir, connector)
}

/// Seeded database plus a counting connector over the same file.
pub fn seeded_counting_db(user_count: usize) -> (TempDir, CountingConnector) {
    let (dir, connector) = seeded_db(user_count);
    (dir, CountingConnector::new(connector.path()))
}

pub fn count_users(connector: &impl Connector) -> i64 {
    let conn = connector.open().unwrap();
    let count = conn
        .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
        .unwrap();
    connector.close(conn).unwrap();
    count
}
