//! Demo entry point for the resilient access layer.
//!
//! # Responsibility
//! - Seed a users database and run each access path once against it.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `steadydb_cli [DB_PATH [CSV_PATH]]`. Without a database path a
//! temporary database is used. Without a CSV file (`name,email,age` header)
//! generated sample users are seeded. Set `STEADYDB_LOG_DIR` to an absolute
//! directory to enable file logs.

use log::info;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use steadydb_core::db::seed::{load_users_csv, sample_users, seed_users};
use steadydb_core::{
    default_log_level, init_logging, stream_average, AccessResult, Connector, Policy, QueryCache,
    ResilientExecutor, SqliteConnector, Statement,
};

const SAMPLE_USER_COUNT: usize = 120;
const MIN_STREAMED_AGE: i64 = 25;
const MIN_FANOUT_AGE: i64 = 40;

fn main() -> ExitCode {
    if let Ok(log_dir) = std::env::var("STEADYDB_LOG_DIR") {
        if let Err(err) = init_logging(default_log_level(), &log_dir) {
            eprintln!("logging disabled: {err}");
        }
    }

    let mut args = std::env::args_os().skip(1);
    // Held until exit so the temporary database outlives the demo.
    let (_temp_dir, db_path) = match args.next() {
        Some(path) => (None, PathBuf::from(path)),
        None => match tempfile::tempdir() {
            Ok(dir) => {
                let path = dir.path().join("steadydb-demo.db");
                (Some(dir), path)
            }
            Err(err) => {
                eprintln!("failed to create temporary directory: {err}");
                return ExitCode::FAILURE;
            }
        },
    };

    let csv_path = args.next().map(PathBuf::from);

    match run(SqliteConnector::new(&db_path), csv_path.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("steadydb demo failed [{}]: {err}", err.error_code());
            ExitCode::FAILURE
        }
    }
}

fn run(connector: SqliteConnector, csv_path: Option<&Path>) -> AccessResult<()> {
    println!("steadydb_core version={}", steadydb_core::core_version());
    info!(
        "event=demo_start module=cli status=start db_path={}",
        connector.path().display()
    );

    let records = match csv_path {
        Some(path) => load_users_csv(path)?,
        None => sample_users(SAMPLE_USER_COUNT),
    };
    let conn = connector.open()?;
    let inserted = seed_users(&conn, &records)?;
    connector.close(conn)?;
    println!("seeded users records={} inserted={inserted}", records.len());

    let executor = ResilientExecutor::new(connector, Arc::new(QueryCache::new()));
    let policy = Policy::default();

    let all_users = Statement::new("SELECT id, name, email, age FROM users ORDER BY id");
    let first = executor.run_resilient(&all_users, &policy)?;
    let second = executor.run_resilient(&all_users, &policy)?;
    println!(
        "cached read rows={} repeat_rows={} cache_entries={}",
        first.len(),
        second.len(),
        executor.cache().len()
    );

    let streamed = executor.stream(&all_users, &policy, |batches| {
        let mut matched = 0usize;
        for row in batches
            .rows()
            .filter_rows(|row| row.get_i64(3).is_some_and(|age| age > MIN_STREAMED_AGE))
        {
            row?;
            matched += 1;
        }
        Ok((matched, batches.fetches()))
    })?;
    println!(
        "streamed users age>{MIN_STREAMED_AGE} rows={} fetches={}",
        streamed.0, streamed.1
    );

    let average = stream_average(
        executor.connector(),
        &Statement::new("SELECT age FROM users"),
        0,
        policy.batch_size,
    )?;
    println!("average age={average:.2}");

    let outcomes = executor.fetch_concurrently(vec![
        Statement::new("SELECT id, name, email, age FROM users"),
        Statement::new("SELECT id, name, email, age FROM users WHERE age > ?1")
            .bind(MIN_FANOUT_AGE),
    ]);
    for (label, outcome) in fanout_labels().iter().zip(outcomes) {
        match outcome {
            Ok(rows) => println!("concurrent read `{label}` rows={}", rows.len()),
            Err(err) => println!("concurrent read `{label}` failed: {err}"),
        }
    }

    info!("event=demo_finish module=cli status=ok");
    Ok(())
}

fn fanout_labels() -> [String; 2] {
    [
        "all users".to_string(),
        format!("users age>{MIN_FANOUT_AGE}"),
    ]
}
