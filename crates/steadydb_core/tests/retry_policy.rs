use rusqlite::types::Value;
use rusqlite::Connection;
use std::cell::Cell;
use std::time::{Duration, Instant};
use steadydb_core::{
    with_retry, AccessError, AccessResult, Cancellation, FailureLayer, Operation, RetryPolicy,
    Row, Rows, Statement,
};

fn probe() -> Statement {
    Statement::new("SELECT 1")
}

fn success_rows() -> Rows {
    vec![Row::new(vec![Value::Text("ok".to_string())])]
}

#[test]
fn two_failures_then_success_takes_three_attempts_and_two_pauses() {
    let conn = Connection::open_in_memory().unwrap();
    let delay = Duration::from_millis(15);
    let calls = Cell::new(0);
    let flaky = |_: &Connection, _: &Statement| -> AccessResult<Rows> {
        calls.set(calls.get() + 1);
        if calls.get() < 3 {
            return Err(AccessError::operation(format!("attempt {} failed", calls.get())));
        }
        Ok(success_rows())
    };

    let mut retrying = with_retry(RetryPolicy::new(3, delay).unwrap(), flaky);
    let started = Instant::now();
    let rows = retrying.run(&conn, &probe()).unwrap();

    assert_eq!(rows, success_rows());
    assert_eq!(calls.get(), 3);
    assert!(started.elapsed() >= delay * 2);
    let state = retrying.state();
    assert_eq!(state.attempt, 3);
    assert_eq!(state.pauses, 2);
    assert_eq!(state.paused_for, delay * 2);
    assert_eq!(state.earlier_failures.len(), 2);
    assert!(state.earlier_failures[0].contains("attempt 1 failed"));
}

#[test]
fn persistent_failure_surfaces_the_last_attempt() {
    let conn = Connection::open_in_memory().unwrap();
    let calls = Cell::new(0);
    let broken = |_: &Connection, _: &Statement| -> AccessResult<Rows> {
        calls.set(calls.get() + 1);
        Err(AccessError::operation(format!("attempt {} failed", calls.get())))
    };

    let mut retrying = with_retry(
        RetryPolicy::new(3, Duration::from_millis(1)).unwrap(),
        broken,
    );
    let err = retrying.run(&conn, &probe()).unwrap_err();

    assert_eq!(calls.get(), 3);
    assert_eq!(err.layer(), FailureLayer::Retry);
    match err {
        AccessError::ExhaustedRetries { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.to_string(), "operation failure: attempt 3 failed");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(retrying.state().pauses, 2);
}

#[test]
fn single_attempt_returns_the_failure_unwrapped() {
    let conn = Connection::open_in_memory().unwrap();
    let calls = Cell::new(0);
    let broken = |_: &Connection, _: &Statement| -> AccessResult<Rows> {
        calls.set(calls.get() + 1);
        Err(AccessError::operation("only attempt"))
    };

    let mut retrying = with_retry(RetryPolicy::no_retry(), broken);
    let err = retrying.run(&conn, &probe()).unwrap_err();

    assert_eq!(calls.get(), 1);
    assert_eq!(err.layer(), FailureLayer::Operation);
    assert_eq!(retrying.state().pauses, 0);
}

#[test]
fn success_is_never_retried() {
    let conn = Connection::open_in_memory().unwrap();
    let calls = Cell::new(0);
    let healthy = |_: &Connection, _: &Statement| -> AccessResult<Rows> {
        calls.set(calls.get() + 1);
        Ok(success_rows())
    };

    let mut retrying = with_retry(RetryPolicy::new(5, Duration::from_secs(10)).unwrap(), healthy);
    retrying.run(&conn, &probe()).unwrap();
    retrying.run(&conn, &probe()).unwrap();

    assert_eq!(calls.get(), 2);
    assert_eq!(retrying.state().attempt, 1);
}

#[test]
fn cancellation_interrupts_the_pause_between_attempts() {
    let conn = Connection::open_in_memory().unwrap();
    let token = Cancellation::new();
    let remote = token.clone();
    let calls = Cell::new(0);
    let broken = |_: &Connection, _: &Statement| -> AccessResult<Rows> {
        calls.set(calls.get() + 1);
        Err(AccessError::operation("transient"))
    };

    let canceller = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(30));
        remote.cancel();
    });
    let started = Instant::now();
    let mut retrying = with_retry(RetryPolicy::new(3, Duration::from_secs(30)).unwrap(), broken)
        .with_cancellation(token);
    let err = retrying.run(&conn, &probe()).unwrap_err();
    canceller.join().unwrap();

    assert!(matches!(err, AccessError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(30));
    assert_eq!(calls.get(), 1);
}

#[test]
fn cancelled_operation_is_not_retried() {
    let conn = Connection::open_in_memory().unwrap();
    let calls = Cell::new(0);
    let cancelled = |_: &Connection, _: &Statement| -> AccessResult<Rows> {
        calls.set(calls.get() + 1);
        Err(AccessError::Cancelled)
    };

    let mut retrying = with_retry(
        RetryPolicy::new(3, Duration::from_millis(1)).unwrap(),
        cancelled,
    );
    let err = retrying.run(&conn, &probe()).unwrap_err();

    assert!(matches!(err, AccessError::Cancelled));
    assert_eq!(calls.get(), 1);
}

#[test]
fn already_cancelled_token_skips_every_attempt() {
    let conn = Connection::open_in_memory().unwrap();
    let token = Cancellation::new();
    token.cancel();
    let calls = Cell::new(0);
    let healthy = |_: &Connection, _: &Statement| -> AccessResult<Rows> {
        calls.set(calls.get() + 1);
        Ok(success_rows())
    };

    let mut retrying =
        with_retry(RetryPolicy::new(3, Duration::ZERO).unwrap(), healthy).with_cancellation(token);

    assert!(matches!(
        retrying.run(&conn, &probe()),
        Err(AccessError::Cancelled)
    ));
    assert_eq!(calls.get(), 0);
}
