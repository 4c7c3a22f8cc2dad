mod common;

use common::{seeded_counting_db, seeded_db, USERS_BY_ID};
use rusqlite::Connection;
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;
use steadydb_core::{
    concurrently, execute, AccessError, AccessResult, QueryCache, ReadTask, ResilientExecutor,
    Rows, Statement,
};

type BoxedRead<'a> = Box<dyn FnMut(&Connection, &Statement) -> AccessResult<Rows> + Send + 'a>;

fn boxed<'a, F>(read: F) -> BoxedRead<'a>
where
    F: FnMut(&Connection, &Statement) -> AccessResult<Rows> + Send + 'a,
{
    Box::new(read)
}

fn timed_read<'a>(
    name: &'static str,
    delay: Duration,
    fail: bool,
    start: &'a Barrier,
    finished: &'a Mutex<Vec<&'static str>>,
) -> BoxedRead<'a> {
    Box::new(move |conn: &Connection, statement: &Statement| {
        // Every task must be running before any of them can pass.
        start.wait();
        thread::sleep(delay);
        let outcome = if fail {
            Err(AccessError::operation(format!("task {name} failed")))
        } else {
            execute(conn, statement)
        };
        finished.lock().unwrap().push(name);
        outcome
    })
}

#[test]
fn outcomes_follow_input_order_not_completion_order() {
    let (_dir, connector) = seeded_counting_db(12);
    let start = Barrier::new(3);
    let finished = Mutex::new(Vec::new());

    let tasks = vec![
        ReadTask::new(
            Statement::new(USERS_BY_ID),
            timed_read("a", Duration::from_millis(300), false, &start, &finished),
        ),
        ReadTask::new(
            Statement::new(USERS_BY_ID),
            timed_read("b", Duration::ZERO, true, &start, &finished),
        ),
        ReadTask::new(
            Statement::new("SELECT id FROM users WHERE age > ?1 ORDER BY id").bind(25_i64),
            timed_read("c", Duration::from_millis(120), false, &start, &finished),
        ),
    ];

    let outcomes = concurrently(&connector, tasks);

    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].as_ref().unwrap().len(), 12);
    let failure = outcomes[1].as_ref().unwrap_err();
    assert!(failure.to_string().contains("task b failed"));
    assert!(outcomes[2].as_ref().unwrap().len() < 12);

    assert_eq!(*finished.lock().unwrap(), vec!["b", "c", "a"]);
    assert_eq!(connector.opens(), 3);
    assert_eq!(connector.closes(), 3);
}

#[test]
fn panicking_task_does_not_take_down_its_siblings() {
    let (_dir, connector) = seeded_counting_db(5);

    let tasks = vec![
        ReadTask::new(Statement::new(USERS_BY_ID), boxed(execute)),
        ReadTask::new(
            Statement::new(USERS_BY_ID),
            boxed(|_: &Connection, _: &Statement| -> AccessResult<Rows> {
                panic!("reader blew up")
            }),
        ),
        ReadTask::new(Statement::new(USERS_BY_ID), boxed(execute)),
    ];

    let outcomes = concurrently(&connector, tasks);

    assert_eq!(outcomes[0].as_ref().unwrap().len(), 5);
    match &outcomes[1] {
        Err(AccessError::TaskPanicked(message)) => assert!(message.contains("reader blew up")),
        other => panic!("expected a panicked task, got {other:?}"),
    }
    assert_eq!(outcomes[2].as_ref().unwrap().len(), 5);
    assert_eq!(connector.opens(), 3);
    assert_eq!(connector.closes(), 3);
}

#[test]
fn no_tasks_yield_no_outcomes() {
    let (_dir, connector) = seeded_counting_db(1);
    let tasks: Vec<ReadTask<BoxedRead<'_>>> = Vec::new();

    assert!(concurrently(&connector, tasks).is_empty());
    assert_eq!(connector.opens(), 0);
}

#[test]
fn executor_fetches_all_users_and_older_users_together() {
    let (_dir, connector) = seeded_db(60);
    let executor = ResilientExecutor::new(connector, Arc::new(QueryCache::new()));

    let outcomes = executor.fetch_concurrently(vec![
        Statement::new("SELECT id, name, email, age FROM users"),
        Statement::new("SELECT id, name, email, age FROM users WHERE age > ?1").bind(40_i64),
    ]);

    let all_users = outcomes[0].as_ref().unwrap();
    let older_users = outcomes[1].as_ref().unwrap();
    assert_eq!(all_users.len(), 60);
    assert!(!older_users.is_empty());
    assert!(older_users.len() < all_users.len());
    assert!(older_users
        .iter()
        .all(|row| row.get_i64(3).is_some_and(|age| age > 40)));
}

#[test]
fn one_failing_statement_leaves_the_other_outcome_intact() {
    let (_dir, connector) = seeded_db(4);
    let executor = ResilientExecutor::new(connector, Arc::new(QueryCache::new()));

    let outcomes = executor.fetch_concurrently(vec![
        Statement::new("SELECT * FROM missing_table"),
        Statement::new(USERS_BY_ID),
    ]);

    assert!(matches!(outcomes[0], Err(AccessError::Operation(_))));
    assert_eq!(outcomes[1].as_ref().unwrap().len(), 4);
}
