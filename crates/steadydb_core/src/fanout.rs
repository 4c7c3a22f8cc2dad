//! Concurrent execution of independent reads with an ordered join.
//!
//! # Invariants
//! - Every task is started before any task is joined.
//! - Each task opens and closes its own connection.
//! - Outcomes are returned in submission order, one per task; a failing or
//!   panicking task does not cancel its siblings.

use crate::db::{with_connection, Connector, Statement};
use crate::error::{AccessError, AccessResult};
use crate::policy::Operation;
use log::{info, warn};
use std::any::Any;
use std::thread;
use std::time::Instant;

const MAX_PANIC_MESSAGE_CHARS: usize = 160;

/// One unit of fan-out work: a statement and the operation that runs it.
#[derive(Debug, Clone)]
pub struct ReadTask<O> {
    pub statement: Statement,
    pub operation: O,
}

impl<O: Operation> ReadTask<O> {
    pub fn new(statement: Statement, operation: O) -> Self {
        Self {
            statement,
            operation,
        }
    }
}

/// Runs every task on its own thread and joins all outcomes in order.
pub fn concurrently<C, O>(connector: &C, tasks: Vec<ReadTask<O>>) -> Vec<AccessResult<O::Output>>
where
    C: Connector + ?Sized,
    O: Operation + Send,
    O::Output: Send,
{
    let started_at = Instant::now();
    let task_count = tasks.len();

    let outcomes: Vec<AccessResult<O::Output>> = thread::scope(|scope| {
        let handles: Vec<_> = tasks
            .into_iter()
            .map(|task| {
                let ReadTask {
                    statement,
                    mut operation,
                } = task;
                scope.spawn(move || {
                    with_connection(connector, |conn| operation.run(conn, &statement))
                })
            })
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(index, handle)| {
                handle.join().unwrap_or_else(|payload| {
                    let message = panic_message(payload.as_ref());
                    warn!(
                        "event=fan_out module=fanout status=error task={} error_code=task_panicked",
                        index
                    );
                    Err(AccessError::TaskPanicked(message))
                })
            })
            .collect()
    });

    let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();
    info!(
        "event=fan_out module=fanout status=ok tasks={} failed={} duration_ms={}",
        task_count,
        failed,
        started_at.elapsed().as_millis()
    );
    outcomes
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    };
    crate::logging::sanitize_message(&message, MAX_PANIC_MESSAGE_CHARS)
}
