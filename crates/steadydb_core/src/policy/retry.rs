//! Bounded retry with a fixed delay between attempts.
//!
//! # Invariants
//! - At most `max_attempts` invocations of the inner operation per run.
//! - A pause happens only between a failed attempt and a following attempt.
//! - On exhaustion the surfaced failure is the one from the final attempt.
//! - Cancellation is never retried and interrupts a pending pause.
//!
//! Every failure except cancellation is retried; there is no transient-error
//! classifier.
//!
//! Attempts share the caller's connection. Under `transactional(with_retry(..))`
//! they also share one transaction, so writes made by a failed attempt are
//! still in place when the next attempt starts. A multi-statement operation
//! that can fail after a partial write must undo it itself or be made
//! idempotent, or its writes may be committed more than once.

use super::{Cancellation, Operation};
use crate::config::PolicyError;
use crate::db::Statement;
use crate::error::{AccessError, AccessResult};
use log::{error, warn};
use rusqlite::Connection;
use std::time::Duration;

/// Attempt budget and inter-attempt delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` must be at least 1.
    pub fn new(max_attempts: u32, delay: Duration) -> Result<Self, PolicyError> {
        if max_attempts == 0 {
            return Err(PolicyError::ZeroRetryAttempts);
        }
        Ok(Self {
            max_attempts,
            delay,
        })
    }

    /// Single attempt, no pause.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wraps `inner` with this policy.
    pub fn wrap<O: Operation>(self, inner: O) -> Retrying<O> {
        Retrying::new(self, inner)
    }
}

/// Diagnostics of the most recent run of a `Retrying` operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts made in the last run, `1..=max_attempts`.
    pub attempt: u32,
    /// Messages of failures that were followed by another attempt.
    pub earlier_failures: Vec<String>,
    /// Pauses completed between attempts.
    pub pauses: u32,
    pub paused_for: Duration,
}

/// Operation that re-invokes its inner operation on failure.
#[derive(Debug)]
pub struct Retrying<O> {
    inner: O,
    policy: RetryPolicy,
    cancellation: Cancellation,
    state: RetryState,
}

/// Wraps `inner` with `policy`.
pub fn with_retry<O: Operation>(policy: RetryPolicy, inner: O) -> Retrying<O> {
    Retrying::new(policy, inner)
}

impl<O> Retrying<O> {
    pub fn new(policy: RetryPolicy, inner: O) -> Self {
        Self {
            inner,
            policy,
            cancellation: Cancellation::new(),
            state: RetryState::default(),
        }
    }

    /// Observes `cancellation` before each attempt and during pauses.
    pub fn with_cancellation(mut self, cancellation: Cancellation) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn state(&self) -> &RetryState {
        &self.state
    }

    pub fn into_inner(self) -> O {
        self.inner
    }
}

impl<O: Operation> Operation for Retrying<O> {
    type Output = O::Output;

    fn run(&mut self, conn: &Connection, statement: &Statement) -> AccessResult<O::Output> {
        self.state = RetryState::default();
        let max_attempts = self.policy.max_attempts;

        loop {
            self.cancellation.check()?;
            self.state.attempt += 1;
            let attempt = self.state.attempt;

            let err = match self.inner.run(conn, statement) {
                Ok(value) => return Ok(value),
                Err(AccessError::Cancelled) => return Err(AccessError::Cancelled),
                Err(err) => err,
            };

            if attempt >= max_attempts {
                if max_attempts == 1 {
                    return Err(err);
                }
                error!(
                    "event=retry_exhausted module=policy status=error attempts={} error_code={} error={}",
                    attempt,
                    err.error_code(),
                    err
                );
                return Err(AccessError::ExhaustedRetries {
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            warn!(
                "event=retry_attempt module=policy status=error attempt={} max_attempts={} delay_ms={} error={}",
                attempt,
                max_attempts,
                self.policy.delay.as_millis(),
                err
            );
            self.state.earlier_failures.push(err.to_string());
            self.cancellation.pause(self.policy.delay)?;
            self.state.pauses += 1;
            self.state.paused_for += self.policy.delay;
        }
    }
}
