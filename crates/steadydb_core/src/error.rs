//! Failure taxonomy shared by every access policy.
//!
//! # Invariants
//! - Every failure names the layer that produced it (`layer()`).
//! - Wrapping never drops the original cause: `source()` reaches it.

use crate::config::PolicyError;
use crate::db::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AccessResult<T> = Result<T, AccessError>;

/// Typed failure surfaced by the resilient access layer.
#[derive(Debug)]
pub enum AccessError {
    /// A connection handle could not be acquired or released.
    Connection(StoreError),
    /// The wrapped data-store call failed.
    Operation(StoreError),
    /// A transaction could not be started or committed.
    Transaction(StoreError),
    /// Every retry attempt failed; `last` is the failure of the final attempt.
    ExhaustedRetries {
        attempts: u32,
        last: Box<AccessError>,
    },
    /// The caller cancelled the unit of work.
    Cancelled,
    /// Streaming was requested with a zero batch or page size.
    InvalidBatchSize(usize),
    InvalidPolicy(PolicyError),
    /// A fan-out task panicked before producing an outcome.
    TaskPanicked(String),
}

/// Layer of the access stack that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureLayer {
    Connection,
    Operation,
    Transaction,
    Retry,
    Cancellation,
    Caller,
    FanOut,
}

impl FailureLayer {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connection => "connection",
            Self::Operation => "operation",
            Self::Transaction => "transaction",
            Self::Retry => "retry",
            Self::Cancellation => "cancellation",
            Self::Caller => "caller",
            Self::FanOut => "fan_out",
        }
    }
}

impl AccessError {
    /// Builds an operation failure from a caller-provided message.
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation(StoreError::Message(message.into()))
    }

    /// Builds a connection failure from a caller-provided message.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(StoreError::Message(message.into()))
    }

    pub fn layer(&self) -> FailureLayer {
        match self {
            Self::Connection(_) => FailureLayer::Connection,
            Self::Operation(_) => FailureLayer::Operation,
            Self::Transaction(_) => FailureLayer::Transaction,
            Self::ExhaustedRetries { .. } => FailureLayer::Retry,
            Self::Cancelled => FailureLayer::Cancellation,
            Self::InvalidBatchSize(_) | Self::InvalidPolicy(_) => FailureLayer::Caller,
            Self::TaskPanicked(_) => FailureLayer::FanOut,
        }
    }

    /// Stable code used in `error_code=` log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection_failed",
            Self::Operation(_) => "operation_failed",
            Self::Transaction(_) => "transaction_failed",
            Self::ExhaustedRetries { .. } => "retries_exhausted",
            Self::Cancelled => "cancelled",
            Self::InvalidBatchSize(_) => "invalid_batch_size",
            Self::InvalidPolicy(_) => "invalid_policy",
            Self::TaskPanicked(_) => "task_panicked",
        }
    }

    /// Returns the innermost failure, unwrapping retry exhaustion.
    pub fn root_failure(&self) -> &AccessError {
        match self {
            Self::ExhaustedRetries { last, .. } => last.root_failure(),
            other => other,
        }
    }
}

impl Display for AccessError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(err) => write!(f, "connection failure: {err}"),
            Self::Operation(err) => write!(f, "operation failure: {err}"),
            Self::Transaction(err) => write!(f, "transaction failure: {err}"),
            Self::ExhaustedRetries { attempts, last } => {
                write!(f, "all {attempts} attempts failed; last error: {last}")
            }
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::InvalidBatchSize(size) => {
                write!(f, "batch size must be greater than zero, got {size}")
            }
            Self::InvalidPolicy(err) => write!(f, "invalid access policy: {err}"),
            Self::TaskPanicked(message) => write!(f, "fan-out task panicked: {message}"),
        }
    }
}

impl Error for AccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connection(err) | Self::Operation(err) | Self::Transaction(err) => Some(err),
            Self::ExhaustedRetries { last, .. } => Some(last.as_ref()),
            Self::InvalidPolicy(err) => Some(err),
            Self::Cancelled | Self::InvalidBatchSize(_) | Self::TaskPanicked(_) => None,
        }
    }
}

impl From<rusqlite::Error> for AccessError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Operation(StoreError::Sqlite(value))
    }
}

impl From<StoreError> for AccessError {
    fn from(value: StoreError) -> Self {
        Self::Operation(value)
    }
}

impl From<PolicyError> for AccessError {
    fn from(value: PolicyError) -> Self {
        Self::InvalidPolicy(value)
    }
}
