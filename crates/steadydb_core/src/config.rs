//! Access policy configuration.
//!
//! # Responsibility
//! - Hold the options recognized by `ResilientExecutor`.
//! - Validate option ranges before any connection is opened.
//!
//! # Invariants
//! - `retry_attempts >= 1`.
//! - `batch_size >= 1`.

use crate::policy::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Options for one resilient call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policy {
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// Serve repeated reads from the shared cache. Writes are never cached.
    pub use_cache: bool,
    /// Rows per batch or page for streaming entry points.
    pub batch_size: usize,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            use_cache: true,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl Policy {
    /// Policy for writes: default retries, no cache.
    pub fn for_writes() -> Self {
        Self {
            use_cache: false,
            ..Self::default()
        }
    }

    /// Parses a JSON policy object; omitted fields take defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, PolicyError> {
        let policy: Self =
            serde_json::from_str(raw).map_err(|err| PolicyError::Parse(err.to_string()))?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.retry_attempts == 0 {
            return Err(PolicyError::ZeroRetryAttempts);
        }
        if self.batch_size == 0 {
            return Err(PolicyError::ZeroBatchSize);
        }
        Ok(())
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn retry_policy(&self) -> Result<RetryPolicy, PolicyError> {
        RetryPolicy::new(self.retry_attempts, self.retry_delay())
    }
}

/// Policy option outside its accepted range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    ZeroRetryAttempts,
    ZeroBatchSize,
    Parse(String),
}

impl Display for PolicyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroRetryAttempts => write!(f, "retry_attempts must be at least 1"),
            Self::ZeroBatchSize => write!(f, "batch_size must be at least 1"),
            Self::Parse(message) => write!(f, "malformed policy: {message}"),
        }
    }
}

impl Error for PolicyError {}
