//! Cooperative cancellation for blocking units of work.

use crate::error::{AccessError, AccessResult};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

/// Shared cancellation flag with an interruptible wait.
///
/// Clones observe the same flag. Once cancelled, a token stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the token cancelled and wakes every pending `pause`.
    pub fn cancel(&self) {
        let (flag, wakeup) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner) = true;
        wakeup.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        let (flag, _) = &*self.inner;
        *flag.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fails with `AccessError::Cancelled` when the token is cancelled.
    pub fn check(&self) -> AccessResult<()> {
        if self.is_cancelled() {
            return Err(AccessError::Cancelled);
        }
        Ok(())
    }

    /// Sleeps for `delay` unless cancelled first.
    pub fn pause(&self, delay: Duration) -> AccessResult<()> {
        let (flag, wakeup) = &*self.inner;
        let guard = flag.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _) = wakeup
            .wait_timeout_while(guard, delay, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        if *guard {
            return Err(AccessError::Cancelled);
        }
        Ok(())
    }
}
