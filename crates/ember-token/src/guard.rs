//! Scoped reentrancy guard.
//!
//! Rejects recursive invocation of the transfer pipeline from within its
//! own call stack (a notified collaborator calling back into `transfer`).
//! The entry token releases on drop, so every exit path, including error
//! returns, leaves the guard open for the next caller.

use std::sync::atomic::{AtomicBool, Ordering};

use ember_core::error::TokenError;

/// One-deep entry flag for the transfer pipeline.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the guard, failing if it is already held.
    ///
    /// # Errors
    ///
    /// [`TokenError::ReentrancyRejected`] if a pipeline invocation is
    /// already in flight on this instance.
    pub fn try_enter(&self) -> Result<GuardEntry<'_>, TokenError> {
        if self
            .entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(TokenError::ReentrancyRejected);
        }
        Ok(GuardEntry { guard: self })
    }
}

/// RAII token proving the guard is held; releases on drop.
#[must_use]
#[derive(Debug)]
pub struct GuardEntry<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardEntry<'_> {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::Release);
    }
}
