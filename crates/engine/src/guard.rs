//! Reentrancy guard
//!
//! One flag per engine. `enter` fails instead of blocking when the flag is
//! already set; the returned token clears it when dropped, on success and
//! error paths alike.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::EngineError;

#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: AtomicBool,
}

/// Proof that the guard is held
#[must_use = "the guard is released as soon as this is dropped"]
#[derive(Debug)]
pub struct Entered<'a> {
    guard: &'a ReentrancyGuard,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&self) -> Result<Entered<'_>, EngineError> {
        self.entered
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map(|_| Entered { guard: self })
            .map_err(|_| EngineError::Reentrant)
    }

    pub fn is_entered(&self) -> bool {
        self.entered.load(Ordering::Acquire)
    }
}

impl Drop for Entered<'_> {
    fn drop(&mut self) {
        self.guard.entered.store(false, Ordering::Release);
    }
}
