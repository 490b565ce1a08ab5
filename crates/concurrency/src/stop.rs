//! Process-wide stop signal
//!
//! Set once, either because the row target was reached or because the
//! process received an interrupt. Workers poll it before claiming a batch;
//! a batch already claimed runs to completion.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared, clonable stop flag.
#[derive(Debug, Clone, Default)]
pub struct StopFlag {
    inner: Arc<AtomicBool>,
}

impl StopFlag {
    /// Create a cleared flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that workers stop claiming work.
    #[inline]
    pub fn set(&self) {
        self.inner.store(true, Ordering::Release);
    }

    /// True once [`set`](Self::set) has been called on any clone.
    #[inline]
    pub fn is_set(&self) -> bool {
        self.inner.load(Ordering::Acquire)
    }
}
