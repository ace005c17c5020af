//! Per-gesture cancellation tokens
//!
//! Each suspending step of a gesture holds a token taken when the step
//! began. Starting a newer step from the same sequence invalidates every
//! older token, and resumed steps check their token before touching state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{DragError, DragResult};

/// Source of tokens; cloning shares the sequence
#[derive(Debug, Clone, Default)]
pub struct CancelSequence {
    current: Arc<AtomicU64>,
}

impl CancelSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new step, cancelling all outstanding tokens
    pub fn begin(&self) -> CancelToken {
        let id = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        CancelToken {
            current: self.current.clone(),
            id,
        }
    }

    /// Token for the step in progress without cancelling it
    pub fn current(&self) -> CancelToken {
        CancelToken {
            current: self.current.clone(),
            id: self.current.load(Ordering::SeqCst),
        }
    }

    /// Cancel all outstanding tokens
    pub fn cancel_all(&self) {
        self.current.fetch_add(1, Ordering::SeqCst);
    }
}

/// Handle checked after every await
#[derive(Debug, Clone)]
pub struct CancelToken {
    current: Arc<AtomicU64>,
    id: u64,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.current.load(Ordering::SeqCst) != self.id
    }

    /// `Err(DragError::Cancelled)` once superseded
    pub fn check(&self) -> DragResult<()> {
        if self.is_cancelled() {
            Err(DragError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Check several tokens at once
pub fn check_all(tokens: &[&CancelToken]) -> DragResult<()> {
    tokens.iter().try_for_each(|t| t.check())
}
