//! Error types for the tool layer

use sightline_core::{GeometryError, ItemId};
use thiserror::Error;

/// Failures reported by the host's item APIs
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HostError {
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),

    #[error("Host rejected the request: {0}")]
    Rejected(String),
}

pub type HostResult<T> = Result<T, HostError>;

/// Errors raised while handling a drag gesture
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DragError {
    /// A newer gesture superseded this one, not a fault
    #[error("Gesture cancelled")]
    Cancelled,

    #[error(transparent)]
    Host(#[from] HostError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl DragError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DragError::Cancelled)
    }
}

pub type DragResult<T> = Result<T, DragError>;

/// Swallow cancellation at a gesture handler boundary
pub(crate) fn finish_gesture(result: DragResult<()>) -> DragResult<()> {
    match result {
        Err(e) if e.is_cancelled() => {
            tracing::debug!("Gesture step abandoned");
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_cancellation_is_swallowed() {
        assert_eq!(finish_gesture(Err(DragError::Cancelled)), Ok(()));

        let failure = DragError::from(HostError::Rejected("offline".into()));
        assert!(!failure.is_cancelled());
        assert_eq!(finish_gesture(Err(failure.clone())), Err(failure));
    }

    #[test]
    fn test_display() {
        let id = Uuid::nil();
        let e = DragError::from(HostError::ItemNotFound(id));
        assert_eq!(e.to_string(), format!("Item not found: {}", id));
    }
}
