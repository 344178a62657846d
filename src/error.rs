//! Error classes raised by the editing core.
//!
//! Gesture-level failures never escape the state machine: entry points call
//! [`report`] and carry on. Only [`EditorError::Bug`] reaches the error log.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// Internal invariant violated (deselecting a non-member, undo state mismatch).
    #[error("bug: {0}")]
    Bug(String),

    /// The user asked for something that is not allowed (type mismatch, duplicate edge).
    #[error("{0}")]
    Rejected(String),

    /// A referenced object or edge no longer exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// A serialized fragment could not be encoded or decoded.
    #[error("persistence: {0}")]
    Persist(String),
}

impl EditorError {
    pub fn bug(msg: impl Into<String>) -> Self {
        Self::Bug(msg.into())
    }

    pub fn rejected(msg: impl Into<String>) -> Self {
        Self::Rejected(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn is_bug(&self) -> bool {
        matches!(self, Self::Bug(_))
    }
}

pub type EditorResult<T> = Result<T, EditorError>;

/// Send an error to its diagnostic channel.
pub fn report(err: &EditorError) {
    match err {
        EditorError::Bug(_) | EditorError::Persist(_) => {
            tracing::error!(target: "patchedit::error", "{err}");
        }
        EditorError::Rejected(_) => {
            tracing::info!(target: "patchedit::error", "{err}");
        }
        EditorError::NotFound(_) => {
            tracing::debug!(target: "patchedit::error", "{err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            EditorError::bug("canvas_undo 2").to_string(),
            "bug: canvas_undo 2"
        );
        assert_eq!(
            EditorError::rejected("can't connect signal outlet to control inlet").to_string(),
            "can't connect signal outlet to control inlet"
        );
        assert!(EditorError::bug("x").is_bug());
        assert!(!EditorError::not_found("x").is_bug());
    }
}
