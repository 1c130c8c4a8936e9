//! Error types for gxsync

use thiserror::Error;

use crate::{DataStatus, Trigger, VariableType};

/// Core gxsync errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GxError {
    // Argument errors
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Block size mismatch: expected {expected}, got {actual}")]
    BlockSizeMismatch { expected: usize, actual: usize },

    #[error("Checksum mismatch: block carries {stored:#018x}, computed {computed:#018x}")]
    ChecksumMismatch { stored: u64, computed: u64 },

    // Lookup errors
    #[error("No variable with the name {0}")]
    VariableNotFound(String),

    #[error("Block {0} has no registered variables")]
    BlockNotFound(u32),

    // Layout errors
    #[error("Invalid variable layout: {0}")]
    InvalidLayout(String),

    #[error("Block number {block} out of range 1..={max}")]
    BlockNumberOutOfRange { block: u32, max: u32 },

    #[error("Block overflow: {used} bytes of payload, {capacity} available")]
    BlockOverflow { used: usize, capacity: usize },

    // Format errors
    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unsupported checksum width: {0} bits")]
    UnsupportedChecksumWidth(u32),

    #[error("Cannot parse {raw:?} as {expected:?}")]
    InvalidNumber { raw: String, expected: VariableType },

    // Type errors
    #[error("Variable type mismatch for {name}: registry has {expected:?}, got {actual:?}")]
    TypeMismatch {
        name: String,
        expected: VariableType,
        actual: VariableType,
    },

    // State errors
    #[error("Trigger {trigger:?} not allowed with status {status:?}")]
    IllegalTrigger { trigger: Trigger, status: DataStatus },

    #[error("Retry queue full ({0} entries)")]
    QueueFull(usize),
}

/// Broad error category, used by callers to decide what to do with a failure
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Blank required input, or a received block that is the wrong size or fails its checksum
    Argument,
    /// Unknown variable name or block number
    NotFound,
    /// Overflowing layouts, wrong-sized values and unparseable numbers
    Format,
    /// Illegal state machine input or a saturated retry queue
    State,
}

impl GxError {
    /// Category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            GxError::InvalidArgument(_)
            | GxError::TypeMismatch { .. }
            | GxError::BlockSizeMismatch { .. }
            | GxError::ChecksumMismatch { .. } => ErrorCategory::Argument,
            GxError::VariableNotFound(_) | GxError::BlockNotFound(_) => ErrorCategory::NotFound,
            GxError::InvalidLayout(_)
            | GxError::BlockNumberOutOfRange { .. }
            | GxError::BlockOverflow { .. }
            | GxError::InvalidLength { .. }
            | GxError::UnsupportedChecksumWidth(_)
            | GxError::InvalidNumber { .. } => ErrorCategory::Format,
            GxError::IllegalTrigger { .. } | GxError::QueueFull(_) => ErrorCategory::State,
        }
    }
}

/// Result type for gxsync operations
pub type GxResult<T> = Result<T, GxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            GxError::InvalidArgument("name".into()).category(),
            ErrorCategory::Argument
        );
        assert_eq!(GxError::BlockNotFound(2).category(), ErrorCategory::NotFound);
        assert_eq!(
            GxError::ChecksumMismatch { stored: 1, computed: 2 }.category(),
            ErrorCategory::Argument
        );
        assert_eq!(
            GxError::BlockSizeMismatch { expected: 256, actual: 100 }.category(),
            ErrorCategory::Argument
        );
        assert_eq!(
            GxError::BlockOverflow { used: 300, capacity: 244 }.category(),
            ErrorCategory::Format
        );
        assert_eq!(
            GxError::IllegalTrigger {
                trigger: Trigger::NoAction,
                status: DataStatus::Synchronized,
            }
            .category(),
            ErrorCategory::State
        );
    }

    #[test]
    fn test_display() {
        let err = GxError::BlockNumberOutOfRange { block: 0, max: 1 };
        assert_eq!(err.to_string(), "Block number 0 out of range 1..=1");
    }
}
