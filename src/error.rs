// Error kinds shared by every engine operation.
//
// Each kind carries a stable human-readable message; callers match on the
// variant, diagnostics match on the text. Non-fatal conditions (block-size
// clamping, "below recommended" warnings) do not appear here — they go
// through the `log` facade and never abort an operation.

use thiserror::Error;

use crate::config::MAX_BLOCK_SIZE;

/// Errors raised by fingerprinting, patch building, patch application, and
/// fingerprint merging.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Block size outside `1..=MAX_BLOCK_SIZE`.
    #[error("Block size must be between 1 and {MAX_BLOCK_SIZE}, got {got}")]
    InvalidBlockSize {
        /// The rejected block size.
        got: u64,
    },

    /// An argument is structurally unusable for the requested operation.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Merge called with zero documents.
    #[error("At least one fingerprint document required")]
    Empty,

    /// Merge inputs disagree on block size.
    #[error("All fingerprint documents must have the same block size (saw {first} and {other})")]
    BlockSizeMismatch {
        /// Block size of the first document.
        first: u32,
        /// The first disagreeing block size.
        other: u32,
    },

    /// A fingerprint document failed structural validation.
    #[error("Corrupt fingerprint document: {0}")]
    CorruptFingerprint(String),

    /// A patch document failed structural validation, or referenced a block
    /// the destination does not have.
    #[error("Corrupt patch document: {0}")]
    CorruptPatch(String),

    /// Cancellation was observed through the operation's token.
    #[error("Operation cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        assert_eq!(
            SyncError::InvalidBlockSize { got: 0 }.to_string(),
            "Block size must be between 1 and 1048576, got 0"
        );
        assert_eq!(SyncError::Cancelled.to_string(), "Operation cancelled");
        assert_eq!(
            SyncError::Empty.to_string(),
            "At least one fingerprint document required"
        );
        assert_eq!(
            SyncError::BlockSizeMismatch {
                first: 4,
                other: 8
            }
            .to_string(),
            "All fingerprint documents must have the same block size (saw 4 and 8)"
        );
    }
}
