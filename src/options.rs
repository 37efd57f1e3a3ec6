// Per-operation capabilities: progress reporting, cancellation, and the
// apply-phase block trace.
//
// Capabilities are injected through `SyncOptions`; absence of a callback
// disables that channel. Callbacks run synchronously on the calling thread
// at fixed granularities (every block while fingerprinting, every 10·B
// bytes while matching, every patch record while applying).

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::SyncError;

// ---------------------------------------------------------------------------
// Cancellation token
// ---------------------------------------------------------------------------

/// Advisory cancellation token.
///
/// Cloning shares the underlying flag, so a token handed to a long-running
/// operation can be cancelled from another thread. Cancellation is observed
/// at the operation's progress granularity; the operation then aborts with
/// [`SyncError::Cancelled`] and discards all partial output.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a token in the not-cancelled state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Progress events
// ---------------------------------------------------------------------------

/// Running totals reported with patch-phase progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatchStats {
    /// Source bytes consumed so far.
    pub bytes_processed: u64,
    /// Matched blocks found so far.
    pub matches_found: u64,
    /// `matches_found · block_size`.
    pub bytes_matched: u64,
    /// Literal bytes emitted into patch records so far.
    pub bytes_sent: u64,
}

/// Progress event, one variant per phase.
///
/// For any single operation, events arrive with non-decreasing `percent`,
/// and the final event of a completed operation reports 100. A cancelled
/// operation never reports 100.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Fingerprint builder progress, emitted every 100 blocks and at the
    /// final block.
    Fingerprint {
        /// Blocks fingerprinted so far.
        blocks_processed: u64,
        /// Total blocks in the input.
        total_blocks: u64,
        /// Completion percentage.
        percent: f64,
    },
    /// Patch builder progress, emitted whenever the cursor advances more
    /// than 10 block sizes since the last event.
    Patch {
        /// Source bytes consumed so far.
        bytes_processed: u64,
        /// Total source length.
        total_bytes: u64,
        /// Completion percentage.
        percent: f64,
        /// Matched blocks found so far.
        matches_found: u64,
        /// Patch records emitted so far.
        patches_created: u64,
        /// Running totals.
        stats: PatchStats,
    },
    /// Applicator progress, emitted after every patch record.
    Apply {
        /// Matched blocks copied so far.
        blocks_applied: u64,
        /// Output bytes produced so far.
        bytes_written: u64,
        /// Completion percentage.
        percent: f64,
    },
}

impl ProgressEvent {
    /// Completion percentage of the event, regardless of phase.
    pub fn percent(&self) -> f64 {
        match *self {
            Self::Fingerprint { percent, .. }
            | Self::Patch { percent, .. }
            | Self::Apply { percent, .. } => percent,
        }
    }
}

/// Percentage of `done` out of `total`. Completion (including the empty
/// total) is exactly 100.0, never a rounded neighbour of it.
pub(crate) fn percent_of(done: u64, total: u64) -> f64 {
    if done >= total {
        100.0
    } else {
        done as f64 * 100.0 / total as f64
    }
}

// ---------------------------------------------------------------------------
// Apply trace
// ---------------------------------------------------------------------------

/// One output segment appended by the applicator, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockApplied {
    /// A block copied from the destination buffer.
    Matched {
        /// 1-based index of the destination block.
        block_index: u32,
        /// Bytes copied (the final destination block may be short).
        size: usize,
    },
    /// A literal run copied from a patch record.
    Literal {
        /// Bytes copied.
        size: usize,
    },
}

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Injected capabilities for a single operation.
///
/// All fields are optional; `SyncOptions::default()` disables every channel.
/// The same options value can drive several operations in sequence.
#[derive(Default)]
pub struct SyncOptions<'a> {
    /// Progress sink.
    pub on_progress: Option<Box<dyn FnMut(&ProgressEvent) + 'a>>,
    /// Cancellation token.
    pub signal: Option<CancelToken>,
    /// Apply-phase block trace sink.
    pub on_block_applied: Option<Box<dyn FnMut(&BlockApplied) + 'a>>,
}

impl<'a> SyncOptions<'a> {
    /// Options with every channel disabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a progress sink.
    pub fn on_progress(mut self, sink: impl FnMut(&ProgressEvent) + 'a) -> Self {
        self.on_progress = Some(Box::new(sink));
        self
    }

    /// Attach a cancellation token.
    pub fn signal(mut self, token: CancelToken) -> Self {
        self.signal = Some(token);
        self
    }

    /// Attach an apply-phase block trace sink.
    pub fn on_block_applied(mut self, sink: impl FnMut(&BlockApplied) + 'a) -> Self {
        self.on_block_applied = Some(Box::new(sink));
        self
    }

    /// Emit a progress event if a sink is attached.
    pub(crate) fn emit_progress(&mut self, event: ProgressEvent) {
        if let Some(sink) = self.on_progress.as_mut() {
            sink(&event);
        }
    }

    /// Emit a block trace event if a sink is attached.
    pub(crate) fn emit_block(&mut self, event: BlockApplied) {
        if let Some(sink) = self.on_block_applied.as_mut() {
            sink(&event);
        }
    }

    /// Fail with [`SyncError::Cancelled`] if the token has been triggered.
    pub(crate) fn check_cancelled(&self) -> Result<(), SyncError> {
        match &self.signal {
            Some(token) if token.is_cancelled() => Err(SyncError::Cancelled),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for SyncOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncOptions")
            .field("on_progress", &self.on_progress.is_some())
            .field("signal", &self.signal)
            .field("on_block_applied", &self.on_block_applied.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_starts_clear() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
    }

    #[test]
    fn cancel_is_shared_across_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn check_cancelled_maps_to_error() {
        let token = CancelToken::new();
        let opts = SyncOptions::new().signal(token.clone());
        assert!(opts.check_cancelled().is_ok());
        token.cancel();
        assert!(matches!(opts.check_cancelled(), Err(SyncError::Cancelled)));
    }

    #[test]
    fn progress_sink_receives_events() {
        let mut seen = Vec::new();
        {
            let mut opts = SyncOptions::new().on_progress(|ev| seen.push(ev.percent()));
            opts.emit_progress(ProgressEvent::Fingerprint {
                blocks_processed: 1,
                total_blocks: 2,
                percent: 50.0,
            });
            opts.emit_progress(ProgressEvent::Fingerprint {
                blocks_processed: 2,
                total_blocks: 2,
                percent: 100.0,
            });
        }
        assert_eq!(seen, vec![50.0, 100.0]);
    }

    #[test]
    fn empty_total_is_complete() {
        assert_eq!(percent_of(0, 0), 100.0);
        assert_eq!(percent_of(5, 10), 50.0);
    }
}
