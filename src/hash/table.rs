// Match index: weak-checksum bucket table over a fingerprint's blocks.
//
// Buckets are keyed by the low 16 bits of the weak checksum and hold the
// candidate blocks in fingerprint order. A sparse map beats a flat 65536-
// entry array here: block counts are usually far below the key space, and
// lookup stays average-case O(1). Candidates are confirmed by a linear scan
// with an early reject on weak inequality; the strong digest of the window
// is computed at most once per lookup, and only when some candidate's weak
// checksum matches.

use rustc_hash::FxHashMap;

use super::rolling::bucket;
use super::strong::StrongDigest;

/// One candidate block inside a bucket.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    /// 1-based block index in the fingerprint document.
    pub block_index: u32,
    /// Weak checksum of the block.
    pub weak: u32,
    /// Strong digest of the block.
    pub strong: StrongDigest,
}

/// Lookup index from weak checksums to candidate blocks.
///
/// Ephemeral: built once per patch operation and owned by that invocation.
#[derive(Debug, Default)]
pub struct MatchIndex {
    buckets: FxHashMap<u16, Vec<Candidate>>,
}

impl MatchIndex {
    /// Empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block to its bucket. Blocks sharing a bucket keep insertion
    /// order, so earlier fingerprint entries win ties.
    pub fn insert(&mut self, block_index: u32, weak: u32, strong: StrongDigest) {
        self.buckets.entry(bucket(weak)).or_default().push(Candidate {
            block_index,
            weak,
            strong,
        });
    }

    /// Find the first block whose weak checksum equals `weak` and whose
    /// strong digest equals the digest of `window`.
    ///
    /// Returns the 1-based block index of the hit.
    pub fn find(&self, weak: u32, window: &[u8]) -> Option<u32> {
        let candidates = self.buckets.get(&bucket(weak))?;
        let mut window_strong: Option<StrongDigest> = None;
        for candidate in candidates {
            if candidate.weak != weak {
                continue;
            }
            let strong = *window_strong.get_or_insert_with(|| StrongDigest::of(window));
            if candidate.strong == strong {
                return Some(candidate.block_index);
            }
        }
        None
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total candidates across all buckets.
    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    /// Whether the index holds no candidates.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
