// Fingerprint documents: per-block weak+strong checksums over a destination
// buffer, plus the multi-peer merge operation.
//
// Wire layout (all integers unsigned little-endian):
//   offset 0        u32  block size B
//   offset 4        u32  block count N
//   offset 8+20i    u32  weak checksum of block i
//   offset 8+20i+4  16B  strong digest of block i
// Total size is exactly 8 + 20·N bytes.

use rustc_hash::FxHashSet;

use crate::config::{
    FINGERPRINT_PROGRESS_BLOCKS, MAX_BLOCK_SIZE, RECOMMENDED_MIN_BLOCK_SIZE, SMALL_INPUT_LEN,
};
use crate::error::SyncError;
use crate::hash::rolling::weak_checksum;
use crate::hash::strong::{STRONG_LEN, StrongDigest};
use crate::options::{ProgressEvent, SyncOptions, percent_of};

/// Wire size of the document header.
pub const HEADER_LEN: usize = 8;

/// Wire size of one block entry.
pub const ENTRY_LEN: usize = 4 + STRONG_LEN;

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

/// Checksums of one destination block. The 1-based block index is positional
/// within the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFingerprint {
    /// Weak rolling checksum of the block.
    pub weak: u32,
    /// Strong digest of the block.
    pub strong: StrongDigest,
}

/// What a block index in a document means.
///
/// After a merge, indices are dense labels with no relation to any single
/// destination buffer; the positional applicator refuses patches built
/// against labelled fingerprints. The wire formats carry no numbering field,
/// so parsed documents are always positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Numbering {
    /// Block `j` occupies `d[(j−1)·B ..]` of a concrete destination buffer.
    Positional,
    /// Block indices are labels resolved by the owner of a block pool.
    Labelled,
}

/// Ordered list of block fingerprints sharing one block size.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintDocument {
    block_size: u32,
    numbering: Numbering,
    blocks: Vec<BlockFingerprint>,
}

impl FingerprintDocument {
    /// Block size shared by every block (the final block may be shorter).
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Number of blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the document describes an empty buffer.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// The block fingerprints, in 1-based index order.
    pub fn blocks(&self) -> &[BlockFingerprint] {
        &self.blocks
    }

    /// Whether block indices are positions or labels.
    pub fn numbering(&self) -> Numbering {
        self.numbering
    }

    /// Serialize to the wire format. Output length is `8 + 20·N`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + ENTRY_LEN * self.blocks.len());
        out.extend_from_slice(&self.block_size.to_le_bytes());
        out.extend_from_slice(&(self.blocks.len() as u32).to_le_bytes());
        for block in &self.blocks {
            out.extend_from_slice(&block.weak.to_le_bytes());
            out.extend_from_slice(&block.strong.to_bytes());
        }
        out
    }

    /// Parse a document from its wire bytes.
    ///
    /// The declared block count must account for the buffer exactly; any
    /// shortfall or trailing bytes is corruption.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, SyncError> {
        if buf.len() < HEADER_LEN {
            return Err(SyncError::CorruptFingerprint(format!(
                "truncated header: {} bytes, need at least {HEADER_LEN}",
                buf.len()
            )));
        }
        let block_size = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if block_size == 0 || block_size > MAX_BLOCK_SIZE {
            return Err(SyncError::CorruptFingerprint(format!(
                "block size {block_size} outside 1..={MAX_BLOCK_SIZE}"
            )));
        }
        let count = u32::from_le_bytes(buf[4..8].try_into().unwrap()) as usize;
        let expected = HEADER_LEN as u64 + ENTRY_LEN as u64 * count as u64;
        if buf.len() as u64 != expected {
            return Err(SyncError::CorruptFingerprint(format!(
                "header declares {count} blocks ({expected} bytes), document has {} bytes",
                buf.len()
            )));
        }

        let mut blocks = Vec::with_capacity(count);
        for entry in buf[HEADER_LEN..].chunks_exact(ENTRY_LEN) {
            let weak = u32::from_le_bytes(entry[0..4].try_into().unwrap());
            let strong = StrongDigest::from_bytes(entry[4..ENTRY_LEN].try_into().unwrap());
            blocks.push(BlockFingerprint { weak, strong });
        }
        Ok(Self {
            block_size,
            numbering: Numbering::Positional,
            blocks,
        })
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Fingerprint `data` in non-overlapping blocks of `block_size` bytes.
///
/// The block size may be silently clamped for short inputs (see
/// [`effective_block_size`]); the clamped value is what lands in the
/// document header. Cancellation is observed at the top of every block.
pub fn generate(
    block_size: u32,
    data: &[u8],
    opts: &mut SyncOptions<'_>,
) -> Result<FingerprintDocument, SyncError> {
    if block_size == 0 || block_size > MAX_BLOCK_SIZE {
        return Err(SyncError::InvalidBlockSize {
            got: u64::from(block_size),
        });
    }
    let block_size = effective_block_size(block_size, data.len());
    let width = block_size as usize;
    let total_blocks = data.len().div_ceil(width) as u64;

    let mut blocks = Vec::with_capacity(total_blocks as usize);
    for (i, chunk) in data.chunks(width).enumerate() {
        opts.check_cancelled()?;
        blocks.push(BlockFingerprint {
            weak: weak_checksum(chunk),
            strong: StrongDigest::of(chunk),
        });
        let done = i as u64 + 1;
        if done % FINGERPRINT_PROGRESS_BLOCKS as u64 == 0 || done == total_blocks {
            opts.emit_progress(ProgressEvent::Fingerprint {
                blocks_processed: done,
                total_blocks,
                percent: percent_of(done, total_blocks),
            });
        }
    }
    if total_blocks == 0 {
        opts.emit_progress(ProgressEvent::Fingerprint {
            blocks_processed: 0,
            total_blocks: 0,
            percent: 100.0,
        });
    }
    log::debug!(
        "fingerprinted {} bytes into {total_blocks} blocks of {block_size}",
        data.len()
    );

    Ok(FingerprintDocument {
        block_size,
        numbering: Numbering::Positional,
        blocks,
    })
}

/// Apply the block-size policy for a given input length.
///
/// A block size larger than a non-empty input is clamped to half the input
/// (at least 1) so the input still yields more than one block to match
/// against. Small block sizes on large inputs are legal but draw a
/// diagnostic: the per-block wire overhead starts to dominate.
fn effective_block_size(requested: u32, input_len: usize) -> u32 {
    if input_len > 0 && requested as usize > input_len {
        let clamped = (input_len / 2).max(1) as u32;
        log::warn!(
            "block size {requested} exceeds input length {input_len}; clamping to {clamped}"
        );
        return clamped;
    }
    if requested < RECOMMENDED_MIN_BLOCK_SIZE && input_len > SMALL_INPUT_LEN {
        log::warn!(
            "block size {requested} is below the recommended minimum of \
             {RECOMMENDED_MIN_BLOCK_SIZE} for a {input_len}-byte input"
        );
    }
    requested
}

// ---------------------------------------------------------------------------
// Merger
// ---------------------------------------------------------------------------

/// Union several fingerprint documents sharing one block size.
///
/// Two entries are identical iff all five 32-bit fields (weak plus the four
/// strong lanes) are equal; survivors keep first-appearance order and are
/// renumbered densely. The result is labelled: its indices no longer name
/// positions in any single destination buffer (see [`Numbering`]).
pub fn merge(docs: &[FingerprintDocument]) -> Result<FingerprintDocument, SyncError> {
    let first = docs.first().ok_or(SyncError::Empty)?;
    let block_size = first.block_size();
    for doc in &docs[1..] {
        if doc.block_size() != block_size {
            return Err(SyncError::BlockSizeMismatch {
                first: block_size,
                other: doc.block_size(),
            });
        }
    }

    let mut seen: FxHashSet<(u32, [u32; 4])> = FxHashSet::default();
    let mut blocks = Vec::new();
    for doc in docs {
        for block in doc.blocks() {
            if seen.insert((block.weak, block.strong.lanes())) {
                blocks.push(*block);
            }
        }
    }

    Ok(FingerprintDocument {
        block_size,
        numbering: Numbering::Labelled,
        blocks,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
