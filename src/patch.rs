// Patch documents and the matching loop that produces them.
//
// The builder slides a block-sized window over the source buffer: one byte
// at a time on a miss (updating the weak checksum by rolling), one block at
// a time on a hit. Unmatched bytes accumulate into literal runs anchored to
// the last matched block.
//
// Wire layout (all integers unsigned little-endian):
//   offset 0       u32  block size B
//   offset 4       u32  patch record count P
//   offset 8       u32  match count M
//   offset 12+4k   u32  matches[k]
//   then P records back to back: u32 anchor, u32 literal length L, L bytes.

use crate::config::{MAX_BLOCK_SIZE, PATCH_PROGRESS_BLOCK_MULTIPLE};
use crate::error::SyncError;
use crate::fingerprint::{FingerprintDocument, Numbering};
use crate::hash::rolling::RollingWeak;
use crate::hash::table::MatchIndex;
use crate::options::{PatchStats, ProgressEvent, SyncOptions, percent_of};

/// Wire size of the document header.
pub const HEADER_LEN: usize = 12;

// ---------------------------------------------------------------------------
// Document types
// ---------------------------------------------------------------------------

/// One literal run, anchored to the last matched block emitted before it.
///
/// `anchor == 0` means the literal precedes every match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchRecord {
    /// Block index of the most recent match preceding this run.
    pub anchor: u32,
    /// Bytes to insert verbatim.
    pub literal: Vec<u8>,
}

/// Matched-block references plus literal runs: everything a destination
/// needs to rebuild the source from its own bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDocument {
    block_size: u32,
    numbering: Numbering,
    matches: Vec<u32>,
    records: Vec<PatchRecord>,
}

impl PatchDocument {
    /// Block size the patch was built against.
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// Whether block references are positions or merge labels, inherited
    /// from the fingerprint the patch was built against.
    pub fn numbering(&self) -> Numbering {
        self.numbering
    }

    /// Matched destination block indices, in source order. The same index
    /// may appear more than once.
    pub fn matches(&self) -> &[u32] {
        &self.matches
    }

    /// Literal runs, in source order with non-decreasing anchors.
    pub fn records(&self) -> &[PatchRecord] {
        &self.records
    }

    /// Serialize to the wire format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let literal_total: usize = self.records.iter().map(|r| r.literal.len()).sum();
        let mut out =
            Vec::with_capacity(HEADER_LEN + 4 * self.matches.len() + 8 * self.records.len() + literal_total);
        out.extend_from_slice(&self.block_size.to_le_bytes());
        out.extend_from_slice(&(self.records.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.matches.len() as u32).to_le_bytes());
        for &index in &self.matches {
            out.extend_from_slice(&index.to_le_bytes());
        }
        for record in &self.records {
            out.extend_from_slice(&record.anchor.to_le_bytes());
            out.extend_from_slice(&(record.literal.len() as u32).to_le_bytes());
            out.extend_from_slice(&record.literal);
        }
        out
    }

    /// Parse a document from its wire bytes.
    ///
    /// Records carry their own lengths, so the walk is driven by the header
    /// counts; a literal length pointing past the end of the buffer, a
    /// truncated record, or trailing bytes is corruption.
    pub fn from_bytes(buf: &[u8]) -> Result<Self, SyncError> {
        if buf.len() < HEADER_LEN {
            return Err(SyncError::CorruptPatch(format!(
                "truncated header: {} bytes, need at least {HEADER_LEN}",
                buf.len()
            )));
        }
        let block_size = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if block_size == 0 || block_size > MAX_BLOCK_SIZE {
            return Err(SyncError::CorruptPatch(format!(
                "block size {block_size} outside 1..={MAX_BLOCK_SIZE}"
            )));
        }
        let patch_count = u32::from_le_bytes(buf[4..8].try_into().unwrap()) as usize;
        let match_count = u32::from_le_bytes(buf[8..12].try_into().unwrap()) as usize;

        let matches_end = HEADER_LEN as u64 + 4 * match_count as u64;
        if (buf.len() as u64) < matches_end {
            return Err(SyncError::CorruptPatch(format!(
                "match list of {match_count} entries overruns {}-byte document",
                buf.len()
            )));
        }
        let matches: Vec<u32> = buf[HEADER_LEN..matches_end as usize]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();

        let mut records = Vec::with_capacity(patch_count);
        let mut cursor = matches_end as usize;
        for _ in 0..patch_count {
            if buf.len() - cursor < 8 {
                return Err(SyncError::CorruptPatch(format!(
                    "truncated patch record at offset {cursor}"
                )));
            }
            let anchor = u32::from_le_bytes(buf[cursor..cursor + 4].try_into().unwrap());
            let literal_len =
                u32::from_le_bytes(buf[cursor + 4..cursor + 8].try_into().unwrap()) as usize;
            cursor += 8;
            if buf.len() - cursor < literal_len {
                return Err(SyncError::CorruptPatch(format!(
                    "literal of {literal_len} bytes at offset {cursor} overruns {}-byte document",
                    buf.len()
                )));
            }
            records.push(PatchRecord {
                anchor,
                literal: buf[cursor..cursor + literal_len].to_vec(),
            });
            cursor += literal_len;
        }
        if cursor != buf.len() {
            return Err(SyncError::CorruptPatch(format!(
                "{} trailing bytes after the last patch record",
                buf.len() - cursor
            )));
        }

        Ok(Self {
            block_size,
            numbering: Numbering::Positional,
            matches,
            records,
        })
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Build a patch that rewrites the fingerprinted destination into `source`.
///
/// Weak-checksum work is O(|source|): the window rolls one byte on a miss
/// and is recomputed from scratch only after a hit or in the short tail.
/// Strong digests are computed only when a bucket candidate's weak checksum
/// matches the window's.
pub fn build(
    fingerprint: &FingerprintDocument,
    source: &[u8],
    opts: &mut SyncOptions<'_>,
) -> Result<PatchDocument, SyncError> {
    let width = fingerprint.block_size() as usize;

    let mut index = MatchIndex::new();
    for (i, block) in fingerprint.blocks().iter().enumerate() {
        index.insert(i as u32 + 1, block.weak, block.strong);
    }

    let total_bytes = source.len() as u64;
    let progress_step = width * PATCH_PROGRESS_BLOCK_MULTIPLE;

    let mut matches: Vec<u32> = Vec::new();
    let mut records: Vec<PatchRecord> = Vec::new();
    let mut literal: Vec<u8> = Vec::new();
    let mut anchor: u32 = 0;
    let mut bytes_sent: u64 = 0;

    let mut cursor: usize = 0;
    let mut roll = RollingWeak::default();
    let mut have_roll = false;
    let mut last_progress: usize = 0;

    while cursor < source.len() {
        if cursor - last_progress > progress_step {
            opts.check_cancelled()?;
            emit_patch_progress(
                opts,
                cursor as u64,
                total_bytes,
                &matches,
                &records,
                width,
                bytes_sent,
            );
            last_progress = cursor;
        }

        let window_len = width.min(source.len() - cursor);
        let window = &source[cursor..cursor + window_len];

        // Roll only when the previous position also had a full-width window;
        // anywhere else (first position, after a hit, in the short tail) the
        // checksum is recomputed from scratch.
        let weak = if have_roll && window_len == width {
            roll.roll(source[cursor - 1], source[cursor + width - 1]);
            roll.value()
        } else {
            roll = RollingWeak::from_window(window);
            roll.value()
        };

        match index.find(weak, window) {
            Some(block_index) => {
                if !literal.is_empty() {
                    bytes_sent += literal.len() as u64;
                    records.push(PatchRecord {
                        anchor,
                        literal: std::mem::take(&mut literal),
                    });
                }
                matches.push(block_index);
                anchor = block_index;
                // A hit in the short tail still advances a full block; the
                // cursor overshoots the end and the loop guard terminates.
                cursor += width;
                have_roll = false;
            }
            None => {
                literal.push(source[cursor]);
                cursor += 1;
                have_roll = true;
            }
        }
    }

    if !literal.is_empty() {
        bytes_sent += literal.len() as u64;
        records.push(PatchRecord { anchor, literal });
    }

    emit_patch_progress(
        opts,
        total_bytes,
        total_bytes,
        &matches,
        &records,
        width,
        bytes_sent,
    );
    log::debug!(
        "patch built: {} matches, {} literal runs ({bytes_sent} literal bytes) over {} source bytes",
        matches.len(),
        records.len(),
        source.len()
    );

    Ok(PatchDocument {
        block_size: fingerprint.block_size(),
        numbering: fingerprint.numbering(),
        matches,
        records,
    })
}

fn emit_patch_progress(
    opts: &mut SyncOptions<'_>,
    bytes_processed: u64,
    total_bytes: u64,
    matches: &[u32],
    records: &[PatchRecord],
    width: usize,
    bytes_sent: u64,
) {
    let matches_found = matches.len() as u64;
    opts.emit_progress(ProgressEvent::Patch {
        bytes_processed,
        total_bytes,
        percent: percent_of(bytes_processed, total_bytes),
        matches_found,
        patches_created: records.len() as u64,
        stats: PatchStats {
            bytes_processed,
            matches_found,
            bytes_matched: matches_found * width as u64,
            bytes_sent,
        },
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
