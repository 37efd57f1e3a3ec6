// Patch application: replay matched blocks and literal runs into the
// reconstructed source buffer.
//
// The reconstruction rule: before each literal run, copy every pending
// matched block whose index is <= the run's anchor; after the last run,
// copy the remaining matched blocks. Block j occupies
// dest[(j-1)·B .. (j-1)·B + min(B, |dest| - (j-1)·B)].

use crate::error::SyncError;
use crate::fingerprint::Numbering;
use crate::options::{BlockApplied, ProgressEvent, SyncOptions, percent_of};
use crate::patch::PatchDocument;

/// Reconstruct the source buffer from a patch and the destination bytes the
/// patch was built against.
///
/// Returns a freshly owned buffer; `dest` is only borrowed for the call.
/// A patch built against a merged fingerprint is rejected up front — its
/// block indices are labels, and replaying them positionally would
/// reconstruct garbage (see [`Numbering`]).
pub fn apply(
    patch: &PatchDocument,
    dest: &[u8],
    opts: &mut SyncOptions<'_>,
) -> Result<Vec<u8>, SyncError> {
    if patch.numbering() == Numbering::Labelled {
        return Err(SyncError::InvalidInput(
            "patch was built against a merged fingerprint; its block indices are labels, \
             not positions in a single destination buffer"
                .into(),
        ));
    }

    let width = patch.block_size() as usize;
    let dest_blocks = dest.len().div_ceil(width);
    let matches = patch.matches();
    let records = patch.records();

    // Fast path: an unchanged source serializes as the full sequential match
    // list with no literals. The sequential check matters — a pure reorder
    // of full-file blocks also has P == 0 but must be replayed block by
    // block.
    if records.is_empty()
        && matches.len() == dest_blocks
        && matches.iter().enumerate().all(|(k, &j)| j as usize == k + 1)
    {
        opts.emit_progress(ProgressEvent::Apply {
            blocks_applied: matches.len() as u64,
            bytes_written: dest.len() as u64,
            percent: 100.0,
        });
        return Ok(dest.to_vec());
    }

    let literal_total: usize = records.iter().map(|r| r.literal.len()).sum();
    let mut out = Vec::with_capacity(matches.len() * width + literal_total);
    let total_units = (matches.len() + records.len()) as u64;
    let mut units_done = 0u64;
    let mut blocks_applied = 0u64;
    let mut m_idx = 0usize;

    for record in records {
        opts.check_cancelled()?;
        while m_idx < matches.len() && matches[m_idx] <= record.anchor {
            copy_block(dest, width, dest_blocks, matches[m_idx], &mut out, opts)?;
            m_idx += 1;
            units_done += 1;
            blocks_applied += 1;
        }
        out.extend_from_slice(&record.literal);
        opts.emit_block(BlockApplied::Literal {
            size: record.literal.len(),
        });
        units_done += 1;
        opts.emit_progress(ProgressEvent::Apply {
            blocks_applied,
            bytes_written: out.len() as u64,
            percent: percent_of(units_done, total_units),
        });
    }

    opts.check_cancelled()?;
    while m_idx < matches.len() {
        copy_block(dest, width, dest_blocks, matches[m_idx], &mut out, opts)?;
        m_idx += 1;
        blocks_applied += 1;
    }

    opts.emit_progress(ProgressEvent::Apply {
        blocks_applied,
        bytes_written: out.len() as u64,
        percent: 100.0,
    });
    Ok(out)
}

fn copy_block(
    dest: &[u8],
    width: usize,
    dest_blocks: usize,
    index: u32,
    out: &mut Vec<u8>,
    opts: &mut SyncOptions<'_>,
) -> Result<(), SyncError> {
    if index == 0 || index as usize > dest_blocks {
        return Err(SyncError::CorruptPatch(format!(
            "matched block index {index} outside 1..={dest_blocks}"
        )));
    }
    let start = (index as usize - 1) * width;
    let end = (start + width).min(dest.len());
    out.extend_from_slice(&dest[start..end]);
    opts.emit_block(BlockApplied::Matched {
        block_index: index,
        size: end - start,
    });
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::CancelToken;
    use crate::{fingerprint, patch};

    fn roundtrip(block_size: u32, dest: &[u8], source: &[u8]) -> Vec<u8> {
        let doc = fingerprint::generate(block_size, dest, &mut SyncOptions::default()).unwrap();
        let p = patch::build(&doc, source, &mut SyncOptions::default()).unwrap();
        apply(&p, dest, &mut SyncOptions::default()).unwrap()
    }

    #[test]
    fn identity_roundtrip() {
        assert_eq!(roundtrip(4, b"Hello, World!", b"Hello, World!"), b"Hello, World!");
    }

    #[test]
    fn fast_path_returns_owned_copy() {
        let dest = b"0123456789abcdef";
        let doc = fingerprint::generate(4, dest, &mut SyncOptions::default()).unwrap();
        let p = patch::build(&doc, dest, &mut SyncOptions::default()).unwrap();
        assert!(p.records().is_empty());
        let out = apply(&p, dest, &mut SyncOptions::default()).unwrap();
        assert_eq!(out, dest);
    }

    #[test]
    fn fast_path_skipped_for_reordered_full_file() {
        // P == 0 but the match list is a reorder; the general path must run.
        let dest = b"AAAABBBB";
        let doc = fingerprint::generate(4, dest, &mut SyncOptions::default()).unwrap();
        let p = patch::build(&doc, b"BBBBAAAA", &mut SyncOptions::default()).unwrap();
        assert!(p.records().is_empty());
        assert_eq!(p.matches(), &[2, 1]);
        assert_eq!(apply(&p, dest, &mut SyncOptions::default()).unwrap(), b"BBBBAAAA");
    }

    #[test]
    fn reconstructs_reordered_source() {
        assert_eq!(
            roundtrip(5, b"AAAAA-BBBBB-CCCCC", b"CCCCC-AAAAA-BBBBB"),
            b"CCCCC-AAAAA-BBBBB"
        );
    }

    #[test]
    fn reconstructs_from_empty_destination() {
        assert_eq!(roundtrip(4, b"", b"Hello, World!"), b"Hello, World!");
    }

    #[test]
    fn reconstructs_empty_source() {
        assert_eq!(roundtrip(4, b"Hello, World!", b""), b"");
    }

    #[test]
    fn rejects_out_of_range_block_index() {
        let doc = fingerprint::generate(4, b"abcdefgh", &mut SyncOptions::default()).unwrap();
        let p = patch::build(&doc, b"abcdefgh", &mut SyncOptions::default()).unwrap();
        let mut bytes = p.to_bytes();
        // Rewrite the first match index to 99.
        bytes[12..16].copy_from_slice(&99u32.to_le_bytes());
        let tampered = PatchDocument::from_bytes(&bytes).unwrap();
        let err = apply(&tampered, b"abcdefgh", &mut SyncOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::CorruptPatch(_)));
    }

    #[test]
    fn rejects_zero_block_index() {
        let doc = fingerprint::generate(4, b"abcdefgh", &mut SyncOptions::default()).unwrap();
        let p = patch::build(&doc, b"abcdefgh", &mut SyncOptions::default()).unwrap();
        let mut bytes = p.to_bytes();
        bytes[12..16].copy_from_slice(&0u32.to_le_bytes());
        let tampered = PatchDocument::from_bytes(&bytes).unwrap();
        let err = apply(&tampered, b"abcdefgh", &mut SyncOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::CorruptPatch(_)));
    }

    #[test]
    fn rejects_labelled_patch() {
        let doc = fingerprint::generate(4, b"aaaabbbb", &mut SyncOptions::default()).unwrap();
        let merged = fingerprint::merge(&[doc]).unwrap();
        let p = patch::build(&merged, b"aaaabbbb", &mut SyncOptions::default()).unwrap();
        let err = apply(&p, b"aaaabbbb", &mut SyncOptions::default()).unwrap_err();
        assert!(matches!(err, SyncError::InvalidInput(_)));
    }

    #[test]
    fn trace_events_follow_output_order() {
        let dest = b"AAAA1111BBBB";
        let source = b"xxAAAA1111zz";
        let doc = fingerprint::generate(4, dest, &mut SyncOptions::default()).unwrap();
        let p = patch::build(&doc, source, &mut SyncOptions::default()).unwrap();

        let mut events = Vec::new();
        let mut opts = SyncOptions::new().on_block_applied(|ev| events.push(*ev));
        let out = apply(&p, dest, &mut opts).unwrap();
        drop(opts);

        assert_eq!(out, source);
        assert_eq!(
            events,
            vec![
                BlockApplied::Literal { size: 2 },
                BlockApplied::Matched {
                    block_index: 1,
                    size: 4
                },
                BlockApplied::Matched {
                    block_index: 2,
                    size: 4
                },
                BlockApplied::Literal { size: 2 },
            ]
        );
    }

    #[test]
    fn short_final_block_copies_its_true_length() {
        // dest tail block "ab" is 2 bytes; replaying it must copy 2 bytes.
        let dest = b"0123ab";
        let source = b"zz0123ab";
        let doc = fingerprint::generate(4, dest, &mut SyncOptions::default()).unwrap();
        let p = patch::build(&doc, source, &mut SyncOptions::default()).unwrap();

        let mut sizes = Vec::new();
        let mut opts = SyncOptions::new().on_block_applied(|ev| {
            if let BlockApplied::Matched { size, .. } = ev {
                sizes.push(*size);
            }
        });
        let out = apply(&p, dest, &mut opts).unwrap();
        drop(opts);

        assert_eq!(out, source);
        assert_eq!(sizes, vec![4, 2]);
    }

    #[test]
    fn progress_ends_at_100() {
        let dest = b"AAAA1111BBBB";
        let source = b"xxAAAA1111zz";
        let doc = fingerprint::generate(4, dest, &mut SyncOptions::default()).unwrap();
        let p = patch::build(&doc, source, &mut SyncOptions::default()).unwrap();

        let mut percents = Vec::new();
        let mut opts = SyncOptions::new().on_progress(|ev| percents.push(ev.percent()));
        apply(&p, dest, &mut opts).unwrap();
        drop(opts);

        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents.last().copied(), Some(100.0));
    }

    #[test]
    fn cancellation_discards_output() {
        let token = CancelToken::new();
        token.cancel();
        let dest = b"AAAA1111BBBB";
        let doc = fingerprint::generate(4, dest, &mut SyncOptions::default()).unwrap();
        let p = patch::build(&doc, b"xxAAAA1111zz", &mut SyncOptions::default()).unwrap();
        let mut opts = SyncOptions::new().signal(token);
        let err = apply(&p, dest, &mut opts).unwrap_err();
        assert!(matches!(err, SyncError::Cancelled));
    }
}
