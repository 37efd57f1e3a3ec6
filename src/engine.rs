// Engine surface: the five operations, each long-running one in a plain
// form and a `_with` form taking injected capabilities.
//
// The phases compose into the three-way exchange:
//   destination:  build_fingerprint(B, dest)          -> fingerprint doc
//   source:       build_patch(&fingerprint, source)   -> patch doc
//   destination:  apply_patch(&patch, dest)           -> source bytes
// plus merge_fingerprints for multi-peer setups and suggest_block_size for
// picking B.

use crate::apply;
use crate::error::SyncError;
use crate::fingerprint::{self, FingerprintDocument};
use crate::options::SyncOptions;
use crate::patch::{self, PatchDocument};

pub use crate::config::suggest_block_size;

/// Fingerprint `data` in blocks of `block_size` bytes.
pub fn build_fingerprint(block_size: u32, data: &[u8]) -> Result<FingerprintDocument, SyncError> {
    fingerprint::generate(block_size, data, &mut SyncOptions::default())
}

/// [`build_fingerprint`] with progress/cancellation capabilities.
pub fn build_fingerprint_with(
    block_size: u32,
    data: &[u8],
    opts: &mut SyncOptions<'_>,
) -> Result<FingerprintDocument, SyncError> {
    fingerprint::generate(block_size, data, opts)
}

/// Build a patch that rewrites the fingerprinted destination into `source`.
pub fn build_patch(
    fingerprint: &FingerprintDocument,
    source: &[u8],
) -> Result<PatchDocument, SyncError> {
    patch::build(fingerprint, source, &mut SyncOptions::default())
}

/// [`build_patch`] with progress/cancellation capabilities.
pub fn build_patch_with(
    fingerprint: &FingerprintDocument,
    source: &[u8],
    opts: &mut SyncOptions<'_>,
) -> Result<PatchDocument, SyncError> {
    patch::build(fingerprint, source, opts)
}

/// Reconstruct the source buffer from a patch and the destination bytes.
pub fn apply_patch(patch: &PatchDocument, dest: &[u8]) -> Result<Vec<u8>, SyncError> {
    apply::apply(patch, dest, &mut SyncOptions::default())
}

/// [`apply_patch`] with progress/cancellation/trace capabilities.
pub fn apply_patch_with(
    patch: &PatchDocument,
    dest: &[u8],
    opts: &mut SyncOptions<'_>,
) -> Result<Vec<u8>, SyncError> {
    apply::apply(patch, dest, opts)
}

/// Union several fingerprint documents sharing one block size.
pub fn merge_fingerprints(docs: &[FingerprintDocument]) -> Result<FingerprintDocument, SyncError> {
    fingerprint::merge(docs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(block_size: u32, dest: &[u8], source: &[u8]) {
        let doc = build_fingerprint(block_size, dest).expect("fingerprint failed");
        let p = build_patch(&doc, source).expect("patch failed");
        let rebuilt = apply_patch(&p, dest).expect("apply failed");
        assert_eq!(
            rebuilt,
            source,
            "roundtrip mismatch (block_size={block_size}, dest={}, source={})",
            dest.len(),
            source.len()
        );
    }

    #[test]
    fn roundtrip_identity() {
        roundtrip(4, b"Hello, World!", b"Hello, World!");
    }

    #[test]
    fn roundtrip_full_replacement() {
        roundtrip(4, b"Hello, World!", b"Goodbye, Planet!");
    }

    #[test]
    fn roundtrip_append() {
        roundtrip(4, b"Hello", b"Hello, World!");
    }

    #[test]
    fn roundtrip_prepend() {
        roundtrip(4, b"World!", b"Hello, World!");
    }

    #[test]
    fn roundtrip_block_reorder() {
        roundtrip(5, b"AAAAA-BBBBB-CCCCC", b"CCCCC-AAAAA-BBBBB");
    }

    #[test]
    fn roundtrip_empty_destination() {
        roundtrip(4, b"", b"Hello, World!");
    }

    #[test]
    fn roundtrip_empty_source() {
        roundtrip(4, b"Hello, World!", b"");
    }

    #[test]
    fn roundtrip_both_empty() {
        roundtrip(4, b"", b"");
    }

    #[test]
    fn roundtrip_single_byte_change() {
        let dest: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        let mut source = dest.clone();
        source[2048] ^= 0xFF;
        roundtrip(64, &dest, &source);
    }

    #[test]
    fn roundtrip_middle_insert() {
        let dest = b"AAAABBBBCCCCDDDD";
        let source = b"AAAABBBBxyzCCCCDDDD";
        roundtrip(4, dest, source);
    }

    #[test]
    fn roundtrip_middle_delete() {
        let dest = b"AAAABBBBCCCCDDDD";
        let source = b"AAAABBBBDDDD";
        roundtrip(4, dest, source);
    }

    #[test]
    fn roundtrip_block_size_one() {
        roundtrip(1, b"abc", b"cba");
    }

    #[test]
    fn roundtrip_block_size_equals_input() {
        roundtrip(5, b"exact", b"exact plus tail");
    }

    #[test]
    fn roundtrip_block_size_larger_than_input() {
        // Clamped to half the destination length.
        roundtrip(1024, b"small dest", b"small dest grown");
    }

    #[test]
    fn roundtrip_single_byte_destination() {
        roundtrip(1, b"x", b"xy");
    }

    #[test]
    fn identity_patch_shape() {
        let dest = b"0123456789abcdef";
        let doc = build_fingerprint(4, dest).unwrap();
        let p = build_patch(&doc, dest).unwrap();
        assert_eq!(p.records().len(), 0);
        assert_eq!(p.matches(), &[1, 2, 3, 4]);
    }

    #[test]
    fn merged_fingerprint_finds_blocks_from_both_peers() {
        let a = build_fingerprint(5, b"AAAAA-BBBBB-CCCCC").unwrap();
        let b = build_fingerprint(5, b"DDDDD-EEEEE-AAAAA").unwrap();
        let merged = merge_fingerprints(&[a, b]).unwrap();
        let p = build_patch(&merged, b"AAAAA-EEEEE-BBBBB").unwrap();
        // One match per distinct 5-byte run: AAAAA from the first peer,
        // -EEEE from the second, -BBBB from the first.
        assert_eq!(p.matches(), &[1, 6, 2]);
    }

    #[test]
    fn suggested_sizes_roundtrip() {
        let dest: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        let mut source = dest.clone();
        source.extend_from_slice(b"tail growth");
        let block_size = suggest_block_size(dest.len() as u64);
        roundtrip(block_size, &dest, &source);
    }
}
