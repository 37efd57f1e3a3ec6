// File-level helpers around the in-memory engine.
//
// The engine is a whole-buffer transformer by contract, so these wrappers
// read each file fully, run the operation, and write the result in one
// piece. Optionally computes SHA-256 checksums of the payloads for the
// stats (feature-gated behind `file-io`).

use std::path::Path;

use thiserror::Error;

use crate::config::suggest_block_size;
use crate::engine;
use crate::error::SyncError;
use crate::fingerprint::FingerprintDocument;
use crate::patch::PatchDocument;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by [`fingerprint_file`].
#[derive(Debug, Clone)]
pub struct FingerprintFileStats {
    /// Input file size in bytes.
    pub input_size: u64,
    /// Effective block size (after any clamping) written to the document.
    pub block_size: u32,
    /// Number of blocks fingerprinted.
    pub block_count: u64,
    /// Document output size in bytes.
    pub document_size: u64,
    /// SHA-256 of the input file (if the `file-io` feature is enabled).
    pub input_sha256: Option<[u8; 32]>,
}

/// Statistics returned by [`patch_file`].
#[derive(Debug, Clone)]
pub struct PatchFileStats {
    /// Source file size in bytes.
    pub source_size: u64,
    /// Patch output size in bytes.
    pub patch_size: u64,
    /// Matched destination blocks.
    pub match_count: u64,
    /// Patch records (literal runs).
    pub patch_count: u64,
    /// Total literal bytes carried by the patch.
    pub literal_bytes: u64,
    /// SHA-256 of the source file (if the `file-io` feature is enabled).
    pub source_sha256: Option<[u8; 32]>,
}

/// Statistics returned by [`apply_file`].
#[derive(Debug, Clone)]
pub struct ApplyFileStats {
    /// Destination file size in bytes.
    pub dest_size: u64,
    /// Patch file size in bytes.
    pub patch_size: u64,
    /// Reconstructed output size in bytes.
    pub output_size: u64,
    /// SHA-256 of the reconstructed output (if the `file-io` feature is enabled).
    pub output_sha256: Option<[u8; 32]>,
}

/// Statistics returned by [`merge_files`].
#[derive(Debug, Clone)]
pub struct MergeFileStats {
    /// Number of input documents merged.
    pub input_documents: u64,
    /// Blocks surviving deduplication.
    pub merged_block_count: u64,
    /// Merged document output size in bytes.
    pub document_size: u64,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Error type for file-level operations.
#[derive(Debug, Error)]
pub enum IoError {
    /// I/O error (file open, read, write).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Engine error.
    #[error(transparent)]
    Engine(#[from] SyncError),
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Fingerprint `input`, writing the document to `document`.
///
/// Without an explicit block size, one is suggested from the input length.
pub fn fingerprint_file(
    input: &Path,
    document: &Path,
    block_size: Option<u32>,
) -> Result<FingerprintFileStats, IoError> {
    let data = std::fs::read(input)?;
    let block_size = block_size.unwrap_or_else(|| suggest_block_size(data.len() as u64));

    let doc = engine::build_fingerprint(block_size, &data)?;
    let bytes = doc.to_bytes();
    std::fs::write(document, &bytes)?;

    Ok(FingerprintFileStats {
        input_size: data.len() as u64,
        block_size: doc.block_size(),
        block_count: doc.block_count() as u64,
        document_size: bytes.len() as u64,
        input_sha256: sha256(&data),
    })
}

/// Build a patch from a fingerprint document file and a source file.
pub fn patch_file(document: &Path, source: &Path, patch: &Path) -> Result<PatchFileStats, IoError> {
    let doc = FingerprintDocument::from_bytes(&std::fs::read(document)?)?;
    let source_data = std::fs::read(source)?;

    let p = engine::build_patch(&doc, &source_data)?;
    let bytes = p.to_bytes();
    std::fs::write(patch, &bytes)?;

    Ok(PatchFileStats {
        source_size: source_data.len() as u64,
        patch_size: bytes.len() as u64,
        match_count: p.matches().len() as u64,
        patch_count: p.records().len() as u64,
        literal_bytes: p.records().iter().map(|r| r.literal.len() as u64).sum(),
        source_sha256: sha256(&source_data),
    })
}

/// Reconstruct a source file from a destination file and a patch file.
pub fn apply_file(dest: &Path, patch: &Path, output: &Path) -> Result<ApplyFileStats, IoError> {
    let dest_data = std::fs::read(dest)?;
    let patch_bytes = std::fs::read(patch)?;
    let p = PatchDocument::from_bytes(&patch_bytes)?;

    let out = engine::apply_patch(&p, &dest_data)?;
    std::fs::write(output, &out)?;

    Ok(ApplyFileStats {
        dest_size: dest_data.len() as u64,
        patch_size: patch_bytes.len() as u64,
        output_size: out.len() as u64,
        output_sha256: sha256(&out),
    })
}

/// Merge several fingerprint document files into one.
pub fn merge_files(documents: &[&Path], output: &Path) -> Result<MergeFileStats, IoError> {
    let mut docs = Vec::with_capacity(documents.len());
    for path in documents {
        docs.push(FingerprintDocument::from_bytes(&std::fs::read(path)?)?);
    }

    let merged = engine::merge_fingerprints(&docs)?;
    let bytes = merged.to_bytes();
    std::fs::write(output, &bytes)?;

    Ok(MergeFileStats {
        input_documents: documents.len() as u64,
        merged_block_count: merged.block_count() as u64,
        document_size: bytes.len() as u64,
    })
}

#[cfg(feature = "file-io")]
fn sha256(data: &[u8]) -> Option<[u8; 32]> {
    use sha2::Digest;
    Some(sha2::Sha256::digest(data).into())
}

#[cfg(not(feature = "file-io"))]
fn sha256(_data: &[u8]) -> Option<[u8; 32]> {
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
