// Engine tuning constants and the block-size suggestion table.

/// Hard upper bound on the block size accepted by the engine (1 MiB).
pub const MAX_BLOCK_SIZE: u32 = 1 << 20;

/// Block sizes below this draw a diagnostic for inputs larger than
/// [`SMALL_INPUT_LEN`].
pub const RECOMMENDED_MIN_BLOCK_SIZE: u32 = 256;

/// Inputs at or below this length never draw the "below recommended" diagnostic.
pub const SMALL_INPUT_LEN: usize = 1000;

/// Fingerprint progress is reported every this many blocks.
pub const FINGERPRINT_PROGRESS_BLOCKS: usize = 100;

/// Patch progress is reported whenever the cursor advances by more than
/// this many block sizes since the last report.
pub const PATCH_PROGRESS_BLOCK_MULTIPLE: usize = 10;

/// Suggest a block size for an input of the given length.
///
/// Larger inputs get larger blocks: the fingerprint stays compact (20 bytes
/// per block on the wire) while small inputs keep enough blocks for matches
/// to be found at all.
pub fn suggest_block_size(file_size: u64) -> u32 {
    match file_size {
        0..50_000 => 512,
        50_000..500_000 => 2048,
        500_000..5_000_000 => 4096,
        5_000_000..50_000_000 => 8192,
        _ => 16384,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_mapping() {
        assert_eq!(suggest_block_size(0), 512);
        assert_eq!(suggest_block_size(49_999), 512);
        assert_eq!(suggest_block_size(50_000), 2048);
        assert_eq!(suggest_block_size(499_999), 2048);
        assert_eq!(suggest_block_size(500_000), 4096);
        assert_eq!(suggest_block_size(4_999_999), 4096);
        assert_eq!(suggest_block_size(5_000_000), 8192);
        assert_eq!(suggest_block_size(49_999_999), 8192);
        assert_eq!(suggest_block_size(50_000_000), 16384);
        assert_eq!(suggest_block_size(u64::MAX), 16384);
    }

    #[test]
    fn suggestions_stay_within_policy() {
        for size in [0, 1, 50_000, 500_000, 5_000_000, 50_000_000, u64::MAX] {
            let b = suggest_block_size(size);
            assert!(b >= 1 && b <= MAX_BLOCK_SIZE);
        }
    }
}
