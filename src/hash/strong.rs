// Strong block digest.
//
// 128-bit MD5 over a block's bytes, carried as four little-endian 32-bit
// lanes. The engine never interprets the lanes — it only compares them for
// bit-exact equality, so any 128-bit digest of comparable collision
// resistance would serve; both peers must simply agree on the algorithm.
// There is no on-wire algorithm identifier.

use std::fmt;

use md5::{Digest, Md5};

/// Digest width in bytes.
pub const STRONG_LEN: usize = 16;

/// Number of 32-bit lanes in a digest.
pub const STRONG_LANES: usize = 4;

/// 128-bit strong digest of one block, as four opaque 32-bit lanes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct StrongDigest([u32; STRONG_LANES]);

impl StrongDigest {
    /// Digest a block.
    pub fn of(block: &[u8]) -> Self {
        let raw: [u8; STRONG_LEN] = Md5::digest(block).into();
        Self::from_bytes(&raw)
    }

    /// Reconstruct a digest from its 16 wire bytes.
    pub fn from_bytes(bytes: &[u8; STRONG_LEN]) -> Self {
        let mut lanes = [0u32; STRONG_LANES];
        for (lane, chunk) in lanes.iter_mut().zip(bytes.chunks_exact(4)) {
            *lane = u32::from_le_bytes(chunk.try_into().unwrap());
        }
        Self(lanes)
    }

    /// The 16 wire bytes of the digest.
    pub fn to_bytes(self) -> [u8; STRONG_LEN] {
        let mut out = [0u8; STRONG_LEN];
        for (chunk, lane) in out.chunks_exact_mut(4).zip(self.0) {
            chunk.copy_from_slice(&lane.to_le_bytes());
        }
        out
    }

    /// The four 32-bit lanes.
    pub fn lanes(self) -> [u32; STRONG_LANES] {
        self.0
    }
}

impl fmt::Debug for StrongDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StrongDigest(")?;
        for byte in self.to_bytes() {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_digest() {
        // MD5("") = d41d8cd98f00b204e9800998ecf8427e (RFC 1321 test vector).
        let expected: [u8; 16] = [
            0xd4, 0x1d, 0x8c, 0xd9, 0x8f, 0x00, 0xb2, 0x04, 0xe9, 0x80, 0x09, 0x98, 0xec, 0xf8,
            0x42, 0x7e,
        ];
        assert_eq!(StrongDigest::of(b"").to_bytes(), expected);
    }

    #[test]
    fn abc_digest() {
        // MD5("abc") = 900150983cd24fb0d6963f7d28e17f72 (RFC 1321 test vector).
        let expected: [u8; 16] = [
            0x90, 0x01, 0x50, 0x98, 0x3c, 0xd2, 0x4f, 0xb0, 0xd6, 0x96, 0x3f, 0x7d, 0x28, 0xe1,
            0x7f, 0x72,
        ];
        assert_eq!(StrongDigest::of(b"abc").to_bytes(), expected);
    }

    #[test]
    fn bytes_roundtrip() {
        let digest = StrongDigest::of(b"roundtrip");
        assert_eq!(StrongDigest::from_bytes(&digest.to_bytes()), digest);
    }

    #[test]
    fn lanes_are_little_endian() {
        let bytes: [u8; 16] = [
            0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
            0x0f, 0x10,
        ];
        let digest = StrongDigest::from_bytes(&bytes);
        assert_eq!(digest.lanes()[0], 0x0403_0201);
        assert_eq!(digest.lanes()[3], 0x100f_0e0d);
    }

    #[test]
    fn distinct_blocks_distinct_digests() {
        assert_ne!(StrongDigest::of(b"block one"), StrongDigest::of(b"block two"));
    }
}
