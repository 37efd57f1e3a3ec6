// Checksum kernel and match index.
//
// This module provides:
// - The weak Adler-family rolling checksum (modulus 65536, by wire contract)
// - The 128-bit strong block digest, viewed as four opaque 32-bit lanes
// - The bucket table mapping weak checksums to candidate blocks

pub mod rolling;
pub mod strong;
pub mod table;
