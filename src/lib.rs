//! Blocksync: rsync-style binary deltas over block fingerprints.
//!
//! A *destination* holder fingerprints its bytes in fixed-size blocks (weak
//! rolling checksum + strong digest per block); a *source* holder matches a
//! sliding window against that fingerprint and emits a compact patch of
//! matched-block references plus literal runs; the destination replays the
//! patch against its own bytes to reconstruct the source version.
//!
//! The crate provides:
//! - The checksum kernel and match index (`hash`)
//! - Fingerprint and patch documents with their wire codecs
//!   (`fingerprint`, `patch`)
//! - The three phases plus fingerprint merging (`engine`, `apply`)
//! - File-oriented helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use blocksync::engine;
//!
//! let destination = b"Hello, World!";
//! let source = b"Hello, brave new World!";
//!
//! let fingerprint = engine::build_fingerprint(4, destination).unwrap();
//! let patch = engine::build_patch(&fingerprint, source).unwrap();
//! let rebuilt = engine::apply_patch(&patch, destination).unwrap();
//! assert_eq!(rebuilt, source);
//! ```

pub mod apply;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod hash;
pub mod io;
pub mod options;
pub mod patch;

#[cfg(feature = "cli")]
pub mod cli;
