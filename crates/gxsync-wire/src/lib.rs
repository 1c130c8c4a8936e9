//! gxsync Wire Format - Fixed-size data blocks
//!
//! This crate implements the block format exchanged between sim and client:
//! - Block number header (4 bytes)
//! - Variable payloads at their registry offsets
//! - 0xFF filler, 0x20 for absent variables
//! - Fletcher-64 trailer (8 bytes)

pub mod block;
pub mod header;

pub use block::*;
pub use header::*;
