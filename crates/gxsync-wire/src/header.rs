//! Block header and trailer
//!
//! Every block is 256 bytes:
//! - Bytes 0-3: Block number (LE)
//! - Bytes 4-247: Variable payloads, then 0xFF filler
//! - Bytes 248-255: Fletcher-64 over bytes 0-247 (LE)

use bytes::{Buf, BufMut};
use gxsync_core::{checksum_of, FletcherWidth, GxError, GxResult};

pub use gxsync_core::{BLOCK_NUMBER_SIZE, BLOCK_SIZE, CHECKSUM_SIZE, NUMBER_OF_BLOCKS};

/// Offset of the checksum trailer
pub const TRAILER_OFFSET: usize = BLOCK_SIZE - CHECKSUM_SIZE;

/// Payload area available to variables
pub const PAYLOAD_CAPACITY: usize = TRAILER_OFFSET - BLOCK_NUMBER_SIZE;

/// Unused space after the last payload
pub const FILLER_BYTE: u8 = 0xFF;

/// Slot content of a variable with no value
pub const ABSENT_BYTE: u8 = 0x20;

/// Checksum width protecting a block
pub const BLOCK_CHECKSUM: FletcherWidth = FletcherWidth::Fletcher64;

/// Block header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockHeader {
    pub block_number: u32,
}

impl BlockHeader {
    pub fn new(block_number: u32) -> Self {
        BlockHeader { block_number }
    }

    /// Parse header from bytes
    pub fn parse(buf: &[u8]) -> GxResult<Self> {
        if buf.len() < BLOCK_NUMBER_SIZE {
            return Err(GxError::InvalidLength {
                expected: BLOCK_NUMBER_SIZE,
                actual: buf.len(),
            });
        }

        let mut cursor = &buf[..BLOCK_NUMBER_SIZE];
        Ok(BlockHeader {
            block_number: cursor.get_u32_le(),
        })
    }

    /// Serialize header to the front of `buf`
    pub fn serialize(&self, buf: &mut [u8]) -> GxResult<()> {
        if buf.len() < BLOCK_NUMBER_SIZE {
            return Err(GxError::InvalidLength {
                expected: BLOCK_NUMBER_SIZE,
                actual: buf.len(),
            });
        }

        let mut cursor = &mut buf[..BLOCK_NUMBER_SIZE];
        cursor.put_u32_le(self.block_number);
        Ok(())
    }
}

/// Checksum of everything in front of the trailer
pub fn compute_checksum(block: &[u8; BLOCK_SIZE]) -> u64 {
    checksum_of(&block[..TRAILER_OFFSET], BLOCK_CHECKSUM)
}

/// Checksum stored in the trailer
pub fn read_checksum(block: &[u8; BLOCK_SIZE]) -> u64 {
    let mut cursor = &block[TRAILER_OFFSET..];
    cursor.get_u64_le()
}

/// Compute and store the trailer checksum
pub fn seal(block: &mut [u8; BLOCK_SIZE]) -> u64 {
    let checksum = compute_checksum(block);
    let mut cursor = &mut block[TRAILER_OFFSET..];
    cursor.put_u64_le(checksum);
    checksum
}
