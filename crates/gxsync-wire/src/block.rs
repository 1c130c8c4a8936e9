//! Block codec - building blocks from a store and reading them back
//!
//! Block = Header + Payload slots + Filler + Checksum trailer

use std::sync::Arc;

use gxsync_core::{DataStatus, GxError, GxResult, Registry, VariableAttributes};
use gxsync_state::{StoreOutcome, Variable, VariableStore};
use tracing::{debug, warn};

use crate::{
    compute_checksum, read_checksum, seal, BlockHeader, ABSENT_BYTE, BLOCK_NUMBER_SIZE,
    BLOCK_SIZE, FILLER_BYTE, PAYLOAD_CAPACITY, TRAILER_OFFSET,
};

/// Encodes and decodes blocks for one registry
#[derive(Clone, Debug)]
pub struct BlockCodec {
    registry: Arc<Registry>,
}

impl BlockCodec {
    pub fn new(registry: Arc<Registry>) -> Self {
        BlockCodec { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Build block `block_number` from the current store contents
    pub fn make_block(
        &self,
        block_number: u32,
        store: &impl VariableStore,
    ) -> GxResult<[u8; BLOCK_SIZE]> {
        let max = self.registry.number_of_blocks();
        if block_number < 1 || block_number > max {
            return Err(GxError::BlockNumberOutOfRange {
                block: block_number,
                max,
            });
        }

        let members = self.members(block_number)?;
        let used: usize = members.iter().map(|attrs| attrs.length).sum();
        if used > PAYLOAD_CAPACITY {
            return Err(GxError::BlockOverflow {
                used,
                capacity: PAYLOAD_CAPACITY,
            });
        }

        let mut block = [0u8; BLOCK_SIZE];
        BlockHeader::new(block_number).serialize(&mut block)?;

        // Filler first, so slots past the packed prefix stay intact
        block[BLOCK_NUMBER_SIZE + used..TRAILER_OFFSET].fill(FILLER_BYTE);

        let mut absent = 0;
        for attrs in members {
            let slot = &mut block[attrs.range()];
            match store.try_get(&attrs.name)? {
                Some(variable) => {
                    let bytes = variable.value_as_bytes();
                    if bytes.len() != attrs.length {
                        return Err(GxError::InvalidLength {
                            expected: attrs.length,
                            actual: bytes.len(),
                        });
                    }
                    slot.copy_from_slice(bytes);
                }
                None => {
                    slot.fill(ABSENT_BYTE);
                    absent += 1;
                }
            }
        }

        let checksum = seal(&mut block);
        debug!(block_number, absent, checksum, "block built");
        Ok(block)
    }

    /// Decode every present variable of a block
    ///
    /// Variables come back in slot order, tagged `FromClientToSim`.
    pub fn extract_block(&self, buf: &[u8]) -> GxResult<Vec<Variable>> {
        let slice = BlockSlice::from_bytes(buf)?;
        slice.verify()?;

        let block_number = slice.block_number();
        let members = self.members(block_number)?;

        let mut variables = Vec::with_capacity(members.len());
        for attrs in members {
            let bytes = slice.slot(attrs);
            if bytes.iter().all(|&b| b == ABSENT_BYTE) {
                continue;
            }
            variables.push(Variable::from_slot(
                &self.registry,
                &attrs.name,
                DataStatus::FromClientToSim,
                bytes,
            )?);
        }

        debug!(block_number, count = variables.len(), "block extracted");
        Ok(variables)
    }

    /// Extract a block and store each decoded variable
    pub fn apply_block(
        &self,
        buf: &[u8],
        store: &impl VariableStore,
    ) -> GxResult<Vec<(String, StoreOutcome)>> {
        self.extract_block(buf)?
            .into_iter()
            .map(|variable| {
                let name = variable.name().to_owned();
                store.store(variable).map(|outcome| (name, outcome))
            })
            .collect()
    }

    fn members(&self, block_number: u32) -> GxResult<Vec<&VariableAttributes>> {
        self.registry
            .variables_in_block(block_number)
            .ok_or(GxError::BlockNotFound(block_number))?
            .iter()
            .map(|name| self.registry.find(name))
            .collect()
    }
}

/// Zero-copy view of a received block
#[derive(Clone, Copy, Debug)]
pub struct BlockSlice<'a> {
    block: &'a [u8; BLOCK_SIZE],
}

impl<'a> BlockSlice<'a> {
    /// View `buf`, which must be exactly one block
    pub fn from_bytes(buf: &'a [u8]) -> GxResult<Self> {
        let block: &[u8; BLOCK_SIZE] =
            buf.try_into().map_err(|_| GxError::BlockSizeMismatch {
                expected: BLOCK_SIZE,
                actual: buf.len(),
            })?;
        Ok(BlockSlice { block })
    }

    pub fn header(&self) -> &'a [u8] {
        &self.block[..BLOCK_NUMBER_SIZE]
    }

    /// Payload area, filler included
    pub fn payload(&self) -> &'a [u8] {
        &self.block[BLOCK_NUMBER_SIZE..TRAILER_OFFSET]
    }

    pub fn trailer(&self) -> &'a [u8] {
        &self.block[TRAILER_OFFSET..]
    }

    pub fn block_number(&self) -> u32 {
        u32::from_le_bytes([self.block[0], self.block[1], self.block[2], self.block[3]])
    }

    pub fn stored_checksum(&self) -> u64 {
        read_checksum(self.block)
    }

    pub fn computed_checksum(&self) -> u64 {
        compute_checksum(self.block)
    }

    /// Check the trailer against the contents
    pub fn verify(&self) -> GxResult<()> {
        let stored = self.stored_checksum();
        let computed = self.computed_checksum();
        if stored != computed {
            warn!(stored, computed, "block checksum mismatch");
            return Err(GxError::ChecksumMismatch { stored, computed });
        }
        Ok(())
    }

    /// Raw bytes of a variable's slot
    pub fn slot(&self, attrs: &VariableAttributes) -> &'a [u8] {
        &self.block[attrs.range()]
    }
}
