#![no_main]

use std::sync::Arc;

use gxsync_core::Registry;
use gxsync_wire::{seal, BlockCodec, BLOCK_SIZE};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let codec = BlockCodec::new(Arc::new(Registry::builtin()));

    // Raw input almost never carries a valid trailer
    let _ = codec.extract_block(data);

    // Sealed input reaches the slot decoders
    if data.len() >= BLOCK_SIZE {
        let mut block = [0u8; BLOCK_SIZE];
        block.copy_from_slice(&data[..BLOCK_SIZE]);
        seal(&mut block);
        if let Ok(variables) = codec.extract_block(&block) {
            for variable in variables {
                let _ = variable.value();
            }
        }
    }
});
