#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use gxsync_core::{DataStatus, Registry, Trigger, FIRST_LONG, FIRST_NUMBER};
use gxsync_state::{DataStore, Slot, StoreConfig, Variable, VariableStore};
use gxsync_wire::BlockCodec;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum Op {
    Store { long: bool, status: u8, value: i32 },
    Arm { queued: bool, long: bool, trigger: u8 },
    Fire { queued: bool, long: bool, next: u8 },
    Retry,
}

fn name(long: bool) -> &'static str {
    if long {
        FIRST_LONG
    } else {
        FIRST_NUMBER
    }
}

fn slot(queued: bool) -> Slot {
    if queued {
        Slot::Queued
    } else {
        Slot::Stored
    }
}

fn trigger(index: u8) -> Trigger {
    Trigger::ALL[index as usize % Trigger::ALL.len()]
}

fuzz_target!(|ops: Vec<Op>| {
    let registry = Arc::new(Registry::builtin());
    let store = DataStore::with_config(Arc::clone(&registry), StoreConfig { max_queued: 1 });
    let codec = BlockCodec::new(Arc::clone(&registry));

    for op in ops {
        match op {
            Op::Store { long, status, value } => {
                let status = DataStatus::ALL[status as usize % DataStatus::ALL.len()];
                let variable = if long {
                    Variable::int64(&registry, FIRST_LONG, status, value as i64)
                } else {
                    Variable::int32(&registry, FIRST_NUMBER, status, value)
                };
                if let Ok(variable) = variable {
                    let _ = store.store(variable);
                }
            }
            Op::Arm { queued, long, trigger: t } => {
                let _ = store.set_trigger(slot(queued), name(long), trigger(t));
            }
            Op::Fire { queued, long, next } => {
                let _ = store.change_status(slot(queued), name(long), trigger(next));
            }
            Op::Retry => {
                let _ = store.retry_queued();
            }
        }

        assert!(store.queue_len() <= 1);
    }

    let block = codec.make_block(1, &store).expect("built-in block always encodes");
    codec.extract_block(&block).expect("own block always decodes");
});
