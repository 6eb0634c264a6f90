//! Fuzz target: `LogChannel` ring buffer
//!
//! Drives arbitrary append / drain / clear sequences against a small ring
//! and a plain `VecDeque` model.
//!
//! Invariants checked:
//! - No panics under arbitrary byte inputs
//! - Unread length never exceeds capacity
//! - Drained bytes always equal the oldest bytes of the model
//!
//! cargo fuzz run fuzz_log_ring

#![no_main]

use std::collections::VecDeque;

use blackbox::log_channel::LogChannel;
use libfuzzer_sys::fuzz_target;

const CAP: usize = 32;

fuzz_target!(|data: &[u8]| {
    let channel: LogChannel<CAP> = LogChannel::new();
    let mut model: VecDeque<u8> = VecDeque::new();

    for op in data.chunks(4) {
        match op[0] % 3 {
            0 => {
                let bytes = &op[1..];
                channel.append_raw(bytes);
                model.extend(bytes);
                while model.len() > CAP {
                    model.pop_front();
                }
            }
            1 => {
                let want = op.get(1).copied().unwrap_or(0) as usize % (CAP + 8);
                let mut out = vec![0u8; want];
                let n = channel.drain(&mut out);
                let expected: Vec<u8> = model.drain(..n.min(model.len())).collect();
                assert_eq!(&out[..n], expected.as_slice());
            }
            _ => {
                channel.clear();
                model.clear();
            }
        }
        assert!(channel.len() <= CAP);
        assert_eq!(channel.len(), model.len());
    }
});
