//! Fuzz target: raw control-call and console-line decoding
//!
//! The first 4 bytes pick the request number, the rest is the argument
//! buffer. The same bytes, read as text, go through the console parser.
//!
//! Invariants checked:
//! - No panics under any byte sequence
//! - A decoded log event never carries more than the record limit
//! - A decoded request always reports the code it was decoded from
//!
//! cargo fuzz run fuzz_raw_command

#![no_main]

use blackbox::app::commands::Command;
use blackbox::log_channel::MAX_MESSAGE_LEN;
use blackbox::protocol;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let (head, arg) = data.split_at(4);
    let request = u32::from_le_bytes([head[0], head[1], head[2], head[3]]);

    if let Ok(command) = protocol::decode(request, arg) {
        let code = protocol::decode_request(request).expect("decoded request has a code");
        assert_eq!(command.code(), code);
        if let Command::LogEvent(event) = &command {
            assert!(event.message.len() <= MAX_MESSAGE_LEN);
        }
    }

    if let Ok(line) = core::str::from_utf8(data) {
        let _ = protocol::parse_line(line, 5);
    }
});
