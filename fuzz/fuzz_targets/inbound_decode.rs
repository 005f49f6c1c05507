//! Fuzz target for inbound message decoding
//!
//! Arbitrary bytes go through every parser that sees raw viewhost text:
//! - `InboundMessage::parse` (dispatch table entry point)
//! - `reply_seqno` (blocking send interception)
//! - `Envelope::decode`
//! - `ViewportSpec::parse_list` (host-supplied viewport JSON)
//!
//! None of them may panic. Invalid input returns an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use viewbridge_proto::{Envelope, InboundMessage, ViewportSpec, reply_seqno};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(message) = InboundMessage::parse(raw) {
        // A parsed message always names a known kind
        assert!(!message.kind().is_empty());
    }
    let _ = reply_seqno(raw);
    let _ = Envelope::decode(raw);
    let _ = ViewportSpec::parse_list(raw);
});
