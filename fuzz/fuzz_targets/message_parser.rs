//! Fuzz target for IRC line parsing and dispatch
//!
//! Feeds arbitrary lines through the tokenizer and, when they parse, through
//! the session dispatcher. Neither may panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str;

use slirc_client::{Message, Session};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = str::from_utf8(data) {
        if input.is_empty() || input.len() > 8191 {
            return;
        }

        if let Ok(msg) = input.parse::<Message>() {
            let mut session = Session::new("fuzzer");
            let _ = session.feed(&msg);
        }

        let _ = slirc_client::LineCodec::sanitize(input.to_string());
    }
});
