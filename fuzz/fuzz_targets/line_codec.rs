//! Fuzz target for line reassembly
//!
//! The first byte picks a chunk size; the rest is the byte stream.

#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

use slirc_client::LineCodec;

fuzz_target!(|data: &[u8]| {
    let Some((&chunk, stream)) = data.split_first() else {
        return;
    };
    let chunk = usize::from(chunk.max(1));

    let mut codec = match LineCodec::with_max_len("utf-8", 1024) {
        Ok(codec) => codec,
        Err(_) => return,
    };
    let mut buf = BytesMut::new();
    for piece in stream.chunks(chunk) {
        buf.extend_from_slice(piece);
        loop {
            match codec.decode(&mut buf) {
                Ok(Some(line)) => assert!(!line.is_empty() && !line.contains("\r\n")),
                Ok(None) => break,
                Err(_) => return,
            }
        }
    }
});
