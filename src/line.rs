//! Line reassembly for the IRC byte stream.
//!
//! The transport hands us bytes at arbitrary chunk boundaries. [`LineCodec`]
//! buffers whatever follows the last `\r\n`, emits only complete lines in
//! arrival order, and never yields an empty line for adjacent terminators.

use bytes::{BufMut, BytesMut};
use encoding::Encoding;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::ProtocolError;

/// Longest line accepted before the terminator arrives.
pub const MAX_IRC_LINE_LEN: usize = 8191;

const CRLF: &[u8] = b"\r\n";

/// CRLF-delimited text codec with a configurable character encoding.
#[derive(Clone, Debug)]
pub struct LineCodec {
    encoding: &'static Encoding,
    next_index: usize,
    max_len: usize,
}

impl LineCodec {
    /// Create a codec for the given encoding label (e.g. `"utf-8"`, `"latin1"`).
    pub fn new(label: &str) -> Result<LineCodec, ProtocolError> {
        Self::with_max_len(label, MAX_IRC_LINE_LEN)
    }

    /// Create a codec with a custom maximum line length.
    pub fn with_max_len(label: &str, max_len: usize) -> Result<LineCodec, ProtocolError> {
        let encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| ProtocolError::UnknownEncoding(label.to_string()))?;
        Ok(LineCodec {
            encoding,
            next_index: 0,
            max_len,
        })
    }

    /// Name of the active encoding.
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }

    /// Cut an outbound line at the first CR or LF so one write is one line.
    pub fn sanitize(mut data: String) -> String {
        if let Some(pos) = data.find(['\r', '\n']) {
            data.truncate(pos);
        }
        data
    }
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|w| w == CRLF)
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        loop {
            // Back up one byte so a CR at the end of the previous chunk pairs
            // with an LF at the start of this one.
            let start = self.next_index.saturating_sub(1).min(src.len());

            let Some(offset) = find_crlf(&src[start..]) else {
                // A trailing CR may be the first half of the terminator.
                let pending = src.len() - usize::from(src.last() == Some(&b'\r'));
                if pending > self.max_len {
                    return Err(ProtocolError::MessageTooLong {
                        actual: src.len(),
                        limit: self.max_len,
                    });
                }
                self.next_index = src.len();
                return Ok(None);
            };

            let end = start + offset;
            let line = src.split_to(end + CRLF.len());
            self.next_index = 0;

            if end == 0 {
                continue;
            }

            let (text, had_errors) = self.encoding.decode_without_bom_handling(&line[..end]);
            if had_errors {
                warn!(
                    encoding = self.encoding.name(),
                    "replaced malformed sequences in inbound line"
                );
            }
            return Ok(Some(text.into_owned()));
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        match self.decode(buf)? {
            Some(line) => Ok(Some(line)),
            None => {
                if !buf.is_empty() {
                    warn!(bytes = buf.len(), "discarding unterminated data at end of stream");
                    buf.clear();
                }
                self.next_index = 0;
                Ok(None)
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = ProtocolError;

    fn encode(&mut self, msg: String, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        let line = LineCodec::sanitize(msg);
        let (bytes, _, had_unmappable) = self.encoding.encode(&line);
        if had_unmappable {
            warn!(
                encoding = self.encoding.name(),
                "replaced unmappable characters in outbound line"
            );
        }
        dst.reserve(bytes.len() + CRLF.len());
        dst.put_slice(&bytes);
        dst.put_slice(CRLF);
        Ok(())
    }
}
