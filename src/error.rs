//! Error types for the IRC client.
//!
//! [`ClientError`] is what public operations return. [`ProtocolError`] covers
//! failures while framing the inbound byte stream, and [`MessageParseError`]
//! covers a single line that could not be tokenized.

use thiserror::Error;

/// Convenience type alias for Results using [`ClientError`].
pub type Result<T, E = ClientError> = std::result::Result<T, E>;

/// Errors surfaced to callers of the client API.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// I/O error while connecting, reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Framing or decoding failure on the inbound stream.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The configured host is not a valid TLS server name.
    #[error("invalid server name: {0}")]
    InvalidServerName(String),

    /// A secure connection was requested but TLS support is not compiled in.
    #[error("TLS requested but the `tls` feature is disabled")]
    TlsUnavailable,

    /// The connection task has stopped; no further commands can be sent.
    #[error("connection closed")]
    ConnectionClosed,

    /// Configuration file could not be read or parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Errors encountered while reassembling lines from the transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A line grew past the maximum length without a terminator.
    #[error("message too long: {actual} bytes (limit {limit})")]
    MessageTooLong {
        /// Bytes buffered so far.
        actual: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The requested text encoding label is not known.
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),
}

/// Errors encountered when tokenizing a single IRC line.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MessageParseError {
    /// Line was empty.
    #[error("empty message")]
    EmptyMessage,

    /// Command was missing or not alphanumeric.
    #[error("invalid command in {0:?}")]
    InvalidCommand(String),

    /// Parsing failed with positional context.
    #[error("parsing failed at position {position}: {context}")]
    ParseContext {
        /// Byte offset where parsing failed.
        position: usize,
        /// What was being parsed.
        context: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProtocolError::MessageTooLong {
            actual: 9000,
            limit: 8191,
        };
        assert_eq!(
            format!("{}", err),
            "message too long: 9000 bytes (limit 8191)"
        );

        let err = MessageParseError::ParseContext {
            position: 3,
            context: "parsing IRC command".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "parsing failed at position 3: parsing IRC command"
        );
    }

    #[test]
    fn test_error_conversion() {
        let io_err =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let client_err: ClientError = io_err.into();
        assert!(matches!(client_err, ClientError::Io(_)));

        let proto_err = ProtocolError::UnknownEncoding("klingon".to_string());
        let client_err: ClientError = proto_err.into();
        match client_err {
            ClientError::Protocol(ProtocolError::UnknownEncoding(label)) => {
                assert_eq!(label, "klingon")
            }
            other => panic!("Expected Protocol variant, got {other:?}"),
        }
    }

    #[test]
    fn test_protocol_error_source_chaining() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let client_err = ClientError::Protocol(ProtocolError::Io(io_err));
        let source = std::error::Error::source(&client_err);
        assert!(source.is_some());
        assert_eq!(source.unwrap().to_string(), "io error: eof");
    }
}
