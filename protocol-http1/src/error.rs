//! Error types for HTTP/1.1 encoding and parsing.

/// Error type for HTTP/1.1 codec operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Need more data to complete parsing.
    /// This is not a fatal error - the caller should buffer more data and retry.
    #[error("incomplete data")]
    Incomplete,

    /// The status line is not `HTTP/1.x NNN [reason]`.
    #[error("invalid status line: {0}")]
    InvalidStatusLine(String),

    /// A header line is malformed, or a header to be encoded contains
    /// characters that would break framing.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Content-Length is not a number, or several values disagree.
    #[error("invalid content-length: {0}")]
    InvalidContentLength(String),

    /// A chunk-size line could not be parsed.
    #[error("invalid chunk: {0}")]
    InvalidChunk(String),

    /// The response head exceeds [`MAX_HEAD_LEN`](crate::MAX_HEAD_LEN).
    #[error("response head too large: more than {0} bytes")]
    HeadTooLarge(usize),

    /// The peer closed the connection before the body was complete.
    #[error("connection closed before message completed")]
    UnexpectedEof,
}
