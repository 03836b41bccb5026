//! Error types for the transport.

use std::io;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while building or using a connection.
///
/// Construction problems (`InvalidProtocol`, `InvalidHost`, `Config`) are
/// returned when a [`Host`](crate::Host) or connection is built. Call
/// outcomes are either [`Error::Request`] or [`Error::Stream`], and both keep
/// the underlying cause's message unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The endpoint scheme is neither `http` nor `https`.
    #[error("invalid protocol \"{0}\", expected http or https")]
    InvalidProtocol(String),

    /// The endpoint hostname or port could not be determined.
    #[error("invalid host: {0}")]
    InvalidHost(String),

    /// Connection or agent configuration is out of range.
    #[error("config error: {0}")]
    Config(String),

    /// The request failed before a response head was received: connect,
    /// DNS, TLS, write, timeout or a malformed response head.
    #[error(transparent)]
    Request(io::Error),

    /// The response head arrived but reading its body failed. The status
    /// and any partial body are discarded.
    #[error(transparent)]
    Stream(io::Error),
}

impl Error {
    /// True for failures before or instead of a response.
    pub fn is_request(&self) -> bool {
        matches!(self, Error::Request(_))
    }

    /// True for failures while reading a response body.
    pub fn is_stream(&self) -> bool {
        matches!(self, Error::Stream(_))
    }

    /// True when the call was abandoned because its timeout expired.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Request(e) if e.kind() == io::ErrorKind::TimedOut)
    }

    /// The underlying I/O cause of a call failure.
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Error::Request(e) | Error::Stream(e) => Some(e),
            _ => None,
        }
    }
}

impl From<protocol_http1::ParseError> for Error {
    fn from(e: protocol_http1::ParseError) -> Self {
        Error::Request(io::Error::new(io::ErrorKind::InvalidData, e))
    }
}
