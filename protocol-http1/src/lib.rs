//! Sans-IO HTTP/1.1 client codec.
//!
//! This crate turns a request description into wire bytes and turns buffered
//! response bytes back into a parsed head plus a framed body. It performs no
//! I/O: the caller owns the socket, feeds bytes in, and decides what to do on
//! EOF or error. `es-transport` drives it over tokio sockets.
//!
//! - **Requests**: [`Request`] serializes a request line, headers and body.
//! - **Response heads**: [`ResponseHead::parse`] parses the status line and
//!   headers once the `\r\n\r\n` terminator has been buffered.
//! - **Bodies**: [`BodyDecoder`] applies content-length, chunked or
//!   close-delimited framing, moving decoded bytes into an output buffer.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use protocol_http1::{Decoded, Request, ResponseHead};
//!
//! let mut wire = Vec::new();
//! Request::new("GET", "/users/1")
//!     .header("Host", "example.test:9200")
//!     .encode(&mut wire)
//!     .unwrap();
//! assert!(wire.starts_with(b"GET /users/1 HTTP/1.1\r\n"));
//!
//! let mut input = BytesMut::from(&b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nok"[..]);
//! let (head, consumed) = ResponseHead::parse(&input).unwrap();
//! let _ = input.split_to(consumed);
//! assert_eq!(head.status(), 200);
//!
//! let mut decoder = head.body_decoder(false).unwrap();
//! let mut body = BytesMut::new();
//! assert_eq!(decoder.decode(&mut input, &mut body).unwrap(), Decoded::Done);
//! assert_eq!(&body[..], b"ok");
//! ```

mod body;
mod error;
mod request;
mod response;

pub use body::{BodyDecoder, Decoded};
pub use error::ParseError;
pub use request::Request;
pub use response::{MAX_HEAD_LEN, ResponseHead, Version};
