//! HTTP/1.1 request serialization.

use crate::error::ParseError;

/// An HTTP/1.1 request ready to be written to the wire.
///
/// The encoder writes headers exactly as given and never adds its own, so
/// `Host` and `Content-Length` are the caller's responsibility.
#[derive(Debug, Clone)]
pub struct Request<'a> {
    method: &'a str,
    target: &'a str,
    headers: Vec<(&'a str, &'a str)>,
    body: Option<&'a [u8]>,
}

impl<'a> Request<'a> {
    /// Create a request for `method` and request-target `target`.
    pub fn new(method: &'a str, target: &'a str) -> Self {
        Self {
            method,
            target,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Append a header.
    pub fn header(mut self, name: &'a str, value: &'a str) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Set the request body.
    pub fn body(mut self, body: &'a [u8]) -> Self {
        self.body = Some(body);
        self
    }

    /// Serialize the request, appending to `buf`.
    ///
    /// Validation happens before anything is written, so `buf` is untouched
    /// on error.
    pub fn encode(&self, buf: &mut Vec<u8>) -> Result<(), ParseError> {
        if self.method.is_empty() || !self.method.bytes().all(is_token) {
            return Err(ParseError::InvalidHeader(format!(
                "invalid method {:?}",
                self.method
            )));
        }
        if self.target.is_empty() || self.target.bytes().any(|b| b <= b' ' || b == 0x7f) {
            return Err(ParseError::InvalidHeader(format!(
                "invalid request target {:?}",
                self.target
            )));
        }
        for (name, value) in &self.headers {
            if name.is_empty() || !name.bytes().all(is_token) {
                return Err(ParseError::InvalidHeader(format!("invalid name {name:?}")));
            }
            if value.bytes().any(|b| b == b'\r' || b == b'\n' || b == 0) {
                return Err(ParseError::InvalidHeader(format!(
                    "invalid value for {name}"
                )));
            }
        }

        let body_len = self.body.map_or(0, <[u8]>::len);
        buf.reserve(self.encoded_head_len() + body_len);

        buf.extend_from_slice(self.method.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.target.as_bytes());
        buf.extend_from_slice(b" HTTP/1.1\r\n");

        for (name, value) in &self.headers {
            buf.extend_from_slice(name.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(value.as_bytes());
            buf.extend_from_slice(b"\r\n");
        }

        buf.extend_from_slice(b"\r\n");

        if let Some(body) = self.body {
            buf.extend_from_slice(body);
        }
        Ok(())
    }

    fn encoded_head_len(&self) -> usize {
        let line = self.method.len() + self.target.len() + 12;
        let headers: usize = self
            .headers
            .iter()
            .map(|(n, v)| n.len() + v.len() + 4)
            .sum();
        line + headers + 2
    }
}

/// RFC 7230 `tchar`.
fn is_token(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.'
        | b'^' | b'_' | b'`' | b'|' | b'~'
        | b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z')
}
