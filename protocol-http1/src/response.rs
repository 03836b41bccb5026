//! HTTP/1.1 response head parsing.

use crate::body::BodyDecoder;
use crate::error::ParseError;

/// Maximum size of a response head (status line plus headers).
pub const MAX_HEAD_LEN: usize = 64 * 1024;

/// HTTP version from the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Http10,
    Http11,
}

/// A parsed response status line and header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    version: Version,
    status: u16,
    reason: String,
    headers: Vec<(String, String)>,
}

impl ResponseHead {
    /// Parse a response head from the start of `data`.
    ///
    /// Returns the head and the number of bytes it occupied, including the
    /// terminating blank line. Returns [`ParseError::Incomplete`] when the
    /// terminator has not been buffered yet.
    pub fn parse(data: &[u8]) -> Result<(ResponseHead, usize), ParseError> {
        let end = match find_header_end(data) {
            Some(end) => end,
            None if data.len() > MAX_HEAD_LEN => {
                return Err(ParseError::HeadTooLarge(MAX_HEAD_LEN));
            }
            None => return Err(ParseError::Incomplete),
        };
        if end > MAX_HEAD_LEN {
            return Err(ParseError::HeadTooLarge(MAX_HEAD_LEN));
        }

        // Header values are opaque octets; lossy decoding keeps obs-text
        // from failing the whole response.
        let text = String::from_utf8_lossy(&data[..end]);
        let mut lines = text.split("\r\n");

        let status_line = lines.next().unwrap_or_default();
        let (version, status, reason) = parse_status_line(status_line)?;

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                continue;
            }
            let Some((name, value)) = line.split_once(':') else {
                return Err(ParseError::InvalidHeader(line.to_string()));
            };
            let name = name.trim();
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(ParseError::InvalidHeader(line.to_string()));
            }
            headers.push((name.to_string(), value.trim().to_string()));
        }

        let head = ResponseHead {
            version,
            status,
            reason,
            headers,
        };
        Ok((head, end + 4))
    }

    /// HTTP status code (e.g. 200, 404).
    pub fn status(&self) -> u16 {
        self.status
    }

    /// HTTP version of the response.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Reason phrase, possibly empty.
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Response headers as (name, value) pairs in wire order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Consume the head and return its headers.
    pub fn into_headers(self) -> Vec<(String, String)> {
        self.headers
    }

    /// Get the first header value matching `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// True for 1xx interim responses other than `101 Switching Protocols`.
    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status) && self.status != 101
    }

    /// Whether the server allows the connection to be reused.
    pub fn keep_alive(&self) -> bool {
        let tokens = self
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("connection"))
            .flat_map(|(_, v)| v.split(','))
            .map(str::trim);

        let mut close = false;
        let mut keep_alive = false;
        for token in tokens {
            if token.eq_ignore_ascii_case("close") {
                close = true;
            } else if token.eq_ignore_ascii_case("keep-alive") {
                keep_alive = true;
            }
        }

        match self.version {
            Version::Http11 => !close,
            Version::Http10 => keep_alive && !close,
        }
    }

    /// Select body framing for this response.
    ///
    /// `request_was_head` must be true when the request method was `HEAD`,
    /// since those responses never carry a body whatever their headers say.
    pub fn body_decoder(&self, request_was_head: bool) -> Result<BodyDecoder, ParseError> {
        if request_was_head
            || (100..200).contains(&self.status)
            || self.status == 204
            || self.status == 304
        {
            return Ok(BodyDecoder::empty());
        }

        let chunked = self
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("transfer-encoding"))
            .flat_map(|(_, v)| v.split(','))
            .map(str::trim)
            .next_back()
            .is_some_and(|last| last.eq_ignore_ascii_case("chunked"));
        if chunked {
            return Ok(BodyDecoder::chunked());
        }

        let mut length: Option<u64> = None;
        for (_, value) in self
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        {
            for part in value.split(',') {
                let part = part.trim();
                let parsed: u64 = part
                    .parse()
                    .map_err(|_| ParseError::InvalidContentLength(value.clone()))?;
                match length {
                    Some(prev) if prev != parsed => {
                        return Err(ParseError::InvalidContentLength(value.clone()));
                    }
                    _ => length = Some(parsed),
                }
            }
        }

        Ok(match length {
            Some(len) => BodyDecoder::length(len),
            None => BodyDecoder::close_delimited(),
        })
    }
}

fn parse_status_line(line: &str) -> Result<(Version, u16, String), ParseError> {
    let invalid = || ParseError::InvalidStatusLine(line.to_string());

    // Status line: HTTP/1.1 200 OK
    let mut parts = line.splitn(3, ' ');
    let version = match parts.next() {
        Some("HTTP/1.1") => Version::Http11,
        Some("HTTP/1.0") => Version::Http10,
        _ => return Err(invalid()),
    };
    let code = parts.next().ok_or_else(invalid)?;
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let status: u16 = code.parse().map_err(|_| invalid())?;
    if status < 100 {
        return Err(invalid());
    }
    let reason = parts.next().unwrap_or("").to_string();
    Ok((version, status, reason))
}

/// Find the position of `\r\n\r\n` in data, returns index of the first `\r`.
fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_response() {
        let data = b"HTTP/1.1 200 OK\r\ncontent-length: 5\r\n\r\nhello";
        let (head, consumed) = ResponseHead::parse(data).unwrap();
        assert_eq!(head.status(), 200);
        assert_eq!(head.reason(), "OK");
        assert_eq!(head.version(), Version::Http11);
        assert_eq!(head.header("Content-Length"), Some("5"));
        assert_eq!(head.headers().len(), 1);
        assert_eq!(&data[consumed..], b"hello");
    }

    #[test]
    fn parse_needs_terminator() {
        let data = b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n";
        assert_eq!(ResponseHead::parse(data), Err(ParseError::Incomplete));
    }

    #[test]
    fn parse_without_reason() {
        let (head, _) = ResponseHead::parse(b"HTTP/1.1 204\r\n\r\n").unwrap();
        assert_eq!(head.status(), 204);
        assert_eq!(head.reason(), "");
    }

    #[test]
    fn parse_rejects_garbage_status_line() {
        assert!(matches!(
            ResponseHead::parse(b"SPDY/3 200 OK\r\n\r\n"),
            Err(ParseError::InvalidStatusLine(_))
        ));
        assert!(matches!(
            ResponseHead::parse(b"HTTP/1.1 2x0 OK\r\n\r\n"),
            Err(ParseError::InvalidStatusLine(_))
        ));
    }

    #[test]
    fn parse_rejects_header_without_colon() {
        assert!(matches!(
            ResponseHead::parse(b"HTTP/1.1 200 OK\r\nnonsense\r\n\r\n"),
            Err(ParseError::InvalidHeader(_))
        ));
    }

    #[test]
    fn parse_rejects_oversized_head() {
        let mut data = b"HTTP/1.1 200 OK\r\n".to_vec();
        while data.len() <= MAX_HEAD_LEN {
            data.extend_from_slice(b"x-filler: aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa\r\n");
        }
        assert_eq!(
            ResponseHead::parse(&data),
            Err(ParseError::HeadTooLarge(MAX_HEAD_LEN))
        );
    }

    #[test]
    fn keep_alive_defaults_by_version() {
        let (h11, _) = ResponseHead::parse(b"HTTP/1.1 200 OK\r\n\r\n").unwrap();
        assert!(h11.keep_alive());

        let (h11_close, _) =
            ResponseHead::parse(b"HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n").unwrap();
        assert!(!h11_close.keep_alive());

        let (h10, _) = ResponseHead::parse(b"HTTP/1.0 200 OK\r\n\r\n").unwrap();
        assert!(!h10.keep_alive());

        let (h10_ka, _) =
            ResponseHead::parse(b"HTTP/1.0 200 OK\r\nconnection: Keep-Alive\r\n\r\n").unwrap();
        assert!(h10_ka.keep_alive());
    }

    #[test]
    fn informational_excludes_switching_protocols() {
        let (cont, _) = ResponseHead::parse(b"HTTP/1.1 100 Continue\r\n\r\n").unwrap();
        assert!(cont.is_informational());
        let (switch, _) =
            ResponseHead::parse(b"HTTP/1.1 101 Switching Protocols\r\n\r\n").unwrap();
        assert!(!switch.is_informational());
    }

    #[test]
    fn framing_selection() {
        let (head, _) =
            ResponseHead::parse(b"HTTP/1.1 200 OK\r\ntransfer-encoding: chunked\r\n\r\n").unwrap();
        assert!(head.body_decoder(false).unwrap().is_chunked());

        let (head, _) = ResponseHead::parse(b"HTTP/1.1 200 OK\r\ncontent-length: 3\r\n\r\n").unwrap();
        assert!(head.body_decoder(false).unwrap().reusable());
        assert!(head.body_decoder(true).unwrap().is_empty());

        let (head, _) = ResponseHead::parse(b"HTTP/1.1 200 OK\r\n\r\n").unwrap();
        assert!(!head.body_decoder(false).unwrap().reusable());

        let (head, _) = ResponseHead::parse(b"HTTP/1.1 304 Not Modified\r\ncontent-length: 9\r\n\r\n").unwrap();
        assert!(head.body_decoder(false).unwrap().is_empty());
    }

    #[test]
    fn conflicting_content_length_is_rejected() {
        let (head, _) = ResponseHead::parse(
            b"HTTP/1.1 200 OK\r\ncontent-length: 3\r\ncontent-length: 4\r\n\r\n",
        )
        .unwrap();
        assert!(matches!(
            head.body_decoder(false),
            Err(ParseError::InvalidContentLength(_))
        ));

        let (head, _) =
            ResponseHead::parse(b"HTTP/1.1 200 OK\r\ncontent-length: 3, 3\r\n\r\n").unwrap();
        assert!(head.body_decoder(false).is_ok());

        let (head, _) =
            ResponseHead::parse(b"HTTP/1.1 200 OK\r\ncontent-length: lots\r\n\r\n").unwrap();
        assert!(head.body_decoder(false).is_err());
    }
}
