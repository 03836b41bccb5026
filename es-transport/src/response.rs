//! Buffered responses.

use bytes::Bytes;

use crate::headers::Headers;

/// A completed response: status, headers and the full body exactly as
/// received. Only successful calls produce one, so a status never appears
/// without its body.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: Headers,
    body: Bytes,
}

impl Response {
    pub(crate) fn new(status: u16, headers: Headers, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn bytes(self) -> Bytes {
        self.body
    }

    /// Body as UTF-8. No other interpretation is applied, so a truncated
    /// JSON document comes back as-is.
    pub fn text(self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }

    /// `(body, status)`, the pair a success callback receives.
    pub fn into_parts(self) -> (Bytes, u16) {
        (self.body, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_is_verbatim() {
        let resp = Response::new(200, Headers::new(), Bytes::from_static(b"{\"USER\":"));
        assert_eq!(resp.header("content-type"), None);
        assert!(resp.is_success());
        assert_eq!(resp.text().unwrap(), "{\"USER\":");
    }

    #[test]
    fn into_parts() {
        let resp = Response::new(
            201,
            Headers::from([("Content-Type", "application/json")]),
            Bytes::from_static(b"{}"),
        );
        assert_eq!(resp.header("content-type"), Some("application/json"));
        let (body, status) = resp.into_parts();
        assert_eq!(status, 201);
        assert_eq!(&body[..], b"{}");
    }
}
