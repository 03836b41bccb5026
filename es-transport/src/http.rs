//! HTTP(S) connection.
//!
//! Each call runs the same steps:
//!
//! 1. Merge the call's [`RequestParams`] with the endpoint's defaults
//!    ([`HttpConnection::make_req_params`]).
//! 2. Lease a socket from the agent (reused or dialed by the scheme's
//!    connector), switch on `TCP_NODELAY` and write the request.
//! 3. Read the response head. Anything that goes wrong up to here is an
//!    [`Error::Request`].
//! 4. Buffer the whole body. Anything that goes wrong now is an
//!    [`Error::Stream`]; the status and partial body are thrown away.
//! 5. Park the socket if the exchange left it reusable, and emit one trace
//!    entry.
//!
//! The body is returned byte-for-byte unless `suggest_compression` is on,
//! in which case gzip and deflate encodings are undone.

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use bytes::{Buf, Bytes, BytesMut};
use flate2::read::{GzDecoder, ZlibDecoder};
use protocol_http1::{Decoded, ParseError, ResponseHead};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::agent::Agent;
use crate::body::Body;
use crate::config::ConnectionConfig;
use crate::connection::{Connection, Status};
use crate::error::{Error, Result};
use crate::headers::Headers;
use crate::host::Host;
use crate::io::{Connector, Hands};
use crate::log::{Logger, TraceEntry, TracingLog};
use crate::request::{ReqParams, RequestParams};
use crate::response::Response;

const READ_CHUNK: usize = 8 * 1024;

/// A [`Connection`] speaking HTTP/1.1 over TCP or TLS.
///
/// # Example
///
/// ```no_run
/// use es_transport::{Connection, Host, HttpConnection, RequestParams};
///
/// # async fn example() -> Result<(), es_transport::Error> {
/// let conn = HttpConnection::new(Host::parse("http://localhost:9200")?)?;
/// let resp = conn
///     .request(RequestParams::new().method("GET").path("/_cluster/health"))
///     .await?;
/// assert_eq!(resp.status(), 200);
/// # Ok(())
/// # }
/// ```
pub struct HttpConnection {
    host: Host,
    config: ConnectionConfig,
    hand: Arc<dyn Connector>,
    agent: Arc<Agent>,
    log: Logger,
    baseline_headers: Headers,
    status: AtomicU8,
    /// False when the agent was handed in through the builder.
    owns_agent: bool,
}

/// Builder for [`HttpConnection`].
pub struct HttpConnectionBuilder {
    host: Host,
    config: ConnectionConfig,
    log: Option<Logger>,
    hands: Option<Hands>,
    agent: Option<Arc<Agent>>,
}

impl HttpConnectionBuilder {
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.config = config;
        self
    }

    /// Logger to inject. Defaults to [`TracingLog`].
    pub fn log(mut self, log: Logger) -> Self {
        self.log = Some(log);
        self
    }

    /// Connectors per scheme. Defaults to TCP and rustls connectors built
    /// from the config.
    pub fn hands(mut self, hands: Hands) -> Self {
        self.hands = Some(hands);
        self
    }

    /// Use an existing agent instead of creating one from
    /// `config.agent`. The agent may be shared with other connections;
    /// [`HttpConnection::close`] leaves a shared agent open.
    pub fn agent(mut self, agent: Arc<Agent>) -> Self {
        self.agent = Some(agent);
        self
    }

    pub fn build(self) -> Result<HttpConnection> {
        self.config.validate()?;
        let hands = match self.hands {
            Some(hands) => hands,
            None => Hands::from_config(&self.config)?,
        };
        let owns_agent = self.agent.is_none();
        let agent = self
            .agent
            .unwrap_or_else(|| Arc::new(Agent::new(self.config.agent.clone())));

        Ok(HttpConnection {
            hand: hands.for_scheme(self.host.scheme()),
            baseline_headers: self.host.headers().clone(),
            host: self.host,
            config: self.config,
            agent,
            log: self.log.unwrap_or_else(TracingLog::shared),
            status: AtomicU8::new(Status::Alive.as_u8()),
            owns_agent,
        })
    }
}

impl HttpConnection {
    /// Connection with the default config and logger.
    pub fn new(host: Host) -> Result<Self> {
        Self::builder(host).build()
    }

    pub fn builder(host: Host) -> HttpConnectionBuilder {
        HttpConnectionBuilder {
            host,
            config: ConnectionConfig::default(),
            log: None,
            hands: None,
            agent: None,
        }
    }

    /// The connector selected for this endpoint's scheme.
    pub fn hand(&self) -> &Arc<dyn Connector> {
        &self.hand
    }

    /// Mark the connection closed. Later calls fail with a request error.
    ///
    /// The agent is shut down too, unless it was passed in through
    /// [`HttpConnectionBuilder::agent`] and may still serve other
    /// connections.
    pub fn close(&self) {
        self.set_status(Status::Closed);
        if self.owns_agent {
            self.agent.close();
        }
    }

    /// Merge call-site parameters with the endpoint's defaults.
    pub fn make_req_params(&self, params: &RequestParams) -> ReqParams {
        let method = params
            .method
            .as_deref()
            .unwrap_or("GET")
            .to_ascii_uppercase();

        let mut path = self.host.merge_path(params.path.as_deref().unwrap_or(""));
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        let query = self.host.merge_query(params.query.as_ref());
        if !query.is_empty() {
            path.push('?');
            path.push_str(&query.to_query_string());
        }

        let mut headers = match &params.headers {
            Some(extra) => self.baseline_headers.merged(extra),
            None => self.baseline_headers.clone(),
        };
        if let Some(body) = request_body(params) {
            headers.remove("content-length");
            headers.insert("Content-Length", body.byte_len());
        }

        ReqParams {
            method,
            protocol: self.host.scheme(),
            auth: self.host.build_auth().map(str::to_string),
            hostname: self.host.hostname().to_string(),
            port: self.host.port(),
            path,
            headers,
            agent: Arc::clone(&self.agent),
        }
    }

    async fn send(&self, params: RequestParams) -> Result<Response> {
        let started = Instant::now();
        let req = self.make_req_params(&params);
        let body = request_body(&params);

        let timeout_ms = params
            .timeout_ms
            .unwrap_or(self.config.request_timeout_ms);
        let outcome = if timeout_ms == 0 {
            self.exchange(&req, body).await
        } else {
            // Dropping the exchange on expiry drops its socket, so a late
            // response has nowhere to go.
            tokio::time::timeout(Duration::from_millis(timeout_ms), self.exchange(&req, body))
                .await
                .unwrap_or_else(|_| {
                    Err(Error::Request(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("request timed out after {timeout_ms}ms"),
                    )))
                })
        };

        let url = self
            .host
            .make_url(params.path.as_deref().unwrap_or(""), params.query.as_ref());
        self.log.trace(&TraceEntry {
            method: &req.method,
            url: &url,
            request_body: body,
            response_body: outcome.as_ref().ok().map(|r| &r.body()[..]),
            status: outcome.as_ref().ok().map(Response::status),
            error: outcome.as_ref().err(),
            elapsed: started.elapsed(),
        });

        outcome
    }

    async fn exchange(&self, req: &ReqParams, body: Option<&Body>) -> Result<Response> {
        if self.status() == Status::Closed {
            return Err(Error::Request(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection is closed",
            )));
        }

        let mut wire = Vec::with_capacity(256 + body.map_or(0, Body::byte_len));
        self.encode(req, body, &mut wire)?;

        let connect = self.hand.connect(&req.hostname, req.port);
        let mut lease = req.agent.checkout(connect).await.map_err(Error::Request)?;
        // Latency tuning only; a socket that refuses it still works.
        let _ = lease.set_nodelay(true);

        let socket = lease.socket();
        socket.write_all(&wire).await.map_err(Error::Request)?;
        socket.flush().await.map_err(Error::Request)?;

        // Phase 1: response head.
        let mut buf = BytesMut::with_capacity(READ_CHUNK);
        let head = loop {
            match ResponseHead::parse(&buf) {
                Ok((head, consumed)) => {
                    buf.advance(consumed);
                    if head.is_informational() {
                        continue;
                    }
                    break head;
                }
                Err(ParseError::Incomplete) => {}
                Err(e) => return Err(e.into()),
            }
            buf.reserve(READ_CHUNK);
            let n = socket.read_buf(&mut buf).await.map_err(Error::Request)?;
            if n == 0 {
                return Err(Error::Request(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before a response was received",
                )));
            }
        };

        // Phase 2: body. The status is known from here on but is only
        // reported together with a complete body.
        let request_was_head = req.method == "HEAD";
        let mut decoder = head.body_decoder(request_was_head).map_err(stream_error)?;
        let mut received = BytesMut::new();
        loop {
            match decoder.decode(&mut buf, &mut received).map_err(stream_error)? {
                Decoded::Done => break,
                Decoded::NeedMore => {
                    buf.reserve(READ_CHUNK);
                    let n = socket.read_buf(&mut buf).await.map_err(Error::Stream)?;
                    if n == 0 {
                        decoder.finish_on_eof().map_err(stream_error)?;
                        break;
                    }
                }
            }
        }

        let reusable = head.keep_alive() && decoder.reusable() && buf.is_empty();
        req.agent.release(lease, reusable);

        let status = head.status();
        let headers = Headers::from(head.into_headers());
        let body = if self.config.suggest_compression {
            decode_content(&headers, received.freeze()).map_err(Error::Stream)?
        } else {
            received.freeze()
        };
        Ok(Response::new(status, headers, body))
    }

    fn encode(&self, req: &ReqParams, body: Option<&Body>, wire: &mut Vec<u8>) -> Result<()> {
        let host_header = self.host.host_header();
        let authorization = req
            .auth
            .as_deref()
            .filter(|_| !req.headers.contains("authorization"))
            .map(|auth| format!("Basic {}", BASE64.encode(auth)));

        let mut request = protocol_http1::Request::new(&req.method, &req.path);
        if !req.headers.contains("host") {
            request = request.header("Host", &host_header);
        }
        for (name, value) in req.headers.iter() {
            request = request.header(name, value);
        }
        if let Some(authorization) = &authorization {
            request = request.header("Authorization", authorization);
        }
        if self.config.suggest_compression && !req.headers.contains("accept-encoding") {
            request = request.header("Accept-Encoding", "gzip, deflate");
        }
        if let Some(body) = body {
            request = request.body(body.as_bytes());
        }

        request
            .encode(wire)
            .map_err(|e| Error::Request(io::Error::new(io::ErrorKind::InvalidInput, e)))
    }
}

impl Connection for HttpConnection {
    fn host(&self) -> &Host {
        &self.host
    }

    fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    fn log(&self) -> &Logger {
        &self.log
    }

    fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }

    fn status(&self) -> Status {
        Status::from_u8(self.status.load(Ordering::Acquire))
    }

    fn set_status(&self, status: Status) -> Status {
        Status::from_u8(self.status.swap(status.as_u8(), Ordering::AcqRel))
    }

    fn request(
        &self,
        params: RequestParams,
    ) -> impl std::future::Future<Output = Result<Response>> + Send {
        self.send(params)
    }
}

impl fmt::Display for HttpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HttpConnection({})", self.host)
    }
}

impl fmt::Debug for HttpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection")
            .field("host", &self.host)
            .field("status", &self.status())
            .field("agent", &self.agent)
            .finish_non_exhaustive()
    }
}

/// The call's body, if it has any bytes.
fn request_body(params: &RequestParams) -> Option<&Body> {
    params.body.as_ref().filter(|b| !b.is_empty())
}

fn stream_error(e: ParseError) -> Error {
    let kind = match e {
        ParseError::UnexpectedEof => io::ErrorKind::UnexpectedEof,
        _ => io::ErrorKind::InvalidData,
    };
    Error::Stream(io::Error::new(kind, e))
}

fn decode_content(headers: &Headers, body: Bytes) -> io::Result<Bytes> {
    if body.is_empty() {
        return Ok(body);
    }
    let encoding = headers.get("content-encoding").unwrap_or("").trim();
    let mut out = Vec::with_capacity(body.len() * 4);
    if encoding.eq_ignore_ascii_case("gzip") || encoding.eq_ignore_ascii_case("x-gzip") {
        GzDecoder::new(&body[..]).read_to_end(&mut out)?;
    } else if encoding.eq_ignore_ascii_case("deflate") {
        ZlibDecoder::new(&body[..]).read_to_end(&mut out)?;
    } else {
        return Ok(body);
    }
    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::{GzEncoder, ZlibEncoder};

    use super::*;
    use crate::host::{HostSpec, Scheme};
    use crate::query::Query;

    fn connection(host: &str) -> HttpConnection {
        HttpConnection::new(host.parse().unwrap()).unwrap()
    }

    #[test]
    fn reads_the_host() {
        let conn = connection("john:dude@pizza.com:9200/pizza/cheese?shrooms=true");
        let req = conn.make_req_params(&RequestParams::new());
        assert_eq!(
            req,
            ReqParams {
                method: "GET".into(),
                protocol: Scheme::Http,
                auth: Some("john:dude".into()),
                hostname: "pizza.com".into(),
                port: 9200,
                path: "/pizza/cheese?shrooms=true".into(),
                headers: conn.host().headers().clone(),
                agent: Arc::clone(conn.agent()),
            }
        );
    }

    #[test]
    fn merges_query_with_hosts() {
        let host = Host::from_spec(HostSpec {
            query: Some(Query::from([("user_id", 123)])),
            ..HostSpec::default()
        })
        .unwrap();
        let conn = HttpConnection::new(host).unwrap();
        let req = conn.make_req_params(&RequestParams::new().query(Query::from([("jvm", "yes")])));
        assert_eq!(req.path, "/?user_id=123&jvm=yes");
    }

    #[test]
    fn merges_path_prefix() {
        let conn = connection("https://google.com/path/prefix/for/user/1");
        let req = conn.make_req_params(
            &RequestParams::new()
                .method("GET")
                .path("/items")
                .query(Query::from([("q", "pizza")])),
        );
        assert_eq!(req.protocol, Scheme::Https);
        assert_eq!(req.auth, None);
        assert_eq!(req.hostname, "google.com");
        assert_eq!(req.port, 443);
        assert_eq!(req.path, "/path/prefix/for/user/1/items?q=pizza");
        assert!(req.headers.is_empty());
        assert!(Arc::ptr_eq(&req.agent, conn.agent()));
    }

    #[test]
    fn host_query_comes_before_call_query() {
        let conn = connection("http://google.com/pref-x?userId=12345&token=42069");
        let req = conn.make_req_params(
            &RequestParams::new()
                .method("PUT")
                .path("/stuff")
                .query(Query::from([("q", "pizza")])),
        );
        assert_eq!(req.method, "PUT");
        assert_eq!(req.port, 80);
        assert_eq!(req.path, "/pref-x/stuff?userId=12345&token=42069&q=pizza");
    }

    #[test]
    fn minimal_params() {
        let conn = connection("http://google.com");
        let req = conn.make_req_params(&RequestParams::new().method("put").path("stuff"));
        assert_eq!(req.method, "PUT");
        assert_eq!(req.path, "/stuff");
        assert_eq!(req.auth, None);
        assert!(req.headers.is_empty());
    }

    #[test]
    fn content_length_counts_utf8_bytes() {
        let conn = connection("localhost");
        let body = "pasta and \u{1D11E}";
        assert_eq!(body.chars().count(), 11);

        let req = conn.make_req_params(
            &RequestParams::new()
                .header("content-length", 999)
                .body(body),
        );
        assert_eq!(req.headers.get("Content-Length"), Some("14"));
        assert_eq!(req.headers.len(), 1);

        let req = conn.make_req_params(&RequestParams::new());
        assert!(!req.headers.contains("content-length"));
    }

    #[test]
    fn call_headers_overlay_baseline() {
        let host = Host::parse("http://localhost")
            .unwrap()
            .with_headers(Headers::from([("x-base", "1"), ("x-both", "base")]));
        let conn = HttpConnection::new(host).unwrap();

        let req = conn.make_req_params(&RequestParams::new());
        assert_eq!(req.headers.get("x-both"), Some("base"));

        let req = conn.make_req_params(&RequestParams::new().header("X-Both", "call"));
        assert_eq!(req.headers.get("x-base"), Some("1"));
        assert_eq!(req.headers.get("x-both"), Some("call"));
    }

    #[test]
    fn display_and_status() {
        let conn = connection("http://localhost:9200");
        assert_eq!(conn.to_string(), "HttpConnection(http://localhost:9200)");
        assert_eq!(conn.status(), Status::Alive);
        assert_eq!(conn.set_status(Status::Dead), Status::Alive);
        conn.close();
        assert_eq!(conn.status(), Status::Closed);
        assert!(conn.agent().is_closed());
    }

    #[test]
    fn close_leaves_shared_agent_open() {
        let agent = Arc::new(Agent::new(crate::config::AgentConfig::default()));
        let first = HttpConnection::builder(Host::default())
            .agent(Arc::clone(&agent))
            .build()
            .unwrap();
        let second = HttpConnection::builder(Host::default())
            .agent(Arc::clone(&agent))
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(first.agent(), second.agent()));

        first.close();
        assert_eq!(first.status(), Status::Closed);
        assert!(!agent.is_closed());
        assert_eq!(second.status(), Status::Alive);
    }

    #[test]
    fn rejects_invalid_config() {
        let config = ConnectionConfig {
            agent: crate::config::AgentConfig {
                max_sockets: 0,
                ..Default::default()
            },
            ..ConnectionConfig::default()
        };
        let err = HttpConnection::builder(Host::default())
            .config(config)
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn decode_gzip_and_deflate() {
        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(b"{\"took\":1}").unwrap();
        let gz = Bytes::from(gz.finish().unwrap());
        let headers = Headers::from([("Content-Encoding", "gzip")]);
        assert_eq!(&decode_content(&headers, gz).unwrap()[..], b"{\"took\":1}");

        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(b"deflated").unwrap();
        let zlib = Bytes::from(zlib.finish().unwrap());
        let headers = Headers::from([("content-encoding", "deflate")]);
        assert_eq!(&decode_content(&headers, zlib).unwrap()[..], b"deflated");
    }

    #[test]
    fn identity_and_corrupt_encodings() {
        let plain = Bytes::from_static(b"plain");
        assert_eq!(decode_content(&Headers::new(), plain.clone()).unwrap(), plain);

        let headers = Headers::from([("content-encoding", "gzip")]);
        assert!(decode_content(&headers, Bytes::from_static(b"not gzip")).is_err());
    }

    #[test]
    fn stream_error_kinds() {
        let eof = stream_error(ParseError::UnexpectedEof);
        assert!(eof.is_stream());
        assert_eq!(eof.io_error().unwrap().kind(), io::ErrorKind::UnexpectedEof);
        let bad = stream_error(ParseError::InvalidChunk("zz".into()));
        assert_eq!(bad.io_error().unwrap().kind(), io::ErrorKind::InvalidData);
    }
}
