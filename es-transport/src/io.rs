//! Sockets and the scheme-to-connector table.
//!
//! A [`Connector`] dials one kind of socket. [`Hands`] holds one connector
//! per [`Scheme`] and hands out the matching one through an exhaustive
//! `match`, so a connection resolves its transport once at construction and
//! a new scheme cannot be added without saying how to dial it.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::config::{AgentConfig, ConnectionConfig, TlsClientConfig};
use crate::error::Error;
use crate::host::Scheme;

/// Boxed future returned by [`Connector::connect`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A connected byte stream.
pub trait Io: AsyncRead + AsyncWrite + Send + Unpin + 'static {
    /// Enable or disable Nagle's algorithm on the underlying socket.
    fn set_nodelay(&self, nodelay: bool) -> io::Result<()>;
}

/// Owned, type-erased socket.
pub type Socket = Box<dyn Io>;

impl Io for TcpStream {
    fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        TcpStream::set_nodelay(self, nodelay)
    }
}

impl Io for TlsStream<TcpStream> {
    fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        self.get_ref().0.set_nodelay(nodelay)
    }
}

/// Dials new sockets for one scheme.
pub trait Connector: Send + Sync + 'static {
    fn connect<'a>(&'a self, hostname: &'a str, port: u16) -> BoxFuture<'a, io::Result<Socket>>;
}

/// Plaintext TCP.
#[derive(Debug, Clone, Default)]
pub struct HttpConnector {
    connect_timeout_ms: u64,
}

impl HttpConnector {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }
}

impl Connector for HttpConnector {
    fn connect<'a>(&'a self, hostname: &'a str, port: u16) -> BoxFuture<'a, io::Result<Socket>> {
        Box::pin(async move {
            let stream = tcp_connect(hostname, port, self.connect_timeout_ms).await?;
            Ok(Box::new(stream) as Socket)
        })
    }
}

/// TCP plus TLS via rustls.
#[derive(Clone)]
pub struct HttpsConnector {
    tls: TlsConnector,
    connect_timeout_ms: u64,
}

impl HttpsConnector {
    pub fn new(config: &AgentConfig, tls: &TlsClientConfig) -> Self {
        Self {
            tls: TlsConnector::from(Arc::clone(&tls.client_config)),
            connect_timeout_ms: config.connect_timeout_ms,
        }
    }
}

impl std::fmt::Debug for HttpsConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpsConnector")
            .field("connect_timeout_ms", &self.connect_timeout_ms)
            .finish_non_exhaustive()
    }
}

impl Connector for HttpsConnector {
    fn connect<'a>(&'a self, hostname: &'a str, port: u16) -> BoxFuture<'a, io::Result<Socket>> {
        Box::pin(async move {
            let server_name = ServerName::try_from(hostname.to_string())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
            let stream = tcp_connect(hostname, port, self.connect_timeout_ms).await?;
            let tls = self.tls.connect(server_name, stream).await?;
            Ok(Box::new(tls) as Socket)
        })
    }
}

async fn tcp_connect(hostname: &str, port: u16, timeout_ms: u64) -> io::Result<TcpStream> {
    if timeout_ms == 0 {
        return TcpStream::connect((hostname, port)).await;
    }
    tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        TcpStream::connect((hostname, port)),
    )
    .await
    .map_err(|_| {
        io::Error::new(
            io::ErrorKind::TimedOut,
            format!("connect to {hostname}:{port} timed out after {timeout_ms}ms"),
        )
    })?
}

/// One connector per scheme.
#[derive(Clone)]
pub struct Hands {
    http: Arc<dyn Connector>,
    https: Arc<dyn Connector>,
}

impl Hands {
    /// Use caller-supplied connectors.
    pub fn new(http: Arc<dyn Connector>, https: Arc<dyn Connector>) -> Self {
        Self { http, https }
    }

    /// TCP and rustls connectors built from `config`.
    pub fn from_config(config: &ConnectionConfig) -> Result<Self, Error> {
        let tls = match &config.tls {
            Some(tls) => tls.clone(),
            None => TlsClientConfig::webpki()?,
        };
        Ok(Self {
            http: Arc::new(HttpConnector::new(&config.agent)),
            https: Arc::new(HttpsConnector::new(&config.agent, &tls)),
        })
    }

    /// The connector for `scheme`.
    pub fn for_scheme(&self, scheme: Scheme) -> Arc<dyn Connector> {
        match scheme {
            Scheme::Http => Arc::clone(&self.http),
            Scheme::Https => Arc::clone(&self.https),
        }
    }
}

impl std::fmt::Debug for Hands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hands").finish_non_exhaustive()
    }
}
