//! Connection and pool settings.
//!
//! [`ConnectionConfig`] holds per-endpoint timeouts and TLS.
//! [`AgentConfig`] sizes the socket pool.

use std::sync::Arc;

use crate::error::Error;

/// TLS client configuration for `https` endpoints.
#[derive(Clone)]
pub struct TlsClientConfig {
    /// Pre-built rustls ClientConfig. User configures root certs, client
    /// certificates, ALPN etc.
    pub client_config: Arc<rustls::ClientConfig>,
}

impl TlsClientConfig {
    /// Web PKI roots from `webpki-roots` with the ring crypto provider.
    pub fn webpki() -> Result<Self, Error> {
        let mut roots = rustls::RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .map_err(|e| Error::Config(format!("tls: {e}")))?
            .with_root_certificates(roots)
            .with_no_client_auth();
        Ok(Self {
            client_config: Arc::new(config),
        })
    }
}

impl std::fmt::Debug for TlsClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsClientConfig").finish_non_exhaustive()
    }
}

/// Socket pool limits for an [`Agent`](crate::Agent).
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Maximum sockets in use at once. Further checkouts wait for a socket
    /// to be released.
    pub max_sockets: usize,
    /// Maximum idle keep-alive sockets kept for reuse. 0 disables reuse.
    pub max_free_sockets: usize,
    /// Idle sockets older than this are discarded instead of reused, in
    /// milliseconds. 0 disables reuse.
    pub max_keep_alive_ms: u64,
    /// Connect timeout in milliseconds. 0 means no timeout.
    pub connect_timeout_ms: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_sockets: 10,
            max_free_sockets: 10,
            max_keep_alive_ms: 300_000,
            connect_timeout_ms: 0,
        }
    }
}

impl AgentConfig {
    /// Validate configuration values. Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_sockets == 0 {
            return Err(Error::Config("max_sockets must be > 0".into()));
        }
        // tokio's semaphore caps permits at usize::MAX >> 3.
        if self.max_sockets > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(Error::Config("max_sockets is too large".into()));
        }
        if self.max_free_sockets > self.max_sockets {
            return Err(Error::Config(
                "max_free_sockets must be <= max_sockets".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for an [`HttpConnection`](crate::HttpConnection).
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Per-call timeout in milliseconds, covering connect through the last
    /// body byte. 0 means no timeout. Default: 30000.
    pub request_timeout_ms: u64,
    /// Timeout for [`ping`](crate::Connection::ping) in milliseconds.
    /// Default: 3000.
    pub ping_timeout_ms: u64,
    /// Send `Accept-Encoding: gzip, deflate` and decode compressed
    /// responses. Off by default, so bodies are returned as received.
    pub suggest_compression: bool,
    /// Socket pool limits.
    pub agent: AgentConfig,
    /// TLS settings for `https` endpoints. `None` uses
    /// [`TlsClientConfig::webpki`].
    pub tls: Option<TlsClientConfig>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            ping_timeout_ms: 3_000,
            suggest_compression: false,
            agent: AgentConfig::default(),
            tls: None,
        }
    }
}

impl ConnectionConfig {
    /// Validate configuration values. Returns an error if any value is out of range.
    pub fn validate(&self) -> Result<(), Error> {
        self.agent.validate()
    }
}
