//! Injected logger slot.
//!
//! Connections never create their own logger; they hold a [`Logger`] handed
//! in at construction. The default, [`TracingLog`], forwards to `tracing`
//! with the call-audit entries on the [`TRACE_TARGET`] channel.
//!
//! The HTTP connection only ever calls [`Log::trace`], once per call.
//! Reporting a failed call as an error is left to whoever receives the
//! call's `Result`.

use std::sync::Arc;
use std::time::Duration;

use crate::body::Body;
use crate::error::Error;

/// `tracing` target for per-call trace entries.
pub const TRACE_TARGET: &str = "es_transport::trace";

/// Shared handle to a logger.
pub type Logger = Arc<dyn Log>;

/// One completed call, as reported to [`Log::trace`].
#[derive(Debug)]
pub struct TraceEntry<'a> {
    pub method: &'a str,
    /// Absolute URL of the request.
    pub url: &'a str,
    pub request_body: Option<&'a Body>,
    /// Present only on success.
    pub response_body: Option<&'a [u8]>,
    /// Present only on success.
    pub status: Option<u16>,
    /// Present only on failure.
    pub error: Option<&'a Error>,
    pub elapsed: Duration,
}

/// Logging sink used by connections.
pub trait Log: Send + Sync {
    fn error(&self, error: &(dyn std::error::Error + 'static));
    fn warning(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
    fn trace(&self, entry: &TraceEntry<'_>);
}

/// Forwards to `tracing` macros.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl TracingLog {
    pub fn shared() -> Logger {
        Arc::new(TracingLog)
    }
}

impl Log for TracingLog {
    fn error(&self, error: &(dyn std::error::Error + 'static)) {
        tracing::error!(error = %error);
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }

    fn trace(&self, entry: &TraceEntry<'_>) {
        let elapsed_ms = entry.elapsed.as_millis() as u64;
        let request_body = entry
            .request_body
            .map(|b| String::from_utf8_lossy(b.as_bytes()));
        let response_body = entry.response_body.map(String::from_utf8_lossy);
        match entry.error {
            Some(error) => tracing::trace!(
                target: TRACE_TARGET,
                method = entry.method,
                url = entry.url,
                elapsed_ms,
                error = %error,
                "request failed"
            ),
            None => tracing::trace!(
                target: TRACE_TARGET,
                method = entry.method,
                url = entry.url,
                elapsed_ms,
                status = entry.status,
                request_body = request_body.as_deref(),
                response_body = response_body.as_deref(),
                "request complete"
            ),
        }
    }
}
