//! The contract every transport implements.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::agent::Agent;
use crate::config::ConnectionConfig;
use crate::error::Result;
use crate::host::Host;
use crate::log::Logger;
use crate::request::RequestParams;
use crate::response::Response;

/// Health of a connection as tracked by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Alive,
    Dead,
    Closed,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Alive => "alive",
            Status::Dead => "dead",
            Status::Closed => "closed",
        }
    }

    pub(crate) fn from_u8(v: u8) -> Status {
        match v {
            0 => Status::Alive,
            1 => Status::Dead,
            _ => Status::Closed,
        }
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            Status::Alive => 0,
            Status::Dead => 1,
            Status::Closed => 2,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A transport bound to one endpoint.
///
/// [`request`](Connection::request) is the only I/O operation. Its output
/// is either a complete [`Response`] or an [`Error`](crate::Error), never a
/// mix: a failed call carries no status and no partial body.
///
/// Many calls may be in flight on one connection at once. They share
/// nothing but the connection's [`Agent`].
pub trait Connection: Send + Sync + 'static {
    /// The endpoint this connection talks to.
    fn host(&self) -> &Host;

    fn config(&self) -> &ConnectionConfig;

    /// The injected logger.
    fn log(&self) -> &Logger;

    /// Socket pool used to reuse connections across calls.
    fn agent(&self) -> &Arc<Agent>;

    fn status(&self) -> Status;

    /// Record a new status, returning the previous one.
    fn set_status(&self, status: Status) -> Status;

    /// Perform one call.
    fn request(&self, params: RequestParams) -> impl Future<Output = Result<Response>> + Send;

    /// `HEAD /` with the ping timeout. Resolves to true on a 2xx status.
    fn ping(&self) -> impl Future<Output = Result<bool>> + Send {
        let params = RequestParams::new()
            .method("HEAD")
            .path("/")
            .timeout_ms(self.config().ping_timeout_ms);
        let call = self.request(params);
        async move {
            let response = call.await?;
            Ok(response.is_success())
        }
    }

    /// Run [`request`](Connection::request) on the tokio runtime and hand
    /// the outcome to `callback`.
    ///
    /// The callback runs exactly once, on a runtime task, never before this
    /// method returns to its caller. Must be called from within a tokio
    /// runtime.
    fn request_with<F>(self: Arc<Self>, params: RequestParams, callback: F) -> JoinHandle<()>
    where
        Self: Sized,
        F: FnOnce(Result<Response>) + Send + 'static,
    {
        tokio::spawn(async move {
            let outcome = self.request(params).await;
            callback(outcome);
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_u8() {
        for status in [Status::Alive, Status::Dead, Status::Closed] {
            assert_eq!(Status::from_u8(status.as_u8()), status);
        }
        assert_eq!(Status::Dead.to_string(), "dead");
    }
}
