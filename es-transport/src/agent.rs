//! Keep-alive socket pool shared by all calls on one connection.
//!
//! The agent is the only state shared between concurrent calls. It caps the
//! number of sockets in use with a semaphore (callers above the cap wait for
//! a permit), parks idle sockets for reuse up to `max_free_sockets`, and
//! drops parked sockets older than `max_keep_alive_ms`. It is owned by one
//! connection and passed around as an `Arc`; there is no process-wide
//! default agent.

use std::collections::VecDeque;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::AgentConfig;
use crate::io::{Io, Socket};

struct Idle {
    socket: Socket,
    since: Instant,
}

/// Socket pool for one endpoint.
pub struct Agent {
    config: AgentConfig,
    permits: Arc<Semaphore>,
    idle: Mutex<VecDeque<Idle>>,
    closed: AtomicBool,
}

/// A socket checked out of an [`Agent`].
///
/// Holds one of the agent's socket permits until dropped or released.
/// Dropping a lease closes the socket.
pub struct Lease {
    socket: Socket,
    reused: bool,
    _permit: OwnedSemaphorePermit,
}

impl Lease {
    pub fn socket(&mut self) -> &mut Socket {
        &mut self.socket
    }

    /// True when the socket came from the idle pool rather than a new dial.
    pub fn reused(&self) -> bool {
        self.reused
    }

    pub fn set_nodelay(&self, nodelay: bool) -> io::Result<()> {
        Io::set_nodelay(&*self.socket, nodelay)
    }
}

impl Agent {
    pub fn new(config: AgentConfig) -> Self {
        Agent {
            permits: Arc::new(Semaphore::new(config.max_sockets)),
            idle: Mutex::new(VecDeque::with_capacity(config.max_free_sockets)),
            closed: AtomicBool::new(false),
            config,
        }
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Get a socket, reusing an idle one when possible.
    ///
    /// Waits while `max_sockets` sockets are in use. `connect` is only
    /// awaited when no fresh idle socket is available.
    pub async fn checkout<F>(&self, connect: F) -> io::Result<Lease>
    where
        F: Future<Output = io::Result<Socket>>,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| agent_closed())?;
        if self.is_closed() {
            return Err(agent_closed());
        }

        if let Some(socket) = self.take_idle() {
            return Ok(Lease {
                socket,
                reused: true,
                _permit: permit,
            });
        }

        let socket = connect.await?;
        Ok(Lease {
            socket,
            reused: false,
            _permit: permit,
        })
    }

    /// Return a socket after a completed exchange.
    ///
    /// The socket is parked for reuse only if `reusable` is true, the agent
    /// is open and the idle pool has room; otherwise it is closed.
    pub fn release(&self, lease: Lease, reusable: bool) {
        if !reusable || self.is_closed() || !self.keeps_idle() {
            return;
        }
        let mut idle = self.idle.lock();
        if idle.len() >= self.config.max_free_sockets {
            return;
        }
        idle.push_back(Idle {
            socket: lease.socket,
            since: Instant::now(),
        });
    }

    /// Number of parked idle sockets.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }

    /// Number of sockets currently checked out.
    pub fn in_use(&self) -> usize {
        self.config.max_sockets - self.permits.available_permits()
    }

    /// Drop idle sockets and refuse further checkouts. Leases already out
    /// finish normally but are not parked on release.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.permits.close();
        self.idle.lock().clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn keeps_idle(&self) -> bool {
        self.config.max_free_sockets > 0 && self.config.max_keep_alive_ms > 0
    }

    /// Most recently parked socket that has not expired. Expired sockets
    /// are dropped on the way.
    fn take_idle(&self) -> Option<Socket> {
        let max_age = Duration::from_millis(self.config.max_keep_alive_ms);
        let mut idle = self.idle.lock();
        idle.retain(|entry| entry.since.elapsed() < max_age);
        idle.pop_back().map(|entry| entry.socket)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("config", &self.config)
            .field("idle", &self.idle_count())
            .field("in_use", &self.in_use())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn agent_closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "connection agent is closed")
}
