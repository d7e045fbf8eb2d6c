//! Backend connections.
//!
//! A [`Connector`] opens connections; a [`BackendConnection`] runs the key
//! commands. The connection registry owns the connections and decides when to
//! open, reuse and close them.

use crate::error::Result;
use crate::registry::Role;
use std::fmt;
use std::future::Future;
use std::time::Duration;

pub mod inmemory;
#[cfg(feature = "redis")]
pub mod redis;

pub use inmemory::{InMemoryConnection, InMemoryConnector};
#[cfg(feature = "redis")]
pub use redis::{RedisConnection, RedisConnector};

/// Network location of a backend server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Endpoint {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Opens connections to a backend.
///
/// `connect` makes exactly one attempt and resolves once the backend is ready
/// to serve commands. Retrying is the caller's business.
///
/// **ASYNC:** All methods return `Send` futures so they can run inside
/// spawned tasks and HTTP handlers. Implementations may use `async fn`.
pub trait Connector: Send + Sync {
    type Connection: BackendConnection;

    /// Open a connection for `role` at `endpoint`.
    ///
    /// # Errors
    /// Returns `Error::ConnectionRefused` or `Error::ConnectionError` if the
    /// backend cannot be reached or does not become ready.
    fn connect(
        &self,
        role: Role,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// A live session with the backend.
///
/// **IMPORTANT:** Connections are cheap handles. Clones share the same
/// underlying session and the same liveness flag, so closing any clone closes
/// them all. All methods take `&self` so a shared connection can serve
/// concurrent callers.
pub trait BackendConnection: Clone + Send + Sync {
    /// Read the raw value stored under `key`.
    ///
    /// # Returns
    /// - `Ok(Some(value))` - Key present
    /// - `Ok(None)` - Key absent or expired
    ///
    /// # Errors
    /// Returns `Err` if the command fails.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Store `value` under `key`, expiring after `ttl` when given.
    ///
    /// # Errors
    /// Returns `Err` if the command fails.
    fn set(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Remove `key`. Removing an absent key is not an error.
    ///
    /// # Errors
    /// Returns `Err` if the command fails.
    fn delete(&self, key: &str) -> impl Future<Output = Result<()>> + Send;

    /// Check whether `key` is present.
    ///
    /// # Errors
    /// Returns `Err` if the command fails.
    fn exists(&self, key: &str) -> impl Future<Output = Result<bool>> + Send;

    /// Round trip to the backend.
    ///
    /// # Errors
    /// Returns `Err` if the backend does not answer.
    fn ping(&self) -> impl Future<Output = Result<bool>> + Send;

    /// Whether the session is still usable.
    fn is_open(&self) -> bool;

    /// Tear the session down.
    fn close(&self) -> impl Future<Output = ()> + Send;
}
