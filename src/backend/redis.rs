//! Redis backend implementation.

use super::{BackendConnection, Connector, Endpoint};
use crate::error::{Error, Result};
use crate::registry::Role;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for a single connection attempt.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connector for Redis servers.
///
/// Credentials and database are shared by every role; only the endpoint
/// differs between the primary and the reader.
///
/// # Example
///
/// ```no_run
/// # use cache_shell::backend::{BackendConnection, Connector, Endpoint, RedisConnector};
/// # use cache_shell::registry::Role;
/// # use cache_shell::error::Result;
/// # async fn example() -> Result<()> {
/// let connector = RedisConnector::default();
/// let conn = connector
///     .connect(Role::Primary, &Endpoint::new("localhost", 6379))
///     .await?;
///
/// conn.set("key", "value".to_string(), None).await?;
/// let value = conn.get("key").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct RedisConnector {
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: u32,
    pub connection_timeout: Duration,
}

impl Default for RedisConnector {
    fn default() -> Self {
        RedisConnector {
            username: None,
            password: None,
            database: 0,
            connection_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

impl RedisConnector {
    /// Build the Redis connection string for `endpoint`.
    pub fn connection_string(&self, endpoint: &Endpoint) -> String {
        if let Some(password) = &self.password {
            if let Some(username) = &self.username {
                format!(
                    "redis://{}:{}@{}:{}/{}",
                    username, password, endpoint.host, endpoint.port, self.database
                )
            } else {
                format!(
                    "redis://default:{}@{}:{}/{}",
                    password, endpoint.host, endpoint.port, self.database
                )
            }
        } else {
            format!(
                "redis://{}:{}/{}",
                endpoint.host, endpoint.port, self.database
            )
        }
    }

    async fn open(&self, endpoint: &Endpoint) -> Result<MultiplexedConnection> {
        let client = redis::Client::open(self.connection_string(endpoint))
            .map_err(|e| Error::ConnectionError(format!("Invalid Redis URL: {}", e)))?;

        let mut conn = client.get_multiplexed_async_connection().await?;

        // Only hand the connection out once the server answers.
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if !pong.contains("PONG") {
            return Err(Error::ConnectionError(format!(
                "Unexpected PING reply from {}: {}",
                endpoint, pong
            )));
        }

        Ok(conn)
    }
}

impl Connector for RedisConnector {
    type Connection = RedisConnection;

    async fn connect(&self, role: Role, endpoint: &Endpoint) -> Result<RedisConnection> {
        let conn = tokio::time::timeout(self.connection_timeout, self.open(endpoint))
            .await
            .map_err(|_| {
                Error::ConnectionError(format!(
                    "Timed out after {:?} connecting to Redis at {}",
                    self.connection_timeout, endpoint
                ))
            })??;

        info!("✓ Redis {} connection ready: {}", role, endpoint);

        Ok(RedisConnection {
            inner: conn,
            open: Arc::new(AtomicBool::new(true)),
        })
    }
}

/// Multiplexed Redis connection.
///
/// Clones pipeline their commands over the same socket. A transport-level
/// failure marks every clone dead so the registry reconnects.
#[derive(Clone)]
pub struct RedisConnection {
    inner: MultiplexedConnection,
    open: Arc<AtomicBool>,
}

impl RedisConnection {
    fn command_error(&self, command: &str, key: &str, e: redis::RedisError) -> Error {
        command_error(&self.open, command, key, e)
    }
}

/// Map a command failure, clearing `open` when the transport is gone.
fn command_error(open: &AtomicBool, command: &str, key: &str, e: redis::RedisError) -> Error {
    if e.is_io_error() || e.is_connection_dropped() {
        if open.swap(false, Ordering::SeqCst) {
            warn!("⚠ Redis connection lost during {} {}: {}", command, key, e);
        }
    }
    Error::OperationError(format!("Redis {} failed for key {}: {}", command, key, e))
}

impl BackendConnection for RedisConnection {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.inner.clone();

        let value: Option<String> = conn
            .get(key)
            .await
            .map_err(|e| self.command_error("GET", key, e))?;

        if value.is_some() {
            debug!("✓ Redis GET {} -> HIT", key);
        } else {
            debug!("✓ Redis GET {} -> MISS", key);
        }

        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.inner.clone();

        match ttl {
            Some(duration) => {
                let seconds = duration.as_secs();
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(|e| self.command_error("SETEX", key, e))?;
                debug!("✓ Redis SETEX {} (TTL: {}s)", key, seconds);
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(|e| self.command_error("SET", key, e))?;
                debug!("✓ Redis SET {}", key);
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.inner.clone();

        conn.del::<_, ()>(key)
            .await
            .map_err(|e| self.command_error("DEL", key, e))?;

        debug!("✓ Redis DELETE {}", key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.inner.clone();

        let exists: bool = conn
            .exists(key)
            .await
            .map_err(|e| self.command_error("EXISTS", key, e))?;

        Ok(exists)
    }

    async fn ping(&self) -> Result<bool> {
        let mut conn = self.inner.clone();

        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| self.command_error("PING", "-", e))?;

        Ok(pong.contains("PONG"))
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        // The socket goes away once the last clone is dropped.
        if self.open.swap(false, Ordering::SeqCst) {
            debug!("✓ Redis connection closed");
        }
    }
}
