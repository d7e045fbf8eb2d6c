//! Connection registry: one current connection per role.
//!
//! The registry is an ordinary value. Build it once, share it behind an `Arc`,
//! and call [`ConnectionRegistry::shutdown`] when the process winds down.
//! Nothing connects until the first [`ConnectionRegistry::acquire`].
//!
//! # Connection modes
//!
//! | Mode | acquire | release |
//! |------|---------|---------|
//! | `Shared` | reuse the live connection, else open one | keep it current |
//! | `PerOperation` | always open a new connection | close it |
//!
//! In both modes a failed connect attempt is retried under the
//! [`ReconnectPolicy`] before `acquire` gives up.

use crate::backend::{BackendConnection, Connector, Endpoint};
use crate::error::{Error, Result};
use crate::reconnect::ReconnectPolicy;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// What a connection is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// Read/write connection to the primary server.
    Primary,
    /// Read-only connection, possibly to a replica.
    Reader,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Primary, Role::Reader];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Reader => "reader",
        }
    }

    fn index(self) -> usize {
        match self {
            Role::Primary => 0,
            Role::Reader => 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether connections outlive the operation that acquired them.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Keep one connection per role and reuse it while it is open.
    #[default]
    Shared,
    /// Open a connection for every operation and close it afterwards.
    PerOperation,
}

impl FromStr for ConnectionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(ConnectionMode::Shared),
            "per-operation" | "per_operation" => Ok(ConnectionMode::PerOperation),
            other => Err(Error::ConfigError(format!(
                "Unknown connection mode '{}', expected 'shared' or 'per-operation'",
                other
            ))),
        }
    }
}

/// Endpoints and policies for a registry.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    pub primary: Endpoint,
    pub reader: Endpoint,
    pub mode: ConnectionMode,
    pub policy: ReconnectPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            primary: Endpoint::new("localhost", 6379),
            reader: Endpoint::new("localhost", 6379),
            mode: ConnectionMode::default(),
            policy: ReconnectPolicy::default(),
        }
    }
}

impl RegistryConfig {
    pub fn endpoint(&self, role: Role) -> &Endpoint {
        match role {
            Role::Primary => &self.primary,
            Role::Reader => &self.reader,
        }
    }

    pub fn with_mode(mut self, mode: ConnectionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_policy(mut self, policy: ReconnectPolicy) -> Self {
        self.policy = policy;
        self
    }
}

/// A connection handed out for one operation.
///
/// Call [`Lease::release`] when the operation is over, whether it succeeded
/// or not. A lease dropped without release (e.g. a cancelled task) only drops
/// its handle.
pub struct Lease<K: BackendConnection> {
    conn: K,
    close_on_release: bool,
}

impl<K: BackendConnection> Lease<K> {
    /// Give the connection back. Closes it in `PerOperation` mode.
    pub async fn release(self) {
        if self.close_on_release {
            self.conn.close().await;
        }
    }
}

impl<K: BackendConnection> Deref for Lease<K> {
    type Target = K;

    fn deref(&self) -> &K {
        &self.conn
    }
}

/// Holds the current connection of every role.
pub struct ConnectionRegistry<C: Connector> {
    connector: C,
    config: RegistryConfig,
    slots: [Mutex<Option<C::Connection>>; 2],
}

impl<C: Connector> ConnectionRegistry<C> {
    pub fn new(connector: C, config: RegistryConfig) -> Self {
        ConnectionRegistry {
            connector,
            config,
            slots: [Mutex::new(None), Mutex::new(None)],
        }
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get a connection for `role`, opening one if none is live.
    ///
    /// Concurrent callers for the same role wait on each other, so at most one
    /// connection per role is opened at a time in `Shared` mode.
    ///
    /// # Errors
    ///
    /// Returns the connect error of the last attempt, or
    /// `Error::RetryExhausted` once the reconnection limits are reached.
    pub async fn acquire(&self, role: Role) -> Result<Lease<C::Connection>> {
        if self.config.mode == ConnectionMode::PerOperation {
            let conn = self.connect_with_retry(role).await?;
            // Tracked only for liveness; release closes it
            *self.slots[role.index()].lock().await = Some(conn.clone());
            return Ok(Lease {
                conn,
                close_on_release: true,
            });
        }

        let mut slot = self.slots[role.index()].lock().await;

        if let Some(conn) = slot.as_ref() {
            if conn.is_open() {
                return Ok(Lease {
                    conn: conn.clone(),
                    close_on_release: false,
                });
            }
        }

        if let Some(stale) = slot.take() {
            warn!("{} connection is no longer usable, reconnecting", role);
            stale.close().await;
        }

        let conn = self.connect_with_retry(role).await?;
        *slot = Some(conn.clone());

        Ok(Lease {
            conn,
            close_on_release: false,
        })
    }

    /// Whether a live connection is currently tracked for `role`.
    ///
    /// In `PerOperation` mode this is the most recently acquired connection,
    /// live until its lease is released.
    pub async fn is_live(&self, role: Role) -> bool {
        self.slots[role.index()]
            .lock()
            .await
            .as_ref()
            .is_some_and(|conn| conn.is_open())
    }

    /// Close every tracked connection. Later `acquire` calls reconnect.
    pub async fn shutdown(&self) {
        for role in Role::ALL {
            let current = self.slots[role.index()].lock().await.take();
            if let Some(conn) = current {
                conn.close().await;
                info!("✓ {} connection closed on shutdown", role);
            }
        }
    }

    async fn connect_with_retry(&self, role: Role) -> Result<C::Connection> {
        let endpoint = self.config.endpoint(role);
        let policy = &self.config.policy;
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let err = match self.connector.connect(role, endpoint).await {
                Ok(conn) => {
                    debug!(
                        "✓ {} connection to {} established (attempt {})",
                        role, endpoint, attempt
                    );
                    return Ok(conn);
                }
                Err(e) => e,
            };

            error!(
                "Failed to connect {} to backend at {}: {}",
                role, endpoint, err
            );

            let elapsed = started.elapsed();
            if policy.is_exhausted(attempt, elapsed) {
                return Err(Error::RetryExhausted {
                    role,
                    attempts: attempt,
                    last_error: err.to_string(),
                });
            }

            let delay = policy.next_delay(&err, attempt, elapsed);
            tokio::time::sleep(delay).await;
        }
    }
}
