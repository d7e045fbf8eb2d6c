//! Keyed operations against the backend.
//!
//! Every operation leases a connection from the registry, runs one command and
//! releases the lease before reporting the outcome, success or failure.
//! Failures are logged where they happen and returned unchanged, so callers
//! can still tell connection errors from operation errors.

use crate::backend::{BackendConnection, Connector};
use crate::error::{Error, Result};
use crate::observability::{CacheMetrics, NoOpMetrics};
use crate::registry::{ConnectionRegistry, Lease, Role};
use crate::serialization::{decode_value, encode_value};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Round a TTL to whole seconds for the backend.
///
/// A zero TTL means "no expiry". Sub-second remainders round up so a short TTL
/// never becomes a non-expiring write. Rounding saturates at `u64::MAX` seconds.
pub fn normalize_ttl(ttl: Option<Duration>) -> Option<Duration> {
    ttl.filter(|d| !d.is_zero()).map(|d| {
        let secs = d.as_secs().saturating_add(u64::from(d.subsec_nanos() > 0));
        Duration::from_secs(secs)
    })
}

/// Get/set/delete/exists against a registry's connections.
///
/// Cloning is cheap; clones share the registry and metrics.
///
/// # Example
///
/// ```ignore
/// use cache_shell::{ConnectionRegistry, KeyValueStore, RegistryConfig};
/// use cache_shell::backend::InMemoryConnector;
/// use serde_json::json;
/// use std::sync::Arc;
///
/// let registry = Arc::new(ConnectionRegistry::new(
///     InMemoryConnector::new(),
///     RegistryConfig::default(),
/// ));
/// let store = KeyValueStore::new(registry);
///
/// store.set("greeting", &json!("hello"), None).await?;
/// assert_eq!(store.get("greeting").await?, Some(json!("hello")));
/// ```
pub struct KeyValueStore<C: Connector> {
    registry: Arc<ConnectionRegistry<C>>,
    metrics: Arc<dyn CacheMetrics>,
    debug_mode: bool,
}

impl<C: Connector> Clone for KeyValueStore<C> {
    fn clone(&self) -> Self {
        KeyValueStore {
            registry: Arc::clone(&self.registry),
            metrics: Arc::clone(&self.metrics),
            debug_mode: self.debug_mode,
        }
    }
}

impl<C: Connector> KeyValueStore<C> {
    pub fn new(registry: Arc<ConnectionRegistry<C>>) -> Self {
        KeyValueStore {
            registry,
            metrics: Arc::new(NoOpMetrics),
            debug_mode: false,
        }
    }

    /// Set custom metrics handler.
    pub fn with_metrics(mut self, metrics: Box<dyn CacheMetrics>) -> Self {
        self.metrics = Arc::from(metrics);
        self
    }

    /// Log every command at `info` instead of `debug`.
    pub fn with_debug_mode(mut self, debug_mode: bool) -> Self {
        self.debug_mode = debug_mode;
        self
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry<C>> {
        &self.registry
    }

    /// Store `value` under `key` on the primary.
    ///
    /// Strings are written verbatim; everything else as JSON text. With a
    /// non-zero `ttl` the key expires after that many seconds (rounded up).
    ///
    /// # Errors
    ///
    /// - Connection errors from the registry
    /// - `Error::OperationError` if the write fails
    pub async fn set(&self, key: &str, value: &Value, ttl: Option<Duration>) -> Result<()> {
        let timer = Instant::now();
        let body = encode_value(value);
        let ttl = normalize_ttl(ttl);

        let lease = self.lease(Role::Primary, "SET", key).await?;
        match ttl {
            Some(d) => self.trace_command(&format!("SETEX {}s", d.as_secs()), key),
            None => self.trace_command("SET", key),
        }
        let result = lease.set(key, body, ttl).await;
        lease.release().await;

        match result {
            Ok(()) => {
                self.metrics.record_set(key, timer.elapsed());
                Ok(())
            }
            Err(e) => Err(self.operation_failed("SET", key, e)),
        }
    }

    /// Read `key` from the primary.
    pub async fn get(&self, key: &str) -> Result<Option<Value>> {
        self.get_from(Role::Primary, key).await
    }

    /// Read `key` through the connection of `role`.
    ///
    /// Stored JSON is decoded; anything else comes back as a string. Absent
    /// keys and stored JSON `null` both read as `None`.
    ///
    /// # Errors
    ///
    /// - Connection errors from the registry
    /// - `Error::OperationError` if the read fails
    pub async fn get_from(&self, role: Role, key: &str) -> Result<Option<Value>> {
        let timer = Instant::now();

        let lease = self.lease(role, "GET", key).await?;
        self.trace_command("GET", key);
        let result = lease.get(key).await;
        lease.release().await;

        let value = match result {
            Ok(raw) => raw.and_then(decode_value),
            Err(e) => return Err(self.operation_failed("GET", key, e)),
        };

        if value.is_some() {
            self.metrics.record_hit(key, timer.elapsed());
        } else {
            self.metrics.record_miss(key, timer.elapsed());
        }
        Ok(value)
    }

    /// Remove `key` on the primary. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// - Connection errors from the registry
    /// - `Error::OperationError` if the removal fails
    pub async fn delete(&self, key: &str) -> Result<()> {
        let timer = Instant::now();

        let lease = self.lease(Role::Primary, "DEL", key).await?;
        self.trace_command("DEL", key);
        let result = lease.delete(key).await;
        lease.release().await;

        match result {
            Ok(()) => {
                self.metrics.record_delete(key, timer.elapsed());
                Ok(())
            }
            Err(e) => Err(self.operation_failed("DEL", key, e)),
        }
    }

    /// Check for `key` on the primary without transferring its value.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        self.exists_in(Role::Primary, key).await
    }

    /// Check for `key` through the connection of `role`.
    ///
    /// This is the backend's existence check: a stored JSON `null` counts as
    /// present here, unlike [`KeyValueStore::get`].
    pub async fn exists_in(&self, role: Role, key: &str) -> Result<bool> {
        let lease = self.lease(role, "EXISTS", key).await?;
        self.trace_command("EXISTS", key);
        let result = lease.exists(key).await;
        lease.release().await;

        result.map_err(|e| self.operation_failed("EXISTS", key, e))
    }

    /// Round trip to the backend through the connection of `role`.
    pub async fn ping(&self, role: Role) -> Result<bool> {
        let lease = self.lease(role, "PING", "-").await?;
        let result = lease.ping().await;
        lease.release().await;

        result.map_err(|e| self.operation_failed("PING", "-", e))
    }

    async fn lease(&self, role: Role, command: &str, key: &str) -> Result<Lease<C::Connection>> {
        self.registry.acquire(role).await.map_err(|e| {
            error!(
                "Failed to connect to backend for {} {} ({}): {}",
                command, key, role, e
            );
            self.metrics.record_error(key, &e.to_string());
            e
        })
    }

    fn trace_command(&self, command: &str, key: &str) {
        if self.debug_mode {
            info!("→ {} {}", command, key);
        } else {
            debug!("→ {} {}", command, key);
        }
    }

    fn operation_failed(&self, command: &str, key: &str, e: Error) -> Error {
        error!("Backend {} failed for key {}: {}", command, key, e);
        self.metrics.record_error(key, &e.to_string());
        e
    }
}
