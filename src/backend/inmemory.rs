//! In-memory backend (tests and local runs).
//!
//! Every connection opened by one [`InMemoryConnector`] shares one DashMap
//! keyspace, the way every client of one server sees the same data. TTLs are
//! measured on the tokio clock so paused-time tests can expire entries.
//!
//! The connector can also refuse connections and fail commands on demand, for
//! exercising the reconnection and error paths without a real server.

use super::{BackendConnection, Connector, Endpoint};
use crate::error::{Error, Result};
use crate::registry::Role;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Stored value with optional expiration.
struct CacheEntry {
    data: String,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(data: String, ttl: Option<Duration>) -> Self {
        // Past the clock's range means never
        let expires_at = ttl.and_then(|d| Instant::now().checked_add(d));
        CacheEntry { data, expires_at }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

#[derive(Default)]
struct Shared {
    store: DashMap<String, CacheEntry>,
    refuse_remaining: AtomicU32,
    fail_operations: AtomicBool,
    generation: AtomicU64,
    connect_attempts: AtomicU32,
    open_connections: AtomicUsize,
}

/// Connector for the in-memory backend.
///
/// # Example
///
/// ```no_run
/// use cache_shell::backend::{BackendConnection, Connector, Endpoint, InMemoryConnector};
/// use cache_shell::registry::Role;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let connector = InMemoryConnector::new();
///     let conn = connector
///         .connect(Role::Primary, &Endpoint::new("localhost", 6379))
///         .await?;
///
///     conn.set("key1", "value".to_string(), None).await?;
///     assert_eq!(conn.get("key1").await?, Some("value".to_string()));
///
///     conn.close().await;
///     Ok(())
/// }
/// ```
#[derive(Clone, Default)]
pub struct InMemoryConnector {
    shared: Arc<Shared>,
}

impl InMemoryConnector {
    /// Create a connector with an empty keyspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse the next `count` connection attempts.
    pub fn refuse_connections(&self, count: u32) {
        self.shared.refuse_remaining.store(count, Ordering::SeqCst);
    }

    /// Make every command fail with an operation error until turned off.
    pub fn fail_operations(&self, fail: bool) {
        self.shared.fail_operations.store(fail, Ordering::SeqCst);
    }

    /// Simulate the server dropping every open connection.
    pub fn drop_connections(&self) {
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        warn!("⚠ InMemory dropped all connections");
    }

    /// Number of connection attempts made so far, refused ones included.
    pub fn connect_attempts(&self) -> u32 {
        self.shared.connect_attempts.load(Ordering::SeqCst)
    }

    /// Number of connections opened and not yet closed.
    pub fn open_connections(&self) -> usize {
        self.shared.open_connections.load(Ordering::SeqCst)
    }

    /// Number of stored keys, expired ones included until next touched.
    pub fn len(&self) -> usize {
        self.shared.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.store.is_empty()
    }

    /// Raw stored value, bypassing connections. Expired entries read as absent.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.shared
            .store
            .get(key)
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.data.clone())
    }
}

impl Connector for InMemoryConnector {
    type Connection = InMemoryConnection;

    async fn connect(&self, role: Role, endpoint: &Endpoint) -> Result<InMemoryConnection> {
        self.shared.connect_attempts.fetch_add(1, Ordering::SeqCst);

        let refused = self
            .shared
            .refuse_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(Error::ConnectionRefused(format!(
                "InMemory {} refused connection",
                endpoint
            )));
        }

        self.shared.open_connections.fetch_add(1, Ordering::SeqCst);
        debug!("✓ InMemory {} connection opened", role);

        Ok(InMemoryConnection {
            shared: Arc::clone(&self.shared),
            role,
            generation: self.shared.generation.load(Ordering::SeqCst),
            open: Arc::new(AtomicBool::new(true)),
        })
    }
}

/// Connection to the in-memory backend.
#[derive(Clone)]
pub struct InMemoryConnection {
    shared: Arc<Shared>,
    role: Role,
    generation: u64,
    open: Arc<AtomicBool>,
}

impl InMemoryConnection {
    pub fn role(&self) -> Role {
        self.role
    }

    fn check(&self, command: &str, key: &str) -> Result<()> {
        if !self.is_open() {
            return Err(Error::ConnectionError(format!(
                "InMemory {} on closed {} connection for key {}",
                command, self.role, key
            )));
        }
        if self.shared.fail_operations.load(Ordering::SeqCst) {
            return Err(Error::OperationError(format!(
                "InMemory {} failed for key {}",
                command, key
            )));
        }
        Ok(())
    }
}

impl BackendConnection for InMemoryConnection {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check("GET", key)?;

        if let Some(entry) = self.shared.store.get(key) {
            if !entry.is_expired() {
                debug!("✓ InMemory GET {} -> HIT", key);
                return Ok(Some(entry.data.clone()));
            }
        }

        // Remove expired entry if it exists
        self.shared.store.remove(key);
        debug!("✓ InMemory GET {} -> MISS", key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<()> {
        self.check("SET", key)?;

        self.shared
            .store
            .insert(key.to_string(), CacheEntry::new(value, ttl));

        if let Some(d) = ttl {
            debug!("✓ InMemory SET {} (TTL: {:?})", key, d);
        } else {
            debug!("✓ InMemory SET {}", key);
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check("DEL", key)?;

        self.shared.store.remove(key);
        debug!("✓ InMemory DELETE {}", key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check("EXISTS", key)?;

        Ok(self
            .shared
            .store
            .get(key)
            .is_some_and(|entry| !entry.is_expired()))
    }

    async fn ping(&self) -> Result<bool> {
        self.check("PING", "-")?;
        Ok(true)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
            && self.generation == self.shared.generation.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        if self.open.swap(false, Ordering::SeqCst) {
            self.shared.open_connections.fetch_sub(1, Ordering::SeqCst);
            debug!("✓ InMemory {} connection closed", self.role);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint::new("localhost", 6379)
    }

    async fn open(connector: &InMemoryConnector) -> InMemoryConnection {
        connector
            .connect(Role::Primary, &endpoint())
            .await
            .expect("Failed to connect")
    }

    #[tokio::test]
    async fn test_inmemory_set_get() {
        let connector = InMemoryConnector::new();
        let conn = open(&connector).await;

        conn.set("key1", "value1".to_string(), None)
            .await
            .expect("Failed to set");

        let result = conn.get("key1").await.expect("Failed to get");
        assert_eq!(result, Some("value1".to_string()));
    }

    #[tokio::test]
    async fn test_inmemory_ttl_beyond_clock_never_expires() {
        let connector = InMemoryConnector::new();
        let conn = open(&connector).await;

        conn.set("far", "value".to_string(), Some(Duration::from_secs(u64::MAX / 2)))
            .await
            .expect("Failed to set");

        assert_eq!(
            conn.get("far").await.expect("Failed to get"),
            Some("value".to_string())
        );
    }

    #[tokio::test]
    async fn test_inmemory_miss() {
        let connector = InMemoryConnector::new();
        let conn = open(&connector).await;

        let result = conn.get("nonexistent").await.expect("Failed to get");
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_inmemory_delete() {
        let connector = InMemoryConnector::new();
        let conn = open(&connector).await;

        conn.set("key1", "value1".to_string(), None)
            .await
            .expect("Failed to set");
        assert!(conn.exists("key1").await.expect("Failed to check exists"));

        conn.delete("key1").await.expect("Failed to delete");
        assert!(!conn.exists("key1").await.expect("Failed to check exists"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_inmemory_ttl_expiration() {
        let connector = InMemoryConnector::new();
        let conn = open(&connector).await;

        conn.set("key1", "value1".to_string(), Some(Duration::from_secs(1)))
            .await
            .expect("Failed to set");

        // Should be present immediately
        assert!(conn.get("key1").await.expect("Failed to get").is_some());

        tokio::time::advance(Duration::from_millis(1500)).await;

        assert!(conn.get("key1").await.expect("Failed to get").is_none());
        assert!(connector.is_empty());
    }

    #[tokio::test]
    async fn test_inmemory_connections_share_keyspace() {
        let connector = InMemoryConnector::new();
        let writer = open(&connector).await;
        let reader = connector
            .connect(Role::Reader, &endpoint())
            .await
            .expect("Failed to connect");

        writer
            .set("shared", "yes".to_string(), None)
            .await
            .expect("Failed to set");

        assert_eq!(reader.role(), Role::Reader);
        assert_eq!(
            reader.get("shared").await.expect("Failed to get"),
            Some("yes".to_string())
        );
    }

    #[tokio::test]
    async fn test_inmemory_refuse_connections() {
        let connector = InMemoryConnector::new();
        connector.refuse_connections(2);

        for _ in 0..2 {
            let err = connector
                .connect(Role::Primary, &endpoint())
                .await
                .err()
                .expect("Connection should be refused");
            assert!(err.is_connection_refused());
        }

        assert!(connector.connect(Role::Primary, &endpoint()).await.is_ok());
        assert_eq!(connector.connect_attempts(), 3);
    }

    #[tokio::test]
    async fn test_inmemory_close_tracks_open_connections() {
        let connector = InMemoryConnector::new();
        let conn = open(&connector).await;
        let clone = conn.clone();
        assert_eq!(connector.open_connections(), 1);

        clone.close().await;
        conn.close().await;

        assert!(!conn.is_open());
        assert_eq!(connector.open_connections(), 0);

        let err = conn.get("key").await.expect_err("Closed connection must fail");
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_inmemory_drop_connections() {
        let connector = InMemoryConnector::new();
        let conn = open(&connector).await;

        connector.drop_connections();

        assert!(!conn.is_open());
        assert!(open(&connector).await.is_open());
    }

    #[tokio::test]
    async fn test_inmemory_fail_operations() {
        let connector = InMemoryConnector::new();
        let conn = open(&connector).await;

        connector.fail_operations(true);
        let err = conn
            .set("key", "v".to_string(), None)
            .await
            .expect_err("Set should fail");
        assert!(matches!(err, Error::OperationError(_)));

        connector.fail_operations(false);
        assert!(conn.set("key", "v".to_string(), None).await.is_ok());
    }
}
