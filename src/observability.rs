//! Metrics hooks and TTL policies for cache operations.
//!
//! # Metrics
//!
//! Implement [`CacheMetrics`] to feed cache activity into a monitoring system.
//! Every hook receives the backend key and the time the operation took,
//! including connection acquisition.
//!
//! ```ignore
//! use cache_shell::observability::CacheMetrics;
//! use std::time::Duration;
//!
//! struct PrometheusMetrics;
//!
//! impl CacheMetrics for PrometheusMetrics {
//!     fn record_hit(&self, _key: &str, _duration: Duration) {
//!         // counter!("cache_hits").inc();
//!     }
//!     // ... implement other methods
//! }
//!
//! // let store = KeyValueStore::new(registry).with_metrics(Box::new(PrometheusMetrics));
//! ```
//!
//! The store defaults to [`NoOpMetrics`]. [`LogMetrics`] keeps the trait's
//! default bodies, which write every event to the `log` facade.
//!
//! # TTL Policies
//!
//! A [`TtlPolicy`] supplies the expiry a namespaced cache uses when the caller
//! passes none:
//!
//! ```
//! use cache_shell::observability::TtlPolicy;
//! use std::time::Duration;
//!
//! let _policy = TtlPolicy::PerNamespace(|namespace| match namespace {
//!     "taxonomy" => Some(Duration::from_secs(3600)),
//!     _ => None,
//! });
//! ```
//!
//! | Policy | Effect |
//! |--------|--------|
//! | `None` | No expiry unless the caller passes one (default) |
//! | `Fixed` | Same expiry for every entry |
//! | `PerNamespace` | Expiry chosen by namespace tag |

use std::time::Duration;

/// Trait for cache metrics collection.
pub trait CacheMetrics: Send + Sync {
    /// Record a read that found a value.
    fn record_hit(&self, key: &str, duration: Duration) {
        debug!("Cache HIT: {} took {:?}", key, duration);
    }

    /// Record a read that found nothing.
    fn record_miss(&self, key: &str, duration: Duration) {
        debug!("Cache MISS: {} took {:?}", key, duration);
    }

    /// Record a write.
    fn record_set(&self, key: &str, duration: Duration) {
        debug!("Cache SET: {} took {:?}", key, duration);
    }

    /// Record a removal.
    fn record_delete(&self, key: &str, duration: Duration) {
        debug!("Cache DELETE: {} took {:?}", key, duration);
    }

    /// Record a failed operation.
    fn record_error(&self, key: &str, error: &str) {
        warn!("Cache ERROR for {}: {}", key, error);
    }
}

/// Default metrics implementation (no-op).
#[derive(Clone, Default)]
pub struct NoOpMetrics;

impl CacheMetrics for NoOpMetrics {
    fn record_hit(&self, _key: &str, _duration: Duration) {}
    fn record_miss(&self, _key: &str, _duration: Duration) {}
    fn record_set(&self, _key: &str, _duration: Duration) {}
    fn record_delete(&self, _key: &str, _duration: Duration) {}
    fn record_error(&self, _key: &str, _error: &str) {}
}

/// Metrics that only log.
#[derive(Clone, Default)]
pub struct LogMetrics;

impl CacheMetrics for LogMetrics {}

/// Default expiry for entries saved without an explicit TTL.
#[derive(Clone, Debug, Default)]
pub enum TtlPolicy {
    /// Entries saved without a TTL never expire
    #[default]
    None,

    /// Fixed duration for all entries
    Fixed(Duration),

    /// Chosen by namespace tag
    PerNamespace(fn(&str) -> Option<Duration>),
}

impl TtlPolicy {
    /// Get the default TTL for a namespace.
    pub fn get_ttl(&self, namespace: &str) -> Option<Duration> {
        match self {
            TtlPolicy::None => None,
            TtlPolicy::Fixed(d) => Some(*d),
            TtlPolicy::PerNamespace(f) => f(namespace),
        }
    }
}
