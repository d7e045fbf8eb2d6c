//! # cache-shell
//!
//! A connection-managed cache client for a Redis-compatible key-value store,
//! plus the health endpoints of the service that hosts it.
//!
//! ## Features
//!
//! - **Lazy Connections:** One connection per role (primary, reader), opened on first use
//! - **Bounded Reconnects:** Linear backoff capped at 3s, with attempt and time limits
//! - **Namespaced Keys:** Keys are prefixed by cache tag and lower-cased
//! - **JSON Values:** Structured values are stored as JSON text, strings as-is
//! - **Backend Agnostic:** Redis for production, an in-memory backend for tests
//!
//! ## Quick Start
//!
//! ```ignore
//! use cache_shell::{ConnectionRegistry, KeyValueStore, NamespacedCache, RegistryConfig};
//! use cache_shell::backend::RedisConnector;
//! use std::sync::Arc;
//!
//! // 1. One registry per process, shared by reference
//! let registry = Arc::new(ConnectionRegistry::new(
//!     RedisConnector::default(),
//!     RegistryConfig::default(),
//! ));
//!
//! // 2. Stores and caches are cheap to clone
//! let store = KeyValueStore::new(registry.clone());
//! let taxonomies = NamespacedCache::taxonomy(store);
//!
//! // 3. Use it
//! taxonomies.save_to_cache("hype", "hypeMan", None).await?;
//! let value = taxonomies.get_from_cache("hype").await?;
//!
//! // 4. Close connections on the way out
//! registry.shutdown().await;
//! ```

#[macro_use]
extern crate log;

pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod key;
pub mod observability;
pub mod reconnect;
pub mod registry;
pub mod serialization;
pub mod store;

// Re-exports for convenience
pub use backend::{BackendConnection, Connector};
pub use cache::{NamespacedCache, Template, TemplateSet};
pub use config::{AppConfig, StoreConfig};
pub use error::{Error, Result};
pub use key::{namespace_key, Namespace};
pub use reconnect::ReconnectPolicy;
pub use registry::{ConnectionMode, ConnectionRegistry, Lease, RegistryConfig, Role};
pub use store::KeyValueStore;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
