//! Namespaced caches over one key-value store.
//!
//! A [`NamespacedCache`] is a store plus a namespace tag. Every key passes
//! through [`namespace_key`] before it reaches the backend, so two caches can
//! use the same logical key without colliding.
//!
//! ```ignore
//! use cache_shell::NamespacedCache;
//!
//! let taxonomies = NamespacedCache::taxonomy(store.clone());
//! let templates = NamespacedCache::token_template(store);
//!
//! taxonomies.save_to_cache("hype", "hypeMan", None).await?;   // taxonomy-hype
//! templates.save_to_cache("hype", "other", None).await?;      // tokenTemplate-hype
//!
//! assert_eq!(taxonomies.get_from_cache("HYPE").await?, Some(json!("hypeMan")));
//! ```

use crate::backend::Connector;
use crate::error::Result;
use crate::key::{namespace_key, Namespace};
use crate::observability::TtlPolicy;
use crate::registry::Role;
use crate::serialization::{from_value, to_value};
use crate::store::KeyValueStore;
use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// One entry of a template document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub key: String,
    #[serde(rename = "Value")]
    pub value: Value,
}

/// Template document as delivered by the template service:
/// `{ "Template": [ { "key": "...", "Value": ... }, ... ] }`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateSet {
    #[serde(rename = "Template")]
    pub templates: Vec<Template>,
}

/// Cache whose keys live under one namespace tag.
pub struct NamespacedCache<C: Connector> {
    tag: String,
    store: KeyValueStore<C>,
    ttl_policy: TtlPolicy,
}

impl<C: Connector> Clone for NamespacedCache<C> {
    fn clone(&self) -> Self {
        NamespacedCache {
            tag: self.tag.clone(),
            store: self.store.clone(),
            ttl_policy: self.ttl_policy.clone(),
        }
    }
}

impl<C: Connector> NamespacedCache<C> {
    /// Create a cache for an arbitrary tag.
    ///
    /// Tags outside [`Namespace::ALL`] are accepted, but their keys are stored
    /// without a prefix.
    pub fn new(store: KeyValueStore<C>, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if Namespace::from_tag(&tag).is_none() {
            warn!(
                "Cache namespace '{}' is not recognised, keys will be stored unprefixed",
                tag
            );
        }

        NamespacedCache {
            tag,
            store,
            ttl_policy: TtlPolicy::default(),
        }
    }

    pub fn for_namespace(store: KeyValueStore<C>, namespace: Namespace) -> Self {
        Self::new(store, namespace.tag())
    }

    /// Cache for taxonomy documents.
    pub fn taxonomy(store: KeyValueStore<C>) -> Self {
        Self::for_namespace(store, Namespace::Taxonomy)
    }

    /// Cache for token templates.
    pub fn token_template(store: KeyValueStore<C>) -> Self {
        Self::for_namespace(store, Namespace::TokenTemplate)
    }

    /// Set the expiry used when `save_to_cache` is given no TTL.
    pub fn with_ttl_policy(mut self, policy: TtlPolicy) -> Self {
        self.ttl_policy = policy;
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Backend key for a caller-supplied key.
    pub fn key_for(&self, key: &str) -> String {
        namespace_key(&self.tag, key)
    }

    /// Save `value` under `key`.
    ///
    /// Without a `ttl` the cache's [`TtlPolicy`] decides; `Some(Duration::ZERO)`
    /// explicitly stores without expiry.
    ///
    /// # Errors
    ///
    /// - `Error::SerializationError` if `value` cannot be represented as JSON
    /// - Connection and operation errors from the store
    pub async fn save_to_cache<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let value = to_value(value)?;
        let ttl = ttl.or_else(|| self.ttl_policy.get_ttl(&self.tag));
        self.store.set(&self.key_for(key), &value, ttl).await
    }

    /// Fetch `key`. A key never saved reads as `None`.
    pub async fn get_from_cache(&self, key: &str) -> Result<Option<Value>> {
        self.store.get(&self.key_for(key)).await
    }

    /// Fetch `key` through the reader connection.
    pub async fn get_from_reader(&self, key: &str) -> Result<Option<Value>> {
        self.store.get_from(Role::Reader, &self.key_for(key)).await
    }

    /// Fetch `key` and convert it to `T`.
    ///
    /// # Errors
    ///
    /// `Error::DeserializationError` if the cached value is not a `T`.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get_from_cache(key)
            .await?
            .map(from_value)
            .transpose()
    }

    /// Remove `key`.
    pub async fn remove_from_cache(&self, key: &str) -> Result<()> {
        self.store.delete(&self.key_for(key)).await
    }

    /// Whether `key` holds a non-null value.
    ///
    /// Reads the value rather than using the backend's existence check, so a
    /// stored `null` counts as absent.
    pub async fn is_in_cache(&self, key: &str) -> Result<bool> {
        Ok(self.get_from_cache(key).await?.is_some())
    }

    /// Save every template of `templates`, returning how many were stored.
    ///
    /// Writes run concurrently; the first failure is returned.
    pub async fn load_templates(&self, templates: &TemplateSet) -> Result<usize> {
        try_join_all(
            templates
                .templates
                .iter()
                .map(|t| self.save_to_cache(&t.key, &t.value, None)),
        )
        .await?;

        info!(
            "✓ Loaded {} templates into '{}' cache",
            templates.templates.len(),
            self.tag
        );
        Ok(templates.templates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryConnector;
    use crate::error::Error;
    use crate::registry::{ConnectionRegistry, RegistryConfig};
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> KeyValueStore<InMemoryConnector> {
        KeyValueStore::new(Arc::new(ConnectionRegistry::new(
            InMemoryConnector::new(),
            RegistryConfig::default(),
        )))
    }

    fn raw(store: &KeyValueStore<InMemoryConnector>, key: &str) -> Option<String> {
        store.registry().connector().peek(key)
    }

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Taxonomy {
        id: u32,
        name: String,
    }

    #[tokio::test]
    async fn test_save_and_fetch() {
        let cache = NamespacedCache::taxonomy(store());

        cache
            .save_to_cache("hype", "hypeMan", None)
            .await
            .expect("Failed to save");

        assert_eq!(
            cache.get_from_cache("hype").await.expect("Failed to fetch"),
            Some(json!("hypeMan"))
        );
    }

    #[tokio::test]
    async fn test_keys_are_prefixed_and_lowercased() {
        let store = store();
        let cache = NamespacedCache::token_template(store.clone());

        cache
            .save_to_cache("Welcome", &json!({ "body": "hi" }), None)
            .await
            .expect("Failed to save");

        assert_eq!(
            raw(&store, "tokenTemplate-welcome"),
            Some(r#"{"body":"hi"}"#.to_string())
        );
        assert!(cache.is_in_cache("WELCOME").await.expect("Failed to check"));
    }

    #[tokio::test]
    async fn test_namespaces_do_not_collide() {
        let store = store();
        let taxonomies = NamespacedCache::taxonomy(store.clone());
        let templates = NamespacedCache::token_template(store);

        taxonomies
            .save_to_cache("same", "taxonomy value", None)
            .await
            .expect("Failed to save");

        assert!(!templates.is_in_cache("same").await.expect("Failed to check"));
    }

    #[tokio::test]
    async fn test_unrecognised_tag_is_unprefixed() {
        let store = store();
        let cache = NamespacedCache::new(store.clone(), "sessions");

        cache
            .save_to_cache("Abc", &42, None)
            .await
            .expect("Failed to save");

        assert_eq!(cache.key_for("Abc"), "-abc");
        assert_eq!(raw(&store, "-abc"), Some("42".to_string()));
    }

    #[tokio::test]
    async fn test_is_in_cache_truth_table() {
        let cache = NamespacedCache::taxonomy(store());

        assert!(!cache.is_in_cache("k").await.expect("Failed to check"));

        cache
            .save_to_cache("k", &json!([1, 2]), None)
            .await
            .expect("Failed to save");
        assert!(cache.is_in_cache("k").await.expect("Failed to check"));

        cache
            .save_to_cache("k", &Value::Null, None)
            .await
            .expect("Failed to save");
        assert!(!cache.is_in_cache("k").await.expect("Failed to check"));

        cache
            .save_to_cache("k", "again", None)
            .await
            .expect("Failed to save");
        cache.remove_from_cache("k").await.expect("Failed to remove");
        assert!(!cache.is_in_cache("k").await.expect("Failed to check"));
    }

    #[tokio::test]
    async fn test_typed_roundtrip() {
        let cache = NamespacedCache::taxonomy(store());
        let taxonomy = Taxonomy {
            id: 9,
            name: "music".to_string(),
        };

        cache
            .save_to_cache("music", &taxonomy, None)
            .await
            .expect("Failed to save");

        let loaded: Option<Taxonomy> = cache.get_as("music").await.expect("Failed to fetch");
        assert_eq!(loaded, Some(taxonomy));

        let missing: Option<Taxonomy> = cache.get_as("nope").await.expect("Failed to fetch");
        assert_eq!(missing, None);
    }

    #[tokio::test]
    async fn test_get_as_wrong_shape() {
        let cache = NamespacedCache::taxonomy(store());
        cache
            .save_to_cache("flat", "just text", None)
            .await
            .expect("Failed to save");

        let result = cache.get_as::<Taxonomy>("flat").await;
        assert!(matches!(result, Err(Error::DeserializationError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_policy_applies_without_explicit_ttl() {
        let cache = NamespacedCache::taxonomy(store())
            .with_ttl_policy(TtlPolicy::Fixed(Duration::from_secs(5)));

        cache
            .save_to_cache("policy", "x", None)
            .await
            .expect("Failed to save");
        cache
            .save_to_cache("forever", "x", Some(Duration::ZERO))
            .await
            .expect("Failed to save");

        tokio::time::advance(Duration::from_secs(6)).await;

        assert!(!cache.is_in_cache("policy").await.expect("Failed to check"));
        assert!(cache.is_in_cache("forever").await.expect("Failed to check"));
    }

    #[tokio::test]
    async fn test_load_templates() {
        let store = store();
        let cache = NamespacedCache::token_template(store.clone());

        let templates: TemplateSet = serde_json::from_value(json!({
            "Template": [
                { "key": "Greeting", "Value": "Hello {{name}}" },
                { "key": "receipt", "Value": { "subject": "Your order" } }
            ]
        }))
        .expect("Invalid template document");

        let loaded = cache
            .load_templates(&templates)
            .await
            .expect("Failed to load templates");

        assert_eq!(loaded, 2);
        assert_eq!(
            raw(&store, "tokenTemplate-greeting"),
            Some("Hello {{name}}".to_string())
        );
        assert_eq!(
            cache.get_from_cache("RECEIPT").await.expect("Failed to fetch"),
            Some(json!({ "subject": "Your order" }))
        );
    }

    #[tokio::test]
    async fn test_get_from_reader() {
        let cache = NamespacedCache::taxonomy(store());
        cache
            .save_to_cache("r", &true, None)
            .await
            .expect("Failed to save");

        assert_eq!(
            cache.get_from_reader("R").await.expect("Failed to fetch"),
            Some(json!(true))
        );
    }
}
