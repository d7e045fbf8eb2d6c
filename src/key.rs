//! Cache key preprocessing.
//!
//! All logical caches share one flat backend keyspace. A key is made unique to
//! its cache by prefixing the namespace tag, and case-insensitive by
//! lower-casing the caller's part:
//!
//! ```
//! use cache_shell::key::namespace_key;
//!
//! assert_eq!(namespace_key("taxonomy", "Hype"), "taxonomy-hype");
//! assert_eq!(namespace_key("unknown", "Hype"), "-hype");
//! ```

use std::fmt;
use std::str::FromStr;

/// Separator between namespace tag and key.
pub const SEPARATOR: char = '-';

/// Logical cache categories recognised by the key preprocessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    Taxonomy,
    TokenTemplate,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Taxonomy, Namespace::TokenTemplate];

    /// Tag written in front of every key of this namespace.
    pub fn tag(&self) -> &'static str {
        match self {
            Namespace::Taxonomy => "taxonomy",
            Namespace::TokenTemplate => "tokenTemplate",
        }
    }

    /// Look up a namespace by its exact (case-sensitive) tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ns| ns.tag() == tag)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Namespace {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        Self::from_tag(s).ok_or_else(|| {
            crate::error::Error::ConfigError(format!("Unknown cache namespace '{}'", s))
        })
    }
}

/// Build the backend key for `key` in the cache tagged `tag`.
///
/// An unrecognised tag contributes nothing, leaving `"-" + key`.
pub fn namespace_key(tag: &str, key: &str) -> String {
    let prefix = Namespace::from_tag(tag).map_or("", |ns| ns.tag());
    format!("{}{}{}", prefix, SEPARATOR, key.to_lowercase())
}
