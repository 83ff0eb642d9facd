//! Tenant key type, the sole isolation boundary
//!
//! A `TenantKey` is an opaque, stable identifier derived from a restaurant's
//! unique slug. Every connection, handle and document in Mesa is scoped to
//! exactly one tenant key; there is no cross-tenant access path.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

const MAX_KEY_LEN: usize = 64;

/// Stable identifier selecting one tenant's isolated storage.
///
/// Keys are lowercase slugs (`[a-z0-9]` and interior `-`), e.g. `"pizza-hut"`
/// or `"sushi-bar"`. Immutable once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantKey(String);

impl TenantKey {
    /// Create a tenant key from a slug, validating its format.
    ///
    /// # Errors
    /// - `Error::InvalidTenant` if the slug is empty, too long, contains
    ///   characters outside `[a-z0-9-]`, or starts/ends with a hyphen
    pub fn new(slug: impl Into<String>) -> Result<Self> {
        let slug = slug.into();
        if slug.is_empty() {
            return Err(Error::InvalidTenant("empty tenant key".to_string()));
        }
        if slug.len() > MAX_KEY_LEN {
            return Err(Error::InvalidTenant(format!(
                "tenant key exceeds {} characters",
                MAX_KEY_LEN
            )));
        }
        if !slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(Error::InvalidTenant(format!(
                "tenant key '{}' contains invalid characters (expected [a-z0-9-])",
                slug
            )));
        }
        if slug.starts_with('-') || slug.ends_with('-') {
            return Err(Error::InvalidTenant(format!(
                "tenant key '{}' must not start or end with a hyphen",
                slug
            )));
        }
        Ok(Self(slug))
    }

    /// Get the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TenantKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for TenantKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<TenantKey> for String {
    fn from(key: TenantKey) -> String {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_slugs() {
        assert!(TenantKey::new("pizza-hut").is_ok());
        assert!(TenantKey::new("sushi-bar").is_ok());
        assert!(TenantKey::new("cafe42").is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(TenantKey::new(""), Err(Error::InvalidTenant(_))));
    }

    #[test]
    fn test_rejects_uppercase_and_symbols() {
        assert!(TenantKey::new("Pizza-Hut").is_err());
        assert!(TenantKey::new("taco town").is_err());
        assert!(TenantKey::new("a/b").is_err());
        assert!(TenantKey::new("../etc").is_err());
    }

    #[test]
    fn test_rejects_edge_hyphens() {
        assert!(TenantKey::new("-pizza").is_err());
        assert!(TenantKey::new("pizza-").is_err());
    }

    #[test]
    fn test_rejects_overlong() {
        let slug = "a".repeat(MAX_KEY_LEN + 1);
        assert!(TenantKey::new(slug).is_err());
    }

    #[test]
    fn test_display_and_parse_roundtrip() {
        let key: TenantKey = "pizza-hut".parse().unwrap();
        assert_eq!(key.to_string(), "pizza-hut");
        assert_eq!(key.as_str(), "pizza-hut");
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let ok: std::result::Result<TenantKey, _> = serde_json::from_str("\"sushi-bar\"");
        assert!(ok.is_ok());
        let bad: std::result::Result<TenantKey, _> = serde_json::from_str("\"Sushi Bar\"");
        assert!(bad.is_err());
    }
}
