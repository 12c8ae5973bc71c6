//! Opaque handles and the identifier generator that mints them.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default prefix of minted handles.
pub const DEFAULT_HANDLE_PREFIX: &str = "obj-";

/// Opaque identifier of one registry entry, e.g.
/// `obj-0f8fad5b-d9cb-469f-a165-70867728950e`.
///
/// A handle names a minting event, not a value: two handles may reference
/// the same underlying object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(String);

impl Handle {
    /// Mint a fresh handle: `prefix` followed by a random version-4 UUID
    /// (32 hex digits, fixed version and variant nibbles).
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{}{}", prefix, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Handle {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<String> for Handle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Handle {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_shape() {
        let handle = Handle::generate(DEFAULT_HANDLE_PREFIX);
        let s = handle.as_str();
        assert!(s.starts_with("obj-"));

        let uuid = Uuid::parse_str(&s[4..]).unwrap();
        assert_eq!(uuid.get_version_num(), 4);
        assert_eq!(uuid.get_variant(), uuid::Variant::RFC4122);

        let hex: String = s[4..].chars().filter(|c| *c != '-').collect();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_is_unique() {
        let handles: HashSet<Handle> = (0..500).map(|_| Handle::generate("obj-")).collect();
        assert_eq!(handles.len(), 500);
    }

    #[test]
    fn test_custom_prefix() {
        let handle = Handle::generate("node-");
        assert!(handle.as_str().starts_with("node-"));
        assert_eq!(handle.to_string(), handle.as_str());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let handle = Handle::from("obj-123");
        assert_eq!(serde_json::to_string(&handle).unwrap(), "\"obj-123\"");
        let back: Handle = serde_json::from_str("\"obj-123\"").unwrap();
        assert_eq!(back, handle);
    }
}
