//! Resource type and object keys.
//!
//! A [`ResourceTypeKey`] is the `(group, version, kind)` triple that partitions
//! both the on-disk layout and the cache index. An [`ObjectKey`] adds the
//! [`Identifier`] of a single object within that type.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a resource type by group, version and kind.
///
/// The core group is represented by an empty `group`, in which case the
/// rendered `apiVersion` is just the version (e.g. `"v1"`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceTypeKey {
    group: String,
    version: String,
    kind: String,
}

impl ResourceTypeKey {
    /// Create a key from its three components.
    #[must_use]
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Build a key from an `apiVersion` string (`"group/version"` or `"version"`).
    #[must_use]
    pub fn from_api_version(api_version: &str, kind: impl Into<String>) -> Self {
        match api_version.rsplit_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    /// API group (empty for the core group).
    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    /// API version within the group.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Resource kind (e.g. `"Car"`).
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Rendered `apiVersion` field value.
    #[must_use]
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// True when no kind is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.kind.is_empty()
    }
}

impl fmt::Display for ResourceTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// Stable identifier of one object within its [`ResourceTypeKey`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Wrap a string as an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the empty identifier, which is never valid for a stored object.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for Identifier {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Universal lookup key for single-object operations.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    type_key: ResourceTypeKey,
    identifier: Identifier,
}

impl ObjectKey {
    /// Create an object key.
    #[must_use]
    pub fn new(type_key: ResourceTypeKey, identifier: impl Into<Identifier>) -> Self {
        Self {
            type_key,
            identifier: identifier.into(),
        }
    }

    /// Resource type of the object.
    #[must_use]
    pub fn type_key(&self) -> &ResourceTypeKey {
        &self.type_key
    }

    /// Identifier of the object.
    #[must_use]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Shorthand for `self.type_key().kind()`.
    #[must_use]
    pub fn kind(&self) -> &str {
        self.type_key.kind()
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_key.kind, self.identifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_version_with_group() {
        let key = ResourceTypeKey::new("sample-app.weave.works", "v1alpha1", "Car");

        assert_eq!(key.api_version(), "sample-app.weave.works/v1alpha1");
        assert_eq!(key.kind(), "Car");
    }

    #[test]
    fn test_api_version_core_group() {
        let key = ResourceTypeKey::new("", "v1", "ConfigMap");

        assert_eq!(key.api_version(), "v1");
    }

    #[test]
    fn test_from_api_version_round_trips() {
        let key = ResourceTypeKey::from_api_version("sample-app.weave.works/v1alpha1", "Car");
        assert_eq!(key.group(), "sample-app.weave.works");
        assert_eq!(key.version(), "v1alpha1");

        let core = ResourceTypeKey::from_api_version("v1", "ConfigMap");
        assert_eq!(core.group(), "");
        assert_eq!(core.version(), "v1");
    }

    #[test]
    fn test_type_key_display() {
        let key = ResourceTypeKey::new("sample", "v1", "Car");

        assert_eq!(key.to_string(), "sample/v1, Kind=Car");
    }

    #[test]
    fn test_object_key_display() {
        let key = ObjectKey::new(ResourceTypeKey::new("sample", "v1", "Car"), "foo");

        assert_eq!(key.to_string(), "Car/foo");
        assert_eq!(key.identifier().as_str(), "foo");
        assert_eq!(key.kind(), "Car");
    }

    #[test]
    fn test_identifier_empty() {
        assert!(Identifier::default().is_empty());
        assert!(!Identifier::from("x").is_empty());
    }
}
