//! Type and object metadata.
//!
//! [`PartialObject`] is the metadata-only projection of an object. Decoding
//! it ignores every top-level field other than `apiVersion`, `kind` and
//! `metadata`, so it succeeds even when the type-specific payload would not
//! validate against its resource type.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::key::ResourceTypeKey;

/// `apiVersion` and `kind` of an encoded object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeMeta {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
}

impl TypeMeta {
    /// Type metadata for the given resource type.
    #[must_use]
    pub fn new(type_key: &ResourceTypeKey) -> Self {
        Self {
            api_version: type_key.api_version(),
            kind: type_key.kind().to_owned(),
        }
    }

    /// Parse back into a [`ResourceTypeKey`].
    #[must_use]
    pub fn type_key(&self) -> ResourceTypeKey {
        ResourceTypeKey::from_api_version(&self.api_version, self.kind.as_str())
    }

    /// True when neither field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.api_version.is_empty() && self.kind.is_empty()
    }
}

/// Object metadata: identity plus creation bookkeeping.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    /// Human-readable name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Generated unique id, assigned on create when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// Set on create when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
    /// Revision counter maintained by the writer.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub generation: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(value: &u64) -> bool {
    *value == 0
}

/// Metadata-only projection of an object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialObject {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    #[serde(default)]
    pub metadata: ObjectMeta,
}

impl PartialObject {
    /// Resource type recorded in the type metadata.
    #[must_use]
    pub fn type_key(&self) -> ResourceTypeKey {
        self.type_meta.type_key()
    }
}
