//! Content types and the serializer capability.
//!
//! The storage core never touches a wire format directly. It goes through the
//! [`Serializer`] trait, which encodes [`Object`]s and decodes both full
//! objects and metadata-only [`PartialObject`]s for a [`ContentType`].
//! [`SchemeSerializer`] is the serde-based implementation.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::ResourceTypeKey;
use crate::meta::PartialObject;
use crate::object::Object;
use crate::scheme::Scheme;

/// Encoding of a stored object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Json,
    Yaml,
}

/// File extension to content type table, shared read-only configuration.
///
/// The first entry for a content type is the extension used when writing.
pub const CONTENT_TYPES: &[(&str, ContentType)] = &[
    (".json", ContentType::Json),
    (".yaml", ContentType::Yaml),
    (".yml", ContentType::Yaml),
];

impl ContentType {
    /// Extension (with leading dot) used when writing this content type.
    #[must_use]
    pub fn extension(self) -> &'static str {
        CONTENT_TYPES
            .iter()
            .find(|(_, ct)| *ct == self)
            .map_or("", |(ext, _)| ext)
    }

    /// Content type for an extension, with or without the leading dot.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        CONTENT_TYPES
            .iter()
            .find(|(known, _)| known[1..].eq_ignore_ascii_case(ext))
            .map(|(_, ct)| *ct)
    }

    /// Content type for a file path, based on its extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Yaml => f.write_str("yaml"),
        }
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s).ok_or_else(|| format!("unknown content type: {s}"))
    }
}

/// Underlying format library error.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

/// Serializer failure.
#[derive(Debug, thiserror::Error)]
pub enum SerializerError {
    #[error("failed to encode {content_type}: {source}")]
    Encode {
        content_type: ContentType,
        source: FormatError,
    },
    #[error("failed to decode {content_type}: {source}")]
    Decode {
        content_type: ContentType,
        source: FormatError,
    },
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: ResourceTypeKey,
        found: ResourceTypeKey,
    },
    #[error("invalid {type_key}: {source}")]
    Invalid {
        type_key: ResourceTypeKey,
        source: serde_json::Error,
    },
}

impl SerializerError {
    /// True for encode failures, false for every decode-side failure.
    #[must_use]
    pub fn is_encode(&self) -> bool {
        matches!(self, Self::Encode { .. })
    }
}

/// Encode/decode capability consumed by the storage core.
pub trait Serializer: Send + Sync {
    /// Encode a full object.
    fn encode(
        &self,
        object: &Object,
        content_type: ContentType,
    ) -> Result<Vec<u8>, SerializerError>;

    /// Decode a full object, validating it against `expected` when given.
    fn decode(
        &self,
        bytes: &[u8],
        content_type: ContentType,
        expected: Option<&ResourceTypeKey>,
    ) -> Result<Object, SerializerError>;

    /// Decode type and object metadata only.
    fn decode_meta(
        &self,
        bytes: &[u8],
        content_type: ContentType,
    ) -> Result<PartialObject, SerializerError>;

    /// Decode into an untyped value tree.
    fn decode_value(
        &self,
        bytes: &[u8],
        content_type: ContentType,
    ) -> Result<Value, SerializerError>;

    /// Validate an in-memory object, checking its type against `expected` when given.
    fn validate(
        &self,
        object: &Object,
        expected: Option<&ResourceTypeKey>,
    ) -> Result<(), SerializerError>;

    /// Zero-value object for a resource type.
    fn new_object(&self, type_key: &ResourceTypeKey) -> Object;
}

/// serde-based [`Serializer`] backed by a [`Scheme`].
#[derive(Debug, Default, Clone)]
pub struct SchemeSerializer {
    scheme: Scheme,
}

impl SchemeSerializer {
    /// Create a serializer validating against `scheme`.
    #[must_use]
    pub fn new(scheme: Scheme) -> Self {
        Self { scheme }
    }

    /// The scheme used for validation and zero values.
    #[must_use]
    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }
}

impl Serializer for SchemeSerializer {
    fn encode(
        &self,
        object: &Object,
        content_type: ContentType,
    ) -> Result<Vec<u8>, SerializerError> {
        let encoded = match content_type {
            ContentType::Json => serde_json::to_vec_pretty(object)
                .map(|mut bytes| {
                    bytes.push(b'\n');
                    bytes
                })
                .map_err(FormatError::from),
            ContentType::Yaml => serde_yaml::to_string(object)
                .map(String::into_bytes)
                .map_err(FormatError::from),
        };
        encoded.map_err(|source| SerializerError::Encode {
            content_type,
            source,
        })
    }

    fn decode(
        &self,
        bytes: &[u8],
        content_type: ContentType,
        expected: Option<&ResourceTypeKey>,
    ) -> Result<Object, SerializerError> {
        let value = self.decode_value(bytes, content_type)?;
        let object: Object = serde_json::from_value(value).map_err(|e| SerializerError::Decode {
            content_type,
            source: e.into(),
        })?;
        self.validate(&object, expected)?;
        Ok(object)
    }

    fn decode_meta(
        &self,
        bytes: &[u8],
        content_type: ContentType,
    ) -> Result<PartialObject, SerializerError> {
        let decoded = match content_type {
            ContentType::Json => serde_json::from_slice(bytes).map_err(FormatError::from),
            ContentType::Yaml => serde_yaml::from_slice(bytes).map_err(FormatError::from),
        };
        decoded.map_err(|source| SerializerError::Decode {
            content_type,
            source,
        })
    }

    fn decode_value(
        &self,
        bytes: &[u8],
        content_type: ContentType,
    ) -> Result<Value, SerializerError> {
        let decoded = match content_type {
            ContentType::Json => serde_json::from_slice(bytes).map_err(FormatError::from),
            ContentType::Yaml => serde_yaml::from_slice(bytes).map_err(FormatError::from),
        };
        decoded.map_err(|source| SerializerError::Decode {
            content_type,
            source,
        })
    }

    fn validate(
        &self,
        object: &Object,
        expected: Option<&ResourceTypeKey>,
    ) -> Result<(), SerializerError> {
        let found = object.type_key();
        if let Some(expected) = expected
            && *expected != found
        {
            return Err(SerializerError::TypeMismatch {
                expected: expected.clone(),
                found,
            });
        }
        self.scheme
            .validate(object)
            .map_err(|source| SerializerError::Invalid {
                type_key: found,
                source,
            })
    }

    fn new_object(&self, type_key: &ResourceTypeKey) -> Object {
        self.scheme.new_object(type_key)
    }
}
