//! Object storage trait and its generic implementation.
//!
//! [`Storage`] is the object-level API shared by [`GenericStorage`] and the
//! caching layer. [`GenericStorage`] decodes and encodes objects through a
//! [`Serializer`] on top of any [`RawStorage`].

use std::sync::Arc;

use chrono::Utc;
use mfst_patch::Patcher;
use mfst_runtime::{
    ContentType, Object, ObjectKey, PartialObject, ResourceTypeKey, Serializer, SerializerError,
    Strategies, TypeMeta, default_strategies, derive_identifier,
};

use crate::error::{StorageError, StorageErrorKind};
use crate::raw::RawStorage;

/// Object-level storage.
///
/// Objects are addressed by [`ObjectKey`]; new objects get their key from
/// the configured identifier strategies.
pub trait Storage: Send + Sync {
    /// Zero-value object for a resource type. Never fails.
    fn new_object(&self, type_key: &ResourceTypeKey) -> Object;

    /// Read and fully decode an object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::NotFound`] if the key is absent, or
    /// [`StorageErrorKind::Decode`] if the stored payload does not decode as
    /// the key's resource type.
    fn get(&self, key: &ObjectKey) -> Result<Object, StorageError>;

    /// Read only the type and object metadata.
    ///
    /// Succeeds even when the rest of the payload is invalid for its type.
    fn get_meta(&self, key: &ObjectKey) -> Result<PartialObject, StorageError>;

    /// Store a new object.
    ///
    /// Assigns a generated `uid` and a `creationTimestamp` when absent, then
    /// derives the identifier from the metadata.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::AlreadyExists`] if the derived key is
    /// occupied, or [`StorageErrorKind::InvariantViolation`] if no identifier
    /// can be derived.
    fn create(&self, object: &mut Object) -> Result<(), StorageError>;

    /// Overwrite an existing object.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::NotFound`] if the object does not exist.
    fn update(&self, object: &Object) -> Result<(), StorageError>;

    /// Overwrite an existing object of an explicitly given type.
    ///
    /// Empty type metadata is filled from `type_key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::InvalidParams`] if the object carries a
    /// different type, otherwise as [`update`](Self::update).
    fn set(&self, type_key: &ResourceTypeKey, object: &Object) -> Result<(), StorageError>;

    /// Merge a JSON overlay onto the stored object and write it back.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::Patch`] if the result is invalid; the stored
    /// object is left untouched in that case.
    fn patch(&self, key: &ObjectKey, overlay: &[u8]) -> Result<(), StorageError>;

    /// Remove an object.
    fn delete(&self, key: &ObjectKey) -> Result<(), StorageError>;

    /// Every object of a resource type, ordered by identifier.
    fn list(&self, type_key: &ResourceTypeKey) -> Result<Vec<Object>, StorageError>;

    /// Metadata of every object of a resource type, ordered by identifier.
    fn list_meta(&self, type_key: &ResourceTypeKey) -> Result<Vec<PartialObject>, StorageError>;

    /// Number of stored objects of a resource type.
    fn count(&self, type_key: &ResourceTypeKey) -> Result<u64, StorageError>;

    /// Hex-encoded SHA-256 of the stored encoding.
    fn checksum(&self, key: &ObjectKey) -> Result<String, StorageError>;

    /// Key an object is stored under.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::InvalidParams`] for objects without type
    /// metadata and [`StorageErrorKind::InvariantViolation`] when no identifier
    /// can be derived.
    fn object_key_for(&self, object: &Object) -> Result<ObjectKey, StorageError>;

    /// The underlying raw store.
    fn raw_storage(&self) -> &dyn RawStorage;

    /// The serializer used for encoding and decoding.
    fn serializer(&self) -> &dyn Serializer;
}

/// Fill empty type metadata from `type_key`, reject a mismatching one.
pub(crate) fn with_type<'a>(
    type_key: &ResourceTypeKey,
    object: &'a Object,
) -> Result<std::borrow::Cow<'a, Object>, StorageError> {
    if object.type_meta.is_empty() {
        let mut filled = object.clone();
        filled.type_meta = TypeMeta::new(type_key);
        return Ok(std::borrow::Cow::Owned(filled));
    }
    if object.type_key() != *type_key {
        return Err(StorageError::invalid_params(format!(
            "object type {} does not match {type_key}",
            object.type_key()
        )));
    }
    Ok(std::borrow::Cow::Borrowed(object))
}

/// [`Storage`] over a [`RawStorage`] and a [`Serializer`].
pub struct GenericStorage {
    raw: Arc<dyn RawStorage>,
    serializer: Arc<dyn Serializer>,
    patcher: Patcher,
    strategies: Strategies,
}

impl GenericStorage {
    /// Create a storage using the default identifier strategies (name, then uid).
    pub fn new(raw: Arc<dyn RawStorage>, serializer: Arc<dyn Serializer>) -> Self {
        Self {
            patcher: Patcher::new(Arc::clone(&serializer)),
            raw,
            serializer,
            strategies: default_strategies(),
        }
    }

    /// Replace the identifier strategies.
    #[must_use]
    pub fn with_strategies(mut self, strategies: Strategies) -> Self {
        self.strategies = strategies;
        self
    }

    /// The patch engine used by [`Storage::patch`].
    #[must_use]
    pub fn patcher(&self) -> &Patcher {
        &self.patcher
    }

    fn read(&self, key: &ObjectKey) -> Result<(Vec<u8>, ContentType), StorageError> {
        let content_type = self.raw.content_type(key)?;
        let content = self.raw.read(key)?;
        Ok((content, content_type))
    }

    fn encode(&self, key: &ObjectKey, object: &Object) -> Result<Vec<u8>, StorageError> {
        let content_type = match self.raw.content_type(key) {
            Ok(ct) => ct,
            Err(e) if e.is_not_found() => self.raw.content_type_default(),
            Err(e) => return Err(e),
        };
        self.serializer
            .encode(object, content_type)
            .map_err(|e| StorageError::serializer(e).with_key(key))
    }

    fn check_type(key: &ObjectKey, found: &ResourceTypeKey) -> Result<(), StorageError> {
        if found == key.type_key() {
            return Ok(());
        }
        Err(StorageError::serializer(SerializerError::TypeMismatch {
            expected: key.type_key().clone(),
            found: found.clone(),
        })
        .with_key(key))
    }
}

impl Storage for GenericStorage {
    fn new_object(&self, type_key: &ResourceTypeKey) -> Object {
        self.serializer.new_object(type_key)
    }

    fn get(&self, key: &ObjectKey) -> Result<Object, StorageError> {
        let (content, content_type) = self.read(key)?;
        self.serializer
            .decode(&content, content_type, Some(key.type_key()))
            .map_err(|e| StorageError::serializer(e).with_key(key))
    }

    fn get_meta(&self, key: &ObjectKey) -> Result<PartialObject, StorageError> {
        let (content, content_type) = self.read(key)?;
        let partial = self
            .serializer
            .decode_meta(&content, content_type)
            .map_err(|e| StorageError::serializer(e).with_key(key))?;
        Self::check_type(key, &partial.type_key())?;
        Ok(partial)
    }

    fn create(&self, object: &mut Object) -> Result<(), StorageError> {
        if object.metadata.uid.is_empty() {
            object.metadata.uid = uuid::Uuid::new_v4().to_string();
        }
        if object.metadata.creation_timestamp.is_none() {
            object.metadata.creation_timestamp = Some(Utc::now());
        }

        let key = self.object_key_for(object)?;
        let content = self.encode(&key, object)?;
        self.raw.create(&key, &content)?;
        tracing::debug!(%key, uid = %object.metadata.uid, "Created object");
        Ok(())
    }

    fn update(&self, object: &Object) -> Result<(), StorageError> {
        let key = self.object_key_for(object)?;
        let content = self.encode(&key, object)?;
        self.raw.update(&key, &content)?;
        tracing::debug!(%key, "Updated object");
        Ok(())
    }

    fn set(&self, type_key: &ResourceTypeKey, object: &Object) -> Result<(), StorageError> {
        let typed = with_type(type_key, object)?;
        self.update(&typed)
    }

    fn patch(&self, key: &ObjectKey, overlay: &[u8]) -> Result<(), StorageError> {
        let (base, content_type) = self.read(key)?;
        let patched = self
            .patcher
            .apply(&base, content_type, overlay, key.type_key())
            .map_err(|e| StorageError::from(e).with_key(key))?;
        self.raw.update(key, &patched)?;
        tracing::debug!(%key, "Patched object");
        Ok(())
    }

    fn delete(&self, key: &ObjectKey) -> Result<(), StorageError> {
        self.raw.delete(key)?;
        tracing::debug!(%key, "Deleted object");
        Ok(())
    }

    fn list(&self, type_key: &ResourceTypeKey) -> Result<Vec<Object>, StorageError> {
        self.raw
            .list(type_key)?
            .into_iter()
            .map(|id| self.get(&ObjectKey::new(type_key.clone(), id)))
            .collect()
    }

    fn list_meta(&self, type_key: &ResourceTypeKey) -> Result<Vec<PartialObject>, StorageError> {
        self.raw
            .list(type_key)?
            .into_iter()
            .map(|id| self.get_meta(&ObjectKey::new(type_key.clone(), id)))
            .collect()
    }

    fn count(&self, type_key: &ResourceTypeKey) -> Result<u64, StorageError> {
        self.raw.count(type_key)
    }

    fn checksum(&self, key: &ObjectKey) -> Result<String, StorageError> {
        self.raw.checksum(key)
    }

    fn object_key_for(&self, object: &Object) -> Result<ObjectKey, StorageError> {
        if object.type_meta.is_empty() {
            return Err(StorageError::new(StorageErrorKind::InvalidParams)
                .with_message("object has no apiVersion/kind"));
        }
        let identifier = derive_identifier(&object.metadata, &self.strategies)?;
        Ok(ObjectKey::new(object.type_key(), identifier))
    }

    fn raw_storage(&self) -> &dyn RawStorage {
        self.raw.as_ref()
    }

    fn serializer(&self) -> &dyn Serializer {
        self.serializer.as_ref()
    }
}
