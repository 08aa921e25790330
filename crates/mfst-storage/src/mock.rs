//! Mock raw storage for testing.
//!
//! Provides [`MockRawStorage`] for unit testing without filesystem access.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, RwLock};

use mfst_runtime::{ContentType, Identifier, ObjectKey, ResourceTypeKey};

use crate::error::StorageError;
use crate::raw::{RawStorage, validate_identifier};

const BACKEND: &str = "Mock";

/// In-memory raw storage that counts calls per operation.
///
/// Operation names are the [`RawStorage`] method names (`"read"`, `"write"`,
/// `"list"`, ...). Counting lets tests prove which layer served a request.
///
/// # Example
///
/// ```ignore
/// use mfst_storage::{MockRawStorage, RawStorage};
///
/// let raw = MockRawStorage::new().with_entry(&key, ContentType::Json, b"{}");
/// raw.read(&key)?;
/// assert_eq!(raw.calls("read"), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockRawStorage {
    entries: RwLock<HashMap<ObjectKey, (ContentType, Vec<u8>)>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    content_type: ContentType,
}

impl MockRawStorage {
    /// Create an empty mock writing JSON.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty mock writing `content_type`.
    #[must_use]
    pub fn with_content_type(content_type: ContentType) -> Self {
        Self {
            content_type,
            ..Self::default()
        }
    }

    /// Seed an entry without counting a call.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_entry(self, key: &ObjectKey, content_type: ContentType, content: &[u8]) -> Self {
        self.entries
            .write()
            .unwrap()
            .insert(key.clone(), (content_type, content.to_vec()));
        self
    }

    /// Number of calls made to operation `op`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn calls(&self, op: &str) -> usize {
        self.calls.lock().unwrap().get(op).copied().unwrap_or(0)
    }

    /// Reset every call counter.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, op: &'static str) {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
    }

    fn not_found(key: &ObjectKey) -> StorageError {
        StorageError::not_found(key).with_backend(BACKEND)
    }
}

impl RawStorage for MockRawStorage {
    fn read(&self, key: &ObjectKey) -> Result<Vec<u8>, StorageError> {
        self.record("read");
        self.entries
            .read()
            .unwrap()
            .get(key)
            .map(|(_, content)| content.clone())
            .ok_or_else(|| Self::not_found(key))
    }

    fn write(&self, key: &ObjectKey, content: &[u8]) -> Result<(), StorageError> {
        self.record("write");
        validate_identifier(key.identifier())?;
        let mut entries = self.entries.write().unwrap();
        let content_type = entries.get(key).map_or(self.content_type, |(ct, _)| *ct);
        entries.insert(key.clone(), (content_type, content.to_vec()));
        Ok(())
    }

    fn create(&self, key: &ObjectKey, content: &[u8]) -> Result<(), StorageError> {
        self.record("create");
        validate_identifier(key.identifier())?;
        let mut entries = self.entries.write().unwrap();
        if entries.contains_key(key) {
            return Err(StorageError::already_exists(key).with_backend(BACKEND));
        }
        entries.insert(key.clone(), (self.content_type, content.to_vec()));
        Ok(())
    }

    fn update(&self, key: &ObjectKey, content: &[u8]) -> Result<(), StorageError> {
        self.record("update");
        let mut entries = self.entries.write().unwrap();
        let entry = entries.get_mut(key).ok_or_else(|| Self::not_found(key))?;
        entry.1 = content.to_vec();
        Ok(())
    }

    fn delete(&self, key: &ObjectKey) -> Result<(), StorageError> {
        self.record("delete");
        self.entries
            .write()
            .unwrap()
            .remove(key)
            .map(drop)
            .ok_or_else(|| Self::not_found(key))
    }

    fn exists(&self, key: &ObjectKey) -> bool {
        self.record("exists");
        self.entries.read().unwrap().contains_key(key)
    }

    fn list(&self, type_key: &ResourceTypeKey) -> Result<BTreeSet<Identifier>, StorageError> {
        self.record("list");
        Ok(self
            .entries
            .read()
            .unwrap()
            .keys()
            .filter(|key| key.type_key() == type_key)
            .map(|key| key.identifier().clone())
            .collect())
    }

    fn count(&self, type_key: &ResourceTypeKey) -> Result<u64, StorageError> {
        self.record("count");
        let entries = self.entries.read().unwrap();
        Ok(entries.keys().filter(|key| key.type_key() == type_key).count() as u64)
    }

    fn content_type(&self, key: &ObjectKey) -> Result<ContentType, StorageError> {
        self.entries
            .read()
            .unwrap()
            .get(key)
            .map(|(ct, _)| *ct)
            .ok_or_else(|| Self::not_found(key))
    }

    fn content_type_default(&self) -> ContentType {
        self.content_type
    }
}
