use std::sync::{Arc, RwLock};

use mfst_runtime::{Object, ObjectKey, PartialObject, ResourceTypeKey, Serializer, TypeMeta};
use mfst_storage::{RawStorage, Storage, StorageError};

use crate::index::{CacheEntry, Index};

/// Something holding derived copies of stored objects that can drop one.
pub trait Invalidate: Send + Sync {
    /// Forget any cached copy of `key`.
    fn invalidate(&self, key: &ObjectKey);
}

/// Transparent caching layer in front of a [`Storage`].
///
/// Keeps an index of full and metadata-only entries. The index only ever
/// holds keys present in the backing store: writes reach the backing store
/// before the index, deletes leave the index first, and patches evict the
/// entry so the next read reloads it.
///
/// Listing is served from the index when it is complete for the type, that
/// is when it holds as many entries as the backing store reports.
pub struct Cache {
    backing: Arc<dyn Storage>,
    index: RwLock<Index>,
}

impl Cache {
    pub fn new(backing: Arc<dyn Storage>) -> Self {
        Self {
            backing,
            index: RwLock::new(Index::default()),
        }
    }

    /// The wrapped storage.
    #[must_use]
    pub fn backing(&self) -> &Arc<dyn Storage> {
        &self.backing
    }

    /// Snapshot of the cached entry for `key`.
    pub fn entry(&self, key: &ObjectKey) -> Option<CacheEntry> {
        self.index.read().unwrap().get(key).cloned()
    }

    /// Number of cached entries for a resource type.
    pub fn cached_count(&self, type_key: &ResourceTypeKey) -> u64 {
        self.index.read().unwrap().count(type_key)
    }

    /// Drop the cached entry for `key`, returning whether one existed.
    pub fn invalidate(&self, key: &ObjectKey) -> bool {
        self.index.write().unwrap().remove(key)
    }

    /// Write every full entry back through the wrapped storage.
    ///
    /// Partial entries carry nothing to write and are skipped. Returns the
    /// number of objects written.
    pub fn flush(&self) -> Result<usize, StorageError> {
        let objects = self.index.read().unwrap().full_objects();
        for object in &objects {
            self.backing.update(object)?;
        }
        tracing::debug!(objects = objects.len(), "Flushed cache");
        Ok(objects.len())
    }

    fn epoch(&self) -> u64 {
        self.index.read().unwrap().epoch()
    }

    /// Run `f` on the index unless an eviction happened since `epoch`.
    fn store_since(&self, epoch: u64, f: impl FnOnce(&mut Index)) {
        let mut index = self.index.write().unwrap();
        if index.epoch() == epoch {
            f(&mut index);
        } else {
            tracing::trace!("Index changed during backing read, not caching");
        }
    }

    /// Cache an object just written to the backing store.
    ///
    /// If the index changed while writing, the key is dropped instead so no
    /// stale copy survives. Either way the epoch advances, so reads that
    /// started before the write do not cache what they saw.
    fn store_written(&self, epoch: u64, key: &ObjectKey, object: Object) {
        let mut index = self.index.write().unwrap();
        if index.epoch() == epoch {
            index.store_full(key, object);
            index.advance_epoch();
        } else {
            index.remove(key);
        }
    }

    /// Promote or load `key` into a full entry.
    fn load_full(&self, key: &ObjectKey, epoch: u64) -> Result<Object, StorageError> {
        let object = self.backing.get(key)?;
        self.store_since(epoch, |index| index.store_full(key, object.clone()));
        Ok(object)
    }

    /// Serve a listing from a complete index, promoting partial entries.
    ///
    /// Returns `None` when a cached entry has vanished from the backing
    /// store; the entry is evicted and the caller falls back to the backing
    /// listing.
    fn list_from_index(
        &self,
        type_key: &ResourceTypeKey,
        epoch: u64,
    ) -> Result<Option<Vec<Object>>, StorageError> {
        let entries = self.index.read().unwrap().entries(type_key);
        let mut objects = Vec::with_capacity(entries.len());
        for (id, entry) in entries {
            match entry {
                CacheEntry::Full(object) => objects.push(object),
                CacheEntry::Partial(_) => {
                    let key = ObjectKey::new(type_key.clone(), id);
                    match self.load_full(&key, epoch) {
                        Ok(object) => objects.push(object),
                        Err(e) if e.is_not_found() => {
                            tracing::trace!(%key, "Cached object vanished, evicting");
                            self.invalidate(&key);
                            return Ok(None);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Ok(Some(objects))
    }

    fn is_complete(&self, type_key: &ResourceTypeKey) -> Result<(bool, u64), StorageError> {
        let total = self.backing.count(type_key)?;
        let index = self.index.read().unwrap();
        Ok((index.count(type_key) == total, index.epoch()))
    }

    /// Load every stored object of a type through the wrapped storage, keyed
    /// by its stored identifier. Objects deleted mid-listing are skipped.
    fn load_all<T>(
        &self,
        type_key: &ResourceTypeKey,
        load: impl Fn(&ObjectKey) -> Result<T, StorageError>,
    ) -> Result<Vec<(ObjectKey, T)>, StorageError> {
        let ids = self.backing.raw_storage().list(type_key)?;
        let mut loaded = Vec::with_capacity(ids.len());
        for id in ids {
            let key = ObjectKey::new(type_key.clone(), id);
            match load(&key) {
                Ok(value) => loaded.push((key, value)),
                Err(e) if e.is_not_found() => tracing::trace!(%key, "Skipping vanished object"),
                Err(e) => return Err(e),
            }
        }
        Ok(loaded)
    }
}

impl Invalidate for Cache {
    fn invalidate(&self, key: &ObjectKey) {
        Cache::invalidate(self, key);
    }
}

impl Storage for Cache {
    fn new_object(&self, type_key: &ResourceTypeKey) -> Object {
        self.backing.new_object(type_key)
    }

    fn get(&self, key: &ObjectKey) -> Result<Object, StorageError> {
        let (cached, epoch) = {
            let index = self.index.read().unwrap();
            (index.get(key).cloned(), index.epoch())
        };

        match cached {
            Some(CacheEntry::Full(object)) => {
                tracing::trace!(%key, "Cache hit");
                Ok(object)
            }
            Some(CacheEntry::Partial(_)) => {
                tracing::trace!(%key, "Cache promote");
                self.load_full(key, epoch)
            }
            None => {
                tracing::trace!(%key, "Cache miss");
                self.load_full(key, epoch)
            }
        }
    }

    fn get_meta(&self, key: &ObjectKey) -> Result<PartialObject, StorageError> {
        let epoch = self.epoch();
        let partial = self.backing.get_meta(key)?;
        self.store_since(epoch, |index| index.store_partial(key, partial.clone()));
        Ok(partial)
    }

    fn create(&self, object: &mut Object) -> Result<(), StorageError> {
        let epoch = self.epoch();
        self.backing.create(object)?;
        let key = self.backing.object_key_for(object)?;
        self.store_written(epoch, &key, object.clone());
        Ok(())
    }

    fn update(&self, object: &Object) -> Result<(), StorageError> {
        let key = self.backing.object_key_for(object)?;
        let epoch = self.epoch();
        self.backing.update(object)?;
        self.store_written(epoch, &key, object.clone());
        Ok(())
    }

    fn set(&self, type_key: &ResourceTypeKey, object: &Object) -> Result<(), StorageError> {
        let epoch = self.epoch();
        self.backing.set(type_key, object)?;

        let mut object = object.clone();
        if object.type_meta.is_empty() {
            object.type_meta = TypeMeta::new(type_key);
        }
        let key = self.backing.object_key_for(&object)?;
        self.store_written(epoch, &key, object);
        Ok(())
    }

    fn patch(&self, key: &ObjectKey, overlay: &[u8]) -> Result<(), StorageError> {
        self.backing.patch(key, overlay)?;
        self.invalidate(key);
        Ok(())
    }

    fn delete(&self, key: &ObjectKey) -> Result<(), StorageError> {
        self.invalidate(key);
        let result = self.backing.delete(key);
        // Drops anything a concurrent read or write cached before the file went away.
        self.invalidate(key);
        result
    }

    fn list(&self, type_key: &ResourceTypeKey) -> Result<Vec<Object>, StorageError> {
        let (complete, epoch) = self.is_complete(type_key)?;

        if complete {
            tracing::trace!(%type_key, "Cache hit when listing");
            if let Some(objects) = self.list_from_index(type_key, epoch)? {
                return Ok(objects);
            }
        }

        tracing::trace!(%type_key, "Cache miss when listing");
        let epoch = self.epoch();
        let loaded = self.load_all(type_key, |key| self.backing.get(key))?;
        let objects = loaded.iter().map(|(_, object)| object.clone()).collect();
        self.store_since(epoch, |index| {
            for (key, object) in loaded {
                index.backfill_full(&key, object);
            }
        });
        Ok(objects)
    }

    fn list_meta(&self, type_key: &ResourceTypeKey) -> Result<Vec<PartialObject>, StorageError> {
        let (complete, epoch) = self.is_complete(type_key)?;

        if complete {
            tracing::trace!(%type_key, "Cache hit when listing metadata");
            let entries = self.index.read().unwrap().entries(type_key);
            return Ok(entries.iter().map(|(_, entry)| entry.to_partial()).collect());
        }

        tracing::trace!(%type_key, "Cache miss when listing metadata");
        let loaded = self.load_all(type_key, |key| self.backing.get_meta(key))?;
        let partials = loaded.iter().map(|(_, partial)| partial.clone()).collect();
        self.store_since(epoch, |index| {
            for (key, partial) in loaded {
                index.backfill_partial(&key, partial);
            }
        });
        Ok(partials)
    }

    fn count(&self, type_key: &ResourceTypeKey) -> Result<u64, StorageError> {
        self.backing.count(type_key)
    }

    fn checksum(&self, key: &ObjectKey) -> Result<String, StorageError> {
        self.backing.checksum(key)
    }

    fn object_key_for(&self, object: &Object) -> Result<ObjectKey, StorageError> {
        self.backing.object_key_for(object)
    }

    fn raw_storage(&self) -> &dyn RawStorage {
        self.backing.raw_storage()
    }

    fn serializer(&self) -> &dyn Serializer {
        self.backing.serializer()
    }
}
