//! In-memory index of cached objects.

use std::collections::{BTreeMap, HashMap};

use mfst_runtime::{Identifier, Object, ObjectKey, PartialObject, ResourceTypeKey};

/// One cached object, fully decoded or metadata only.
///
/// Entries only move from partial to full, never back.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheEntry {
    Full(Object),
    Partial(PartialObject),
}

impl CacheEntry {
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Metadata view of the entry.
    #[must_use]
    pub fn to_partial(&self) -> PartialObject {
        match self {
            Self::Full(object) => object.to_partial(),
            Self::Partial(partial) => partial.clone(),
        }
    }
}

/// Type key -> identifier -> entry.
///
/// `epoch` advances on every removal and every write-through so callers that
/// read the backing store without holding the lock can tell whether the
/// index changed under them.
#[derive(Debug, Default)]
pub(crate) struct Index {
    types: HashMap<ResourceTypeKey, BTreeMap<Identifier, CacheEntry>>,
    epoch: u64,
}

impl Index {
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }

    pub(crate) fn advance_epoch(&mut self) {
        self.epoch += 1;
    }

    pub(crate) fn get(&self, key: &ObjectKey) -> Option<&CacheEntry> {
        self.types.get(key.type_key())?.get(key.identifier())
    }

    fn slot(&mut self, key: &ObjectKey) -> &mut BTreeMap<Identifier, CacheEntry> {
        self.types.entry(key.type_key().clone()).or_default()
    }

    /// Insert or replace with a full entry.
    pub(crate) fn store_full(&mut self, key: &ObjectKey, object: Object) {
        tracing::trace!(%key, "Index store (full)");
        self.slot(key)
            .insert(key.identifier().clone(), CacheEntry::Full(object));
    }

    /// Insert a partial entry unless a full one is already present.
    pub(crate) fn store_partial(&mut self, key: &ObjectKey, partial: PartialObject) {
        let entry = self.slot(key).entry(key.identifier().clone());
        match entry {
            std::collections::btree_map::Entry::Occupied(mut occupied) => {
                if !occupied.get().is_full() {
                    occupied.insert(CacheEntry::Partial(partial));
                }
            }
            std::collections::btree_map::Entry::Vacant(vacant) => {
                tracing::trace!(%key, "Index store (partial)");
                vacant.insert(CacheEntry::Partial(partial));
            }
        }
    }

    /// Insert a full entry unless a full one is already present.
    pub(crate) fn backfill_full(&mut self, key: &ObjectKey, object: Object) {
        let slot = self.slot(key);
        if !slot.get(key.identifier()).is_some_and(CacheEntry::is_full) {
            slot.insert(key.identifier().clone(), CacheEntry::Full(object));
        }
    }

    /// Insert a partial entry only if nothing is cached for the key.
    pub(crate) fn backfill_partial(&mut self, key: &ObjectKey, partial: PartialObject) {
        self.slot(key)
            .entry(key.identifier().clone())
            .or_insert(CacheEntry::Partial(partial));
    }

    /// Remove an entry, returning whether one was present.
    pub(crate) fn remove(&mut self, key: &ObjectKey) -> bool {
        self.epoch += 1;
        let removed = self
            .types
            .get_mut(key.type_key())
            .and_then(|entries| entries.remove(key.identifier()))
            .is_some();
        if removed {
            tracing::trace!(%key, "Index remove");
        }
        removed
    }

    pub(crate) fn count(&self, type_key: &ResourceTypeKey) -> u64 {
        self.types
            .get(type_key)
            .map_or(0, |entries| entries.len() as u64)
    }

    /// Entries of one type ordered by identifier.
    pub(crate) fn entries(&self, type_key: &ResourceTypeKey) -> Vec<(Identifier, CacheEntry)> {
        self.types
            .get(type_key)
            .map(|entries| {
                entries
                    .iter()
                    .map(|(id, entry)| (id.clone(), entry.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every full entry across all types.
    pub(crate) fn full_objects(&self) -> Vec<Object> {
        self.types
            .values()
            .flat_map(BTreeMap::values)
            .filter_map(|entry| match entry {
                CacheEntry::Full(object) => Some(object.clone()),
                CacheEntry::Partial(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: &str) -> ObjectKey {
        ObjectKey::new(ResourceTypeKey::new("sample", "v1", "Car"), id)
    }

    fn object(name: &str) -> Object {
        let mut object = Object::new(key(name).type_key());
        object.metadata.name = name.to_owned();
        object
    }

    #[test]
    fn test_partial_never_downgrades_full() {
        let mut index = Index::default();
        index.store_full(&key("a"), object("a"));

        index.store_partial(&key("a"), object("a").to_partial());
        index.backfill_partial(&key("a"), object("a").to_partial());

        assert!(index.get(&key("a")).unwrap().is_full());
    }

    #[test]
    fn test_backfill_full_promotes_partial() {
        let mut index = Index::default();
        index.store_partial(&key("a"), object("a").to_partial());

        index.backfill_full(&key("a"), object("a"));

        assert!(index.get(&key("a")).unwrap().is_full());
    }

    #[test]
    fn test_backfill_full_keeps_existing_full() {
        let mut index = Index::default();
        let mut cached = object("a");
        cached.metadata.generation = 2;
        index.store_full(&key("a"), cached.clone());

        index.backfill_full(&key("a"), object("a"));

        assert_eq!(index.get(&key("a")), Some(&CacheEntry::Full(cached)));
    }

    #[test]
    fn test_remove_advances_epoch() {
        let mut index = Index::default();
        index.store_full(&key("a"), object("a"));
        let before = index.epoch();

        assert!(index.remove(&key("a")));
        assert!(!index.remove(&key("a")));
        assert!(index.epoch() > before);
        assert_eq!(index.count(key("a").type_key()), 0);
    }

    #[test]
    fn test_entries_and_full_objects() {
        let mut index = Index::default();
        index.store_full(&key("b"), object("b"));
        index.store_partial(&key("a"), object("a").to_partial());

        let ids: Vec<_> = index
            .entries(key("a").type_key())
            .into_iter()
            .map(|(id, _)| id)
            .collect();

        assert_eq!(ids, vec![Identifier::new("a"), Identifier::new("b")]);
        assert_eq!(index.full_objects(), vec![object("b")]);
    }
}
