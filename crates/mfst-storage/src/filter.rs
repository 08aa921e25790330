//! List filters and the [`Filterer`] that applies them.

use std::collections::BTreeMap;

use mfst_runtime::{Object, ResourceTypeKey};

use crate::error::{StorageError, StorageErrorKind};
use crate::storage::Storage;

/// Predicate over stored objects.
///
/// Returns [`StorageErrorKind::InvalidParams`] when the filter is missing a
/// required match field. Closures `Fn(&Object) -> bool` are filters too.
pub trait ListFilter: Send + Sync {
    fn filter(&self, object: &Object) -> Result<bool, StorageError>;
}

impl<F> ListFilter for F
where
    F: Fn(&Object) -> bool + Send + Sync,
{
    fn filter(&self, object: &Object) -> Result<bool, StorageError> {
        Ok(self(object))
    }
}

fn matches(value: &str, wanted: &str, prefix: bool) -> bool {
    if prefix {
        value.starts_with(wanted)
    } else {
        value == wanted
    }
}

/// Matches `metadata.name`, exactly or by prefix.
#[derive(Clone, Debug, Default)]
pub struct NameFilter {
    pub name: String,
    pub match_prefix: bool,
}

impl NameFilter {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            match_prefix: false,
        }
    }
}

impl ListFilter for NameFilter {
    fn filter(&self, object: &Object) -> Result<bool, StorageError> {
        if self.name.is_empty() {
            return Err(StorageError::invalid_params("NameFilter.name must not be empty"));
        }
        Ok(matches(&object.metadata.name, &self.name, self.match_prefix))
    }
}

/// Matches `metadata.uid`, exactly or by prefix.
#[derive(Clone, Debug, Default)]
pub struct UidFilter {
    pub uid: String,
    pub match_prefix: bool,
}

impl UidFilter {
    #[must_use]
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            match_prefix: false,
        }
    }
}

impl ListFilter for UidFilter {
    fn filter(&self, object: &Object) -> Result<bool, StorageError> {
        if self.uid.is_empty() {
            return Err(StorageError::invalid_params("UidFilter.uid must not be empty"));
        }
        Ok(matches(&object.metadata.uid, &self.uid, self.match_prefix))
    }
}

/// Matches the object's resource type.
#[derive(Clone, Debug, Default)]
pub struct TypeFilter {
    pub type_key: Option<ResourceTypeKey>,
}

impl ListFilter for TypeFilter {
    fn filter(&self, object: &Object) -> Result<bool, StorageError> {
        let type_key = self
            .type_key
            .as_ref()
            .ok_or_else(|| StorageError::invalid_params("TypeFilter.type_key must be set"))?;
        Ok(object.type_key() == *type_key)
    }
}

/// Matches objects carrying every given label with the given value.
#[derive(Clone, Debug, Default)]
pub struct LabelFilter {
    pub labels: BTreeMap<String, String>,
}

impl LabelFilter {
    #[must_use]
    pub fn new<K, V>(labels: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ListFilter for LabelFilter {
    fn filter(&self, object: &Object) -> Result<bool, StorageError> {
        if self.labels.is_empty() {
            return Err(StorageError::invalid_params("LabelFilter.labels must not be empty"));
        }
        Ok(self
            .labels
            .iter()
            .all(|(k, v)| object.metadata.labels.get(k) == Some(v)))
    }
}

/// Runs filters over the objects of one resource type.
pub struct Filterer<'a> {
    storage: &'a dyn Storage,
}

impl<'a> Filterer<'a> {
    pub fn new(storage: &'a dyn Storage) -> Self {
        Self { storage }
    }

    /// Every object of `type_key` matching `filter`.
    pub fn find_all(
        &self,
        type_key: &ResourceTypeKey,
        filter: &dyn ListFilter,
    ) -> Result<Vec<Object>, StorageError> {
        let mut found = Vec::new();
        for object in self.storage.list(type_key)? {
            if filter.filter(&object)? {
                found.push(object);
            }
        }
        tracing::trace!(%type_key, matches = found.len(), "Filtered objects");
        Ok(found)
    }

    /// The single object of `type_key` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::NotFound`] when nothing matches and
    /// [`StorageErrorKind::InvalidParams`] when more than one object does.
    pub fn find(
        &self,
        type_key: &ResourceTypeKey,
        filter: &dyn ListFilter,
    ) -> Result<Object, StorageError> {
        let mut found = self.find_all(type_key, filter)?;
        match found.len() {
            1 => Ok(found.remove(0)),
            0 => Err(StorageError::new(StorageErrorKind::NotFound)
                .with_message(format!("no {} matches the filter", type_key.kind()))),
            n => Err(StorageError::invalid_params(format!(
                "ambiguous filter: {n} {} objects match",
                type_key.kind()
            ))),
        }
    }
}
