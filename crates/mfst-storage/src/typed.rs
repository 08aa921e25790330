//! Typed access to one resource type.

use std::marker::PhantomData;
use std::sync::Arc;

use mfst_runtime::{Identifier, Object, ObjectKey, Resource};

use crate::error::{StorageError, StorageErrorKind};
use crate::filter::{Filterer, ListFilter};
use crate::storage::Storage;

/// Client for a single [`Resource`] type over any [`Storage`].
///
/// Converts between `R` and generic [`Object`]s so callers work with their
/// own structs.
pub struct TypedClient<R> {
    storage: Arc<dyn Storage>,
    _resource: PhantomData<fn() -> R>,
}

impl<R: Resource> TypedClient<R> {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            _resource: PhantomData,
        }
    }

    fn key(id: impl Into<Identifier>) -> ObjectKey {
        ObjectKey::new(R::type_key(), id)
    }

    fn to_object(resource: &R) -> Result<Object, StorageError> {
        Object::from_resource(resource)
            .map_err(|e| StorageError::new(StorageErrorKind::Encode).with_source(e))
    }

    fn from_object(object: Object) -> Result<R, StorageError> {
        object
            .into_resource()
            .map_err(|e| StorageError::new(StorageErrorKind::Decode).with_source(e))
    }

    /// Zero value of `R` with its type metadata set.
    pub fn new_resource(&self) -> Result<R, StorageError> {
        Self::from_object(self.storage.new_object(&R::type_key()))
    }

    pub fn get(&self, id: impl Into<Identifier>) -> Result<R, StorageError> {
        tracing::trace!(type_key = %R::type_key(), "TypedClient::get");
        Self::from_object(self.storage.get(&Self::key(id))?)
    }

    /// Store a new resource, writing the generated metadata back into it.
    pub fn create(&self, resource: &mut R) -> Result<(), StorageError> {
        let mut object = Self::to_object(resource)?;
        self.storage.create(&mut object)?;
        *resource = Self::from_object(object)?;
        Ok(())
    }

    pub fn set(&self, resource: &R) -> Result<(), StorageError> {
        self.storage.set(&R::type_key(), &Self::to_object(resource)?)
    }

    pub fn patch(&self, id: impl Into<Identifier>, overlay: &[u8]) -> Result<(), StorageError> {
        self.storage.patch(&Self::key(id), overlay)
    }

    pub fn delete(&self, id: impl Into<Identifier>) -> Result<(), StorageError> {
        self.storage.delete(&Self::key(id))
    }

    pub fn list(&self) -> Result<Vec<R>, StorageError> {
        self.storage
            .list(&R::type_key())?
            .into_iter()
            .map(Self::from_object)
            .collect()
    }

    pub fn find(&self, filter: &dyn ListFilter) -> Result<R, StorageError> {
        Self::from_object(Filterer::new(self.storage.as_ref()).find(&R::type_key(), filter)?)
    }

    pub fn find_all(&self, filter: &dyn ListFilter) -> Result<Vec<R>, StorageError> {
        Filterer::new(self.storage.as_ref())
            .find_all(&R::type_key(), filter)?
            .into_iter()
            .map(Self::from_object)
            .collect()
    }
}

impl<R> Clone for TypedClient<R> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            _resource: PhantomData,
        }
    }
}

#[cfg(test)]
mod tests {
    use mfst_runtime::ContentType;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::filter::NameFilter;
    use crate::raw::FsRawStorage;
    use crate::storage::GenericStorage;
    use crate::storage::tests::{Car, CarSpec, serializer};

    fn client(temp: &tempfile::TempDir) -> TypedClient<Car> {
        let storage = GenericStorage::new(
            Arc::new(FsRawStorage::new(temp.path(), ContentType::Yaml)),
            serializer(),
        );
        TypedClient::new(Arc::new(storage))
    }

    fn car(name: &str) -> Car {
        let mut car = Car {
            spec: CarSpec {
                engine: "v8".to_owned(),
                brand: "audi".to_owned(),
            },
            ..Car::default()
        };
        car.metadata.name = name.to_owned();
        car
    }

    #[test]
    fn test_new_resource_has_type_meta() {
        let temp = tempfile::tempdir().unwrap();

        let car = client(&temp).new_resource().unwrap();

        assert_eq!(car.type_meta.kind, "Car");
        assert_eq!(car.type_meta.api_version, "sample-app.weave.works/v1alpha1");
    }

    #[test]
    fn test_create_writes_back_metadata() {
        let temp = tempfile::tempdir().unwrap();
        let client = client(&temp);
        let mut foo = car("foo");

        client.create(&mut foo).unwrap();

        assert!(!foo.metadata.uid.is_empty());
        assert_eq!(client.get("foo").unwrap(), foo);
    }

    #[test]
    fn test_set_patch_delete() {
        let temp = tempfile::tempdir().unwrap();
        let client = client(&temp);
        let mut foo = car("foo");
        client.create(&mut foo).unwrap();

        foo.spec.engine = "electric".to_owned();
        client.set(&foo).unwrap();
        client.patch("foo", br#"{"status":{"speed":3.5}}"#).unwrap();

        let stored = client.get("foo").unwrap();
        assert_eq!(stored.spec.engine, "electric");
        assert!((stored.status.speed - 3.5).abs() < f64::EPSILON);

        client.delete("foo").unwrap();
        assert!(client.get("foo").unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_and_find() {
        let temp = tempfile::tempdir().unwrap();
        let client = client(&temp);
        client.create(&mut car("a")).unwrap();
        client.create(&mut car("b")).unwrap();

        assert_eq!(client.list().unwrap().len(), 2);
        assert_eq!(client.find(&NameFilter::new("b")).unwrap().metadata.name, "b");
        assert_eq!(
            client
                .find_all(&|c: &Object| c.metadata.name != "a")
                .unwrap()
                .len(),
            1
        );
    }
}
