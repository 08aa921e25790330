//! Registry of typed resources.

use std::collections::HashMap;

use crate::key::ResourceTypeKey;
use crate::meta::TypeMeta;
use crate::object::{Object, Resource};

type NewFn = fn() -> Result<Object, serde_json::Error>;
type ValidateFn = fn(&Object) -> Result<(), serde_json::Error>;

#[derive(Clone, Copy)]
struct Registration {
    new: NewFn,
    validate: ValidateFn,
}

fn new_resource<R: Resource>() -> Result<Object, serde_json::Error> {
    Object::from_resource(&R::default())
}

fn validate_resource<R: Resource>(object: &Object) -> Result<(), serde_json::Error> {
    serde_json::from_value::<R>(serde_json::to_value(object)?).map(drop)
}

/// Maps resource type keys to typed [`Resource`] implementations.
///
/// Used to produce zero-value objects for a type and to validate decoded
/// objects against their typed representation. Types that were never
/// registered are handled generically: no validation, empty zero value.
#[derive(Clone, Default)]
pub struct Scheme {
    types: HashMap<ResourceTypeKey, Registration>,
}

impl Scheme {
    /// Create an empty scheme.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typed resource.
    pub fn register<R: Resource>(&mut self) -> &mut Self {
        self.types.insert(
            R::type_key(),
            Registration {
                new: new_resource::<R>,
                validate: validate_resource::<R>,
            },
        );
        self
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with<R: Resource>(mut self) -> Self {
        self.register::<R>();
        self
    }

    /// Whether a typed implementation is registered for `type_key`.
    #[must_use]
    pub fn is_registered(&self, type_key: &ResourceTypeKey) -> bool {
        self.types.contains_key(type_key)
    }

    /// Registered type keys in no particular order.
    pub fn type_keys(&self) -> impl Iterator<Item = &ResourceTypeKey> {
        self.types.keys()
    }

    /// Zero-value object for `type_key`.
    ///
    /// Never fails: unregistered types, and registered types whose default
    /// value cannot be converted, yield an object carrying only type metadata.
    #[must_use]
    pub fn new_object(&self, type_key: &ResourceTypeKey) -> Object {
        let mut object = self
            .types
            .get(type_key)
            .and_then(|reg| (reg.new)().ok())
            .unwrap_or_default();
        object.type_meta = TypeMeta::new(type_key);
        object
    }

    /// Validate `object` against the typed resource registered for its type.
    pub fn validate(&self, object: &Object) -> Result<(), serde_json::Error> {
        match self.types.get(&object.type_key()) {
            Some(reg) => (reg.validate)(object),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.types.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::meta::ObjectMeta;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Car {
        #[serde(flatten)]
        type_meta: TypeMeta,
        #[serde(default)]
        metadata: ObjectMeta,
        #[serde(default)]
        spec: CarSpec,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct CarSpec {
        engine: String,
    }

    impl Resource for Car {
        const GROUP: &'static str = "sample";
        const VERSION: &'static str = "v1";
        const KIND: &'static str = "Car";
    }

    #[test]
    fn test_new_object_registered() {
        let scheme = Scheme::new().with::<Car>();

        let object = scheme.new_object(&Car::type_key());

        assert_eq!(object.type_key(), Car::type_key());
        assert_eq!(object.spec(), Some(&json!({"engine": ""})));
    }

    #[test]
    fn test_new_object_unregistered() {
        let scheme = Scheme::new();
        let key = ResourceTypeKey::new("other", "v1", "Boat");

        let object = scheme.new_object(&key);

        assert_eq!(object.type_key(), key);
        assert!(object.fields.is_empty());
    }

    #[test]
    fn test_validate_rejects_wrong_shape() {
        let scheme = Scheme::new().with::<Car>();
        let mut object = Object::new(&Car::type_key());
        object.set_field("spec", json!({"engine": 42}));

        assert!(scheme.validate(&object).is_err());

        object.set_field("spec", json!({"engine": "v8"}));
        assert!(scheme.validate(&object).is_ok());
    }

    #[test]
    fn test_validate_unregistered_passes() {
        let scheme = Scheme::new();
        let mut object = Object::new(&ResourceTypeKey::new("x", "v1", "Anything"));
        object.set_field("spec", json!(42));

        assert!(scheme.validate(&object).is_ok());
        assert!(!scheme.is_registered(&object.type_key()));
    }
}
