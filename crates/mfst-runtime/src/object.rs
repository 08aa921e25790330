//! Generic objects and typed resources.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::key::ResourceTypeKey;
use crate::meta::{ObjectMeta, PartialObject, TypeMeta};

/// A typed Rust representation of one resource type.
///
/// Implementors are plain serde structs that carry `apiVersion`, `kind` and
/// `metadata` alongside their own fields. Registering them in a
/// [`Scheme`](crate::Scheme) makes the serializer validate stored payloads
/// against the struct.
pub trait Resource: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    const GROUP: &'static str;
    const VERSION: &'static str;
    const KIND: &'static str;

    /// Resource type key of this type.
    fn type_key() -> ResourceTypeKey {
        ResourceTypeKey::new(Self::GROUP, Self::VERSION, Self::KIND)
    }
}

/// A generic stored object.
///
/// Holds type metadata, object metadata and every other top-level field
/// (conventionally `spec` and `status`) as JSON values, so fields unknown to
/// any registered [`Resource`] survive a read/write cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Object {
    pub type_meta: TypeMeta,
    pub metadata: ObjectMeta,
    pub fields: Map<String, Value>,
}

impl Object {
    /// Empty object of the given type.
    #[must_use]
    pub fn new(type_key: &ResourceTypeKey) -> Self {
        Self {
            type_meta: TypeMeta::new(type_key),
            ..Self::default()
        }
    }

    /// Convert a typed resource into a generic object.
    ///
    /// The type metadata is always set from `R`, even if the value left it empty.
    pub fn from_resource<R: Resource>(resource: &R) -> Result<Self, serde_json::Error> {
        let mut object: Self = serde_json::from_value(serde_json::to_value(resource)?)?;
        object.type_meta = TypeMeta::new(&R::type_key());
        Ok(object)
    }

    /// Convert into a typed resource.
    pub fn into_resource<R: Resource>(self) -> Result<R, serde_json::Error> {
        serde_json::from_value(serde_json::to_value(&self)?)
    }

    /// Resource type recorded in the type metadata.
    #[must_use]
    pub fn type_key(&self) -> ResourceTypeKey {
        self.type_meta.type_key()
    }

    /// Metadata-only projection.
    #[must_use]
    pub fn to_partial(&self) -> PartialObject {
        PartialObject {
            type_meta: self.type_meta.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Top-level field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Set a top-level field, returning the previous value.
    pub fn set_field(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.fields.insert(name.into(), value)
    }

    /// The `spec` field, if present.
    #[must_use]
    pub fn spec(&self) -> Option<&Value> {
        self.field("spec")
    }

    /// The `status` field, if present.
    #[must_use]
    pub fn status(&self) -> Option<&Value> {
        self.field("status")
    }
}

impl From<PartialObject> for Object {
    fn from(partial: PartialObject) -> Self {
        Self {
            type_meta: partial.type_meta,
            metadata: partial.metadata,
            fields: Map::new(),
        }
    }
}

impl Serialize for Object {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if !self.type_meta.api_version.is_empty() {
            map.serialize_entry("apiVersion", &self.type_meta.api_version)?;
        }
        if !self.type_meta.kind.is_empty() {
            map.serialize_entry("kind", &self.type_meta.kind)?;
        }
        map.serialize_entry("metadata", &self.metadata)?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Object {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut fields = Map::<String, Value>::deserialize(deserializer)?;

        let type_meta = TypeMeta {
            api_version: take_string(&mut fields, "apiVersion").map_err(de::Error::custom)?,
            kind: take_string(&mut fields, "kind").map_err(de::Error::custom)?,
        };
        let metadata = match fields.remove("metadata") {
            None | Some(Value::Null) => ObjectMeta::default(),
            Some(value) => serde_json::from_value(value).map_err(de::Error::custom)?,
        };

        Ok(Self {
            type_meta,
            metadata,
            fields,
        })
    }
}

fn take_string(fields: &mut Map<String, Value>, name: &str) -> Result<String, serde_json::Error> {
    match fields.remove(name) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(value) => serde_json::from_value(value),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Car {
        #[serde(flatten)]
        type_meta: TypeMeta,
        #[serde(default)]
        metadata: ObjectMeta,
        #[serde(default)]
        spec: CarSpec,
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct CarSpec {
        engine: String,
        brand: String,
    }

    impl Resource for Car {
        const GROUP: &'static str = "sample-app.weave.works";
        const VERSION: &'static str = "v1alpha1";
        const KIND: &'static str = "Car";
    }

    #[test]
    fn test_deserialize_splits_fields() {
        let object: Object = serde_json::from_value(json!({
            "apiVersion": "sample/v1",
            "kind": "Car",
            "metadata": {"name": "foo"},
            "spec": {"engine": "v8"},
            "extra": [1, 2]
        }))
        .unwrap();

        assert_eq!(object.type_meta.kind, "Car");
        assert_eq!(object.metadata.name, "foo");
        assert_eq!(object.spec(), Some(&json!({"engine": "v8"})));
        assert_eq!(object.field("extra"), Some(&json!([1, 2])));
        assert!(object.field("apiVersion").is_none());
    }

    #[test]
    fn test_serialize_orders_meta_first() {
        let mut object = Object::new(&ResourceTypeKey::new("sample", "v1", "Car"));
        object.metadata.name = "foo".to_owned();
        object.set_field("spec", json!({"engine": "v8"}));

        let json = serde_json::to_string(&object).unwrap();

        assert_eq!(
            json,
            r#"{"apiVersion":"sample/v1","kind":"Car","metadata":{"name":"foo"},"spec":{"engine":"v8"}}"#
        );
    }

    #[test]
    fn test_deserialize_rejects_non_string_kind() {
        let result: Result<Object, _> = serde_json::from_value(json!({"kind": 42}));

        assert!(result.is_err());
    }

    #[test]
    fn test_resource_conversion() {
        let car = Car {
            spec: CarSpec {
                engine: "foo".to_owned(),
                brand: "bar".to_owned(),
            },
            ..Car::default()
        };

        let object = Object::from_resource(&car).unwrap();
        assert_eq!(object.type_key(), Car::type_key());
        assert_eq!(object.spec(), Some(&json!({"engine": "foo", "brand": "bar"})));

        let back: Car = object.into_resource().unwrap();
        assert_eq!(back.spec, car.spec);
        assert_eq!(back.type_meta.kind, "Car");
    }

    #[test]
    fn test_to_partial_drops_fields() {
        let mut object = Object::new(&ResourceTypeKey::new("", "v1", "ConfigMap"));
        object.metadata.uid = "abc".to_owned();
        object.set_field("data", json!({"k": "v"}));

        let partial = object.to_partial();

        assert_eq!(partial.metadata.uid, "abc");
        assert_eq!(Object::from(partial).fields, Map::new());
    }
}
