use std::error::Error as StdError;
use std::sync::Arc;

use mfst_runtime::{ContentType, Object, Resource, ResourceTypeKey, Serializer, SerializerError};
use serde_json::Value;

use crate::merge::{merge_apply, merge_diff};

/// Patch engine failure.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("invalid overlay: {0}")]
    Overlay(#[source] serde_json::Error),
    #[error("overlay must be an object")]
    OverlayNotObject,
    #[error("failed to decode base: {0}")]
    Base(#[source] SerializerError),
    #[error("patched object is invalid: {0}")]
    Invalid(#[source] SerializerError),
    #[error("failed to encode: {0}")]
    Encode(#[source] SerializerError),
    #[error("failed to convert object: {0}")]
    Convert(#[source] serde_json::Error),
    #[error("mutation failed: {0}")]
    Mutate(#[source] Box<dyn StdError + Send + Sync>),
}

/// Computes and applies JSON merge overlays.
///
/// Overlays are always JSON. Bases may be in any content type the serializer
/// understands; the patched result is re-encoded in the base's content type.
#[derive(Clone)]
pub struct Patcher {
    serializer: Arc<dyn Serializer>,
}

impl Patcher {
    pub fn new(serializer: Arc<dyn Serializer>) -> Self {
        Self { serializer }
    }

    /// Overlay turning `original` into `mutated`.
    ///
    /// Equal states produce the empty overlay `{}`.
    pub fn diff(&self, original: &Object, mutated: &Object) -> Result<Vec<u8>, PatchError> {
        let old = serde_json::to_value(original).map_err(PatchError::Convert)?;
        let new = serde_json::to_value(mutated).map_err(PatchError::Convert)?;

        let overlay = merge_diff(&old, &new).unwrap_or_else(|| Value::Object(Default::default()));
        serde_json::to_vec(&overlay).map_err(PatchError::Convert)
    }

    /// Apply `overlay` onto the encoded `base` and return the new encoding.
    ///
    /// The result must decode cleanly as `type_key`; anything else is reported
    /// as [`PatchError::Invalid`] rather than written.
    pub fn apply(
        &self,
        base: &[u8],
        base_content_type: ContentType,
        overlay: &[u8],
        type_key: &ResourceTypeKey,
    ) -> Result<Vec<u8>, PatchError> {
        let overlay: Value = serde_json::from_slice(overlay).map_err(PatchError::Overlay)?;
        if !overlay.is_object() {
            return Err(PatchError::OverlayNotObject);
        }

        let mut merged = self
            .serializer
            .decode_value(base, base_content_type)
            .map_err(PatchError::Base)?;
        merge_apply(&mut merged, &overlay);

        let object: Object = serde_json::from_value(merged).map_err(|e| {
            PatchError::Invalid(SerializerError::Decode {
                content_type: base_content_type,
                source: e.into(),
            })
        })?;
        self.serializer
            .validate(&object, Some(type_key))
            .map_err(PatchError::Invalid)?;

        tracing::debug!(%type_key, name = %object.metadata.name, "Applied overlay");

        self.serializer
            .encode(&object, base_content_type)
            .map_err(PatchError::Encode)
    }

    /// Diff `object` against a mutated copy of itself.
    pub fn create<F, E>(&self, object: &Object, mutate: F) -> Result<Vec<u8>, PatchError>
    where
        F: FnOnce(&mut Object) -> Result<(), E>,
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        let mut copy = object.clone();
        mutate(&mut copy).map_err(|e| PatchError::Mutate(e.into()))?;
        self.diff(object, &copy)
    }

    /// Typed form of [`create`](Self::create).
    pub fn create_resource<R, F>(&self, resource: &R, mutate: F) -> Result<Vec<u8>, PatchError>
    where
        R: Resource + Clone,
        F: FnOnce(&mut R),
    {
        let original = Object::from_resource(resource).map_err(PatchError::Convert)?;
        let mut copy = resource.clone();
        mutate(&mut copy);
        let mutated = Object::from_resource(&copy).map_err(PatchError::Convert)?;
        self.diff(&original, &mutated)
    }
}

impl std::fmt::Debug for Patcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Patcher").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use mfst_runtime::{ObjectMeta, Scheme, SchemeSerializer, TypeMeta};
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;

    const BASE: &[u8] = br#"
{
    "kind": "Car",
    "apiVersion": "sample-app.weave.works/v1alpha1",
    "metadata": {
        "name": "foo",
        "uid": "0123456789101112"
    },
    "spec": {
        "engine": "foo",
        "brand": "bar"
    }
}"#;
    const OVERLAY: &[u8] = br#"{"status":{"speed":24.7}}"#;

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    struct Car {
        #[serde(flatten)]
        type_meta: TypeMeta,
        #[serde(default)]
        metadata: ObjectMeta,
        #[serde(default)]
        spec: CarSpec,
        #[serde(default)]
        status: CarStatus,
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
    struct CarSpec {
        engine: String,
        brand: String,
    }

    #[derive(Clone, Debug, Default, Serialize, Deserialize)]
    struct CarStatus {
        speed: f64,
    }

    impl Resource for Car {
        const GROUP: &'static str = "sample-app.weave.works";
        const VERSION: &'static str = "v1alpha1";
        const KIND: &'static str = "Car";
    }

    fn patcher() -> Patcher {
        Patcher::new(Arc::new(SchemeSerializer::new(Scheme::new().with::<Car>())))
    }

    fn car() -> Car {
        Car {
            spec: CarSpec {
                engine: "foo".to_owned(),
                brand: "bar".to_owned(),
            },
            ..Car::default()
        }
    }

    #[test]
    fn test_create_resource_patch() {
        let overlay = patcher()
            .create_resource(&car(), |c| c.status.speed = 24.7)
            .unwrap();

        assert_eq!(overlay, OVERLAY);
    }

    #[test]
    fn test_create_patch_on_object() {
        let object = Object::from_resource(&car()).unwrap();

        let overlay = patcher()
            .create(&object, |o| {
                o.set_field("status", json!({"speed": 24.7}));
                Ok::<_, PatchError>(())
            })
            .unwrap();

        assert_eq!(overlay, OVERLAY);
    }

    #[test]
    fn test_create_propagates_mutation_error() {
        let object = Object::from_resource(&car()).unwrap();

        let result = patcher().create(&object, |_| Err("boom"));

        assert!(matches!(result, Err(PatchError::Mutate(_))));
    }

    #[test]
    fn test_diff_equal_is_empty() {
        let object = Object::from_resource(&car()).unwrap();

        assert_eq!(patcher().diff(&object, &object).unwrap(), b"{}");
    }

    #[test]
    fn test_apply_patch() {
        let result = patcher()
            .apply(BASE, ContentType::Json, OVERLAY, &Car::type_key())
            .unwrap();

        let decoded: Car = serde_json::from_slice(&result).unwrap();
        assert!((decoded.status.speed - 24.7).abs() < f64::EPSILON);
        assert_eq!(decoded.spec, car().spec);
        assert_eq!(decoded.metadata.uid, "0123456789101112");
    }

    #[test]
    fn test_apply_keeps_yaml_base_format() {
        let serializer = SchemeSerializer::new(Scheme::new().with::<Car>());
        let base_object = serializer.decode(BASE, ContentType::Json, None).unwrap();
        let yaml = serializer.encode(&base_object, ContentType::Yaml).unwrap();

        let result = patcher()
            .apply(&yaml, ContentType::Yaml, OVERLAY, &Car::type_key())
            .unwrap();

        let text = String::from_utf8(result).unwrap();
        assert!(text.contains("speed: 24.7"));
        assert!(text.contains("engine: foo"));
    }

    #[test]
    fn test_apply_rejects_undecodable_result() {
        let result = patcher().apply(
            BASE,
            ContentType::Json,
            br#"{"status":{"speed":"fast"}}"#,
            &Car::type_key(),
        );

        assert!(matches!(result, Err(PatchError::Invalid(_))));
    }

    #[test]
    fn test_apply_rejects_type_mismatch() {
        let boat = ResourceTypeKey::new("sample-app.weave.works", "v1alpha1", "Boat");

        let result = patcher().apply(BASE, ContentType::Json, OVERLAY, &boat);

        assert!(matches!(
            result,
            Err(PatchError::Invalid(SerializerError::TypeMismatch { .. }))
        ));
    }

    #[test]
    fn test_apply_rejects_malformed_overlay() {
        let p = patcher();

        assert!(matches!(
            p.apply(BASE, ContentType::Json, b"{oops", &Car::type_key()),
            Err(PatchError::Overlay(_))
        ));
        assert!(matches!(
            p.apply(BASE, ContentType::Json, b"[1]", &Car::type_key()),
            Err(PatchError::OverlayNotObject)
        ));
    }
}
