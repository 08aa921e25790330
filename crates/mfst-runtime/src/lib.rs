//! Resource identity, object model and serializer capability for mfst.
//!
//! Every stored document is an [`Object`]: type metadata (`apiVersion`,
//! `kind`), object metadata (`name`, `uid`, labels, ...) and arbitrary
//! remaining fields. Objects are addressed by an [`ObjectKey`], which pairs a
//! [`ResourceTypeKey`] with an [`Identifier`] derived from the metadata by an
//! ordered list of [`IdentifierStrategy`] values.
//!
//! # Architecture
//!
//! - [`ResourceTypeKey`], [`Identifier`], [`ObjectKey`] identify objects
//! - [`TypeMeta`], [`ObjectMeta`], [`PartialObject`], [`Object`] model them
//! - [`Resource`] and [`Scheme`] connect typed Rust structs to generic objects
//! - [`Serializer`] and [`SchemeSerializer`] encode and decode JSON and YAML
//!
//! # Example
//!
//! ```ignore
//! use mfst_runtime::{ContentType, Scheme, SchemeSerializer, Serializer};
//!
//! let serializer = SchemeSerializer::new(Scheme::new().with::<Car>());
//! let object = serializer.decode(bytes, ContentType::Yaml, None)?;
//! println!("{}", object.metadata.name);
//! ```

mod identity;
mod key;
mod meta;
mod object;
mod scheme;
mod serializer;

pub use identity::{
    IdentifierStrategy, IdentityError, NameIdentifier, Strategies, UidIdentifier,
    default_strategies, derive_identifier, strategy_by_name,
};
pub use key::{Identifier, ObjectKey, ResourceTypeKey};
pub use meta::{ObjectMeta, PartialObject, TypeMeta};
pub use object::{Object, Resource};
pub use scheme::Scheme;
pub use serializer::{
    CONTENT_TYPES, ContentType, FormatError, SchemeSerializer, Serializer, SerializerError,
};
