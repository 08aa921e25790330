//! File-backed storage for mfst objects.
//!
//! This crate persists each object as one file and exposes two layers:
//!
//! - [`RawStorage`]: bytes keyed by [`ObjectKey`](mfst_runtime::ObjectKey),
//!   implemented by [`FsRawStorage`] (`<root>/<kind>/<identifier><ext>`) and
//!   [`MockRawStorage`] for tests (behind the `mock` feature flag)
//! - [`Storage`]: typed-object CRUD, list, patch and checksum, implemented by
//!   [`GenericStorage`] on top of any raw store and serializer
//!
//! [`Filterer`] and [`TypedClient`] build on [`Storage`] for filtered lookups
//! and typed access.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use mfst_runtime::{ContentType, Scheme, SchemeSerializer};
//! use mfst_storage::{FsRawStorage, GenericStorage, Storage};
//!
//! let raw = Arc::new(FsRawStorage::new("manifests", ContentType::Yaml));
//! let storage = GenericStorage::new(raw, Arc::new(SchemeSerializer::new(Scheme::new())));
//! for car in storage.list(&car_type)? {
//!     println!("{}", car.metadata.name);
//! }
//! ```

mod error;
mod filter;
#[cfg(any(test, feature = "mock"))]
mod mock;
mod raw;
mod storage;
mod typed;

pub use error::{StorageError, StorageErrorKind};
pub use filter::{Filterer, LabelFilter, ListFilter, NameFilter, TypeFilter, UidFilter};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockRawStorage;
pub use raw::{FsRawStorage, RawStorage};
pub use storage::{GenericStorage, Storage};
pub use typed::TypedClient;
