//! Storage error type shared by every layer.
//!
//! All storage operations return [`StorageError`], a semantic
//! [`StorageErrorKind`] plus optional context (object key, file path,
//! backend tag) and the underlying source error.

use std::path::PathBuf;

use mfst_patch::PatchError;
use mfst_runtime::{IdentityError, ObjectKey, SerializerError};

/// Semantic error categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// Key absent at the queried layer.
    NotFound,
    /// Create on an occupied key.
    AlreadyExists,
    /// Malformed key, identifier or filter.
    InvalidParams,
    /// Serializer failed to encode.
    Encode,
    /// Serializer failed to decode, or decoded the wrong type.
    Decode,
    /// Filesystem failure.
    Io,
    /// Overlay application produced an invalid result.
    Patch,
    /// An object without a derivable identifier was presented for storage.
    InvariantViolation,
}

/// Storage error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StorageError {
    /// Semantic error category.
    pub kind: StorageErrorKind,
    /// Object key context (if applicable).
    pub key: Option<ObjectKey>,
    /// Path context (if applicable).
    pub path: Option<PathBuf>,
    /// Backend identifier (e.g., "Fs", "Mock", "Cache").
    pub backend: Option<&'static str>,
    message: Option<String>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Create a new storage error.
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            key: None,
            path: None,
            backend: None,
            message: None,
            source: None,
        }
    }

    /// Attach object key context.
    #[must_use]
    pub fn with_key(mut self, key: &ObjectKey) -> Self {
        self.key = Some(key.clone());
        self
    }

    /// Attach path context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Attach a human-readable message, shown when there is no source.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }

    /// Whether this is a [`StorageErrorKind::NotFound`] error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }

    /// Create a not found error for a key.
    #[must_use]
    pub fn not_found(key: &ObjectKey) -> Self {
        Self::new(StorageErrorKind::NotFound).with_key(key)
    }

    /// Create an already exists error for a key.
    #[must_use]
    pub fn already_exists(key: &ObjectKey) -> Self {
        Self::new(StorageErrorKind::AlreadyExists).with_key(key)
    }

    /// Create an invalid parameters error.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::InvalidParams).with_message(message)
    }

    /// Create a storage error from an I/O error.
    ///
    /// `NotFound` and `AlreadyExists` I/O errors keep their meaning; everything
    /// else becomes [`StorageErrorKind::Io`].
    #[must_use]
    pub fn io(err: std::io::Error, path: Option<PathBuf>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            std::io::ErrorKind::AlreadyExists => StorageErrorKind::AlreadyExists,
            _ => StorageErrorKind::Io,
        };
        let mut error = Self::new(kind).with_source(err);
        if let Some(p) = path {
            error = error.with_path(p);
        }
        error
    }

    /// Create a storage error from a serializer failure.
    #[must_use]
    pub fn serializer(err: SerializerError) -> Self {
        let kind = if err.is_encode() {
            StorageErrorKind::Encode
        } else {
            StorageErrorKind::Decode
        };
        Self::new(kind).with_source(err)
    }
}

impl From<PatchError> for StorageError {
    fn from(err: PatchError) -> Self {
        Self::new(StorageErrorKind::Patch).with_source(err)
    }
}

impl From<IdentityError> for StorageError {
    fn from(err: IdentityError) -> Self {
        Self::new(StorageErrorKind::InvariantViolation).with_source(err)
    }
}

impl From<SerializerError> for StorageError {
    fn from(err: SerializerError) -> Self {
        Self::serializer(err)
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (key: Car/foo, path: /foo/bar)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StorageErrorKind::NotFound => "Not found",
            StorageErrorKind::AlreadyExists => "Already exists",
            StorageErrorKind::InvalidParams => "Invalid parameters",
            StorageErrorKind::Encode => "Encode error",
            StorageErrorKind::Decode => "Decode error",
            StorageErrorKind::Io => "I/O error",
            StorageErrorKind::Patch => "Patch error",
            StorageErrorKind::InvariantViolation => "Invariant violation",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        } else if let Some(message) = &self.message {
            write!(f, ": {message}")?;
        }

        match (&self.key, &self.path) {
            (Some(key), Some(path)) => write!(f, " (key: {key}, path: {})", path.display())?,
            (Some(key), None) => write!(f, " (key: {key})")?,
            (None, Some(path)) => write!(f, " (path: {})", path.display())?,
            (None, None) => {}
        }

        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}
