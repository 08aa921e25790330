//! Raw byte storage keyed by [`ObjectKey`].
//!
//! Provides the [`RawStorage`] trait and [`FsRawStorage`], which lays objects
//! out as `<root>/<kind lowercased>/<identifier><ext>`.

use std::collections::BTreeSet;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use mfst_runtime::{CONTENT_TYPES, ContentType, Identifier, ObjectKey, ResourceTypeKey};
use sha2::{Digest, Sha256};

use crate::error::StorageError;

/// Backend identifier for error messages.
const BACKEND: &str = "Fs";

/// Number of lock stripes keys are hashed onto.
const LOCK_STRIPES: u64 = 64;

/// Byte-level storage of encoded objects.
///
/// Implementations know nothing about the encoding beyond the content type
/// of each stored entry.
pub trait RawStorage: Send + Sync {
    /// Read the stored bytes for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::NotFound`] if nothing is stored under `key`.
    fn read(&self, key: &ObjectKey) -> Result<Vec<u8>, StorageError>;

    /// Store `content` under `key`, replacing any previous content.
    fn write(&self, key: &ObjectKey, content: &[u8]) -> Result<(), StorageError>;

    /// Store `content` under a key that must not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::AlreadyExists`] if `key` is occupied.
    fn create(&self, key: &ObjectKey, content: &[u8]) -> Result<(), StorageError>;

    /// Replace the content of a key that must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::NotFound`] if `key` is absent.
    fn update(&self, key: &ObjectKey, content: &[u8]) -> Result<(), StorageError>;

    /// Remove the entry for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::NotFound`] if `key` is absent.
    fn delete(&self, key: &ObjectKey) -> Result<(), StorageError>;

    /// Whether an entry exists for `key`. Errors count as absent.
    fn exists(&self, key: &ObjectKey) -> bool;

    /// Identifiers stored for a resource type, sorted.
    fn list(&self, type_key: &ResourceTypeKey) -> Result<BTreeSet<Identifier>, StorageError>;

    /// Number of identifiers stored for a resource type.
    fn count(&self, type_key: &ResourceTypeKey) -> Result<u64, StorageError> {
        Ok(self.list(type_key)?.len() as u64)
    }

    /// Hex-encoded SHA-256 of the stored bytes.
    fn checksum(&self, key: &ObjectKey) -> Result<String, StorageError> {
        let content = self.read(key)?;
        let mut hasher = Sha256::new();
        hasher.update(&content);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Content type of the stored entry for `key`.
    fn content_type(&self, key: &ObjectKey) -> Result<ContentType, StorageError>;

    /// Content type used for new entries.
    fn content_type_default(&self) -> ContentType;

    /// Root directory, for backends living on the filesystem.
    fn root(&self) -> Option<&Path> {
        None
    }
}

/// Reject identifiers that are empty or would escape their type directory.
pub(crate) fn validate_identifier(identifier: &Identifier) -> Result<(), StorageError> {
    let id = identifier.as_str();
    let mut components = Path::new(id).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if id.is_empty() || !single_normal || id.contains(['/', '\\']) || id.starts_with('.') {
        return Err(StorageError::invalid_params(format!("invalid identifier {id:?}")));
    }
    Ok(())
}

/// Filesystem raw storage.
///
/// Writes of one key are serialized through a lock stripe picked by hashing
/// the key. Content is written to a hidden sibling file and renamed into
/// place, so readers never see a partial file. Entries are read in any content type listed in
/// [`CONTENT_TYPES`]; new entries are written with the configured one.
///
/// # Example
///
/// ```ignore
/// use mfst_storage::{FsRawStorage, RawStorage};
///
/// let raw = FsRawStorage::new("manifests", ContentType::Yaml);
/// let ids = raw.list(&car_type)?;
/// ```
#[derive(Debug)]
pub struct FsRawStorage {
    root: PathBuf,
    content_type: ContentType,
    locks: Vec<Mutex<()>>,
}

impl FsRawStorage {
    /// Create a raw store rooted at `root`, writing new entries as `content_type`.
    pub fn new(root: impl Into<PathBuf>, content_type: ContentType) -> Self {
        Self {
            root: root.into(),
            content_type,
            locks: (0..LOCK_STRIPES).map(|_| Mutex::new(())).collect(),
        }
    }

    /// Directory holding every object of a resource type.
    #[must_use]
    pub fn type_dir(&self, type_key: &ResourceTypeKey) -> PathBuf {
        self.root.join(type_key.kind().to_lowercase())
    }

    /// Lock the stripe guarding `key`.
    fn lock_key(&self, key: &ObjectKey) -> MutexGuard<'_, ()> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let stripe = usize::try_from(hasher.finish() % LOCK_STRIPES).unwrap_or_default();
        self.locks[stripe].lock().unwrap()
    }

    /// Extensions in lookup order: the configured one first.
    fn extensions(&self) -> impl Iterator<Item = &'static str> {
        let preferred = self.content_type.extension();
        std::iter::once(preferred).chain(
            CONTENT_TYPES
                .iter()
                .map(|(ext, _)| *ext)
                .filter(move |ext| *ext != preferred),
        )
    }

    /// Path of the existing file for `key`, if any.
    fn existing_path(&self, key: &ObjectKey) -> Result<Option<PathBuf>, StorageError> {
        validate_identifier(key.identifier())?;
        let dir = self.type_dir(key.type_key());
        Ok(self
            .extensions()
            .map(|ext| dir.join(format!("{}{ext}", key.identifier())))
            .find(|path| path.is_file()))
    }

    /// Path a new entry for `key` is written to.
    fn new_path(&self, key: &ObjectKey) -> PathBuf {
        self.type_dir(key.type_key()).join(format!(
            "{}{}",
            key.identifier(),
            self.content_type.extension()
        ))
    }

    fn write_file(path: &Path, key: &ObjectKey, content: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Self::io_error(e, parent, key))?;
        }
        let staging = Self::staging_path(path);
        fs::write(&staging, content).map_err(|e| Self::io_error(e, &staging, key))?;
        if let Err(e) = fs::rename(&staging, path) {
            let _ = fs::remove_file(&staging);
            return Err(Self::io_error(e, path, key));
        }
        tracing::debug!(%key, path = %path.display(), bytes = content.len(), "Wrote object");
        Ok(())
    }

    /// Hidden sibling of `path` used while writing.
    fn staging_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{name}.tmp"))
    }

    fn io_error(err: std::io::Error, path: &Path, key: &ObjectKey) -> StorageError {
        StorageError::io(err, Some(path.to_path_buf()))
            .with_key(key)
            .with_backend(BACKEND)
    }

    fn not_found(key: &ObjectKey) -> StorageError {
        StorageError::not_found(key).with_backend(BACKEND)
    }
}

impl RawStorage for FsRawStorage {
    fn read(&self, key: &ObjectKey) -> Result<Vec<u8>, StorageError> {
        let path = self
            .existing_path(key)?
            .ok_or_else(|| Self::not_found(key))?;
        fs::read(&path).map_err(|e| Self::io_error(e, &path, key))
    }

    fn write(&self, key: &ObjectKey, content: &[u8]) -> Result<(), StorageError> {
        let _guard = self.lock_key(key);

        let path = match self.existing_path(key)? {
            Some(path) => path,
            None => self.new_path(key),
        };
        Self::write_file(&path, key, content)
    }

    fn create(&self, key: &ObjectKey, content: &[u8]) -> Result<(), StorageError> {
        let _guard = self.lock_key(key);

        if self.existing_path(key)?.is_some() {
            return Err(StorageError::already_exists(key).with_backend(BACKEND));
        }
        Self::write_file(&self.new_path(key), key, content)
    }

    fn update(&self, key: &ObjectKey, content: &[u8]) -> Result<(), StorageError> {
        let _guard = self.lock_key(key);

        let path = self
            .existing_path(key)?
            .ok_or_else(|| Self::not_found(key))?;
        Self::write_file(&path, key, content)
    }

    fn delete(&self, key: &ObjectKey) -> Result<(), StorageError> {
        let _guard = self.lock_key(key);

        let path = self
            .existing_path(key)?
            .ok_or_else(|| Self::not_found(key))?;
        fs::remove_file(&path).map_err(|e| Self::io_error(e, &path, key))?;
        tracing::debug!(%key, path = %path.display(), "Deleted object");
        Ok(())
    }

    fn exists(&self, key: &ObjectKey) -> bool {
        matches!(self.existing_path(key), Ok(Some(_)))
    }

    fn list(&self, type_key: &ResourceTypeKey) -> Result<BTreeSet<Identifier>, StorageError> {
        let dir = self.type_dir(type_key);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(e) => {
                return Err(StorageError::io(e, Some(dir)).with_backend(BACKEND));
            }
        };

        let mut identifiers = BTreeSet::new();
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            if !entry.file_type().is_ok_and(|t| t.is_file())
                || ContentType::from_path(&path).is_none()
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && !stem.starts_with('.')
            {
                identifiers.insert(Identifier::new(stem));
            }
        }
        Ok(identifiers)
    }

    fn content_type(&self, key: &ObjectKey) -> Result<ContentType, StorageError> {
        let path = self
            .existing_path(key)?
            .ok_or_else(|| Self::not_found(key))?;
        ContentType::from_path(&path).ok_or_else(|| {
            StorageError::invalid_params("unrecognized extension")
                .with_path(path)
                .with_backend(BACKEND)
        })
    }

    fn content_type_default(&self) -> ContentType {
        self.content_type
    }

    fn root(&self) -> Option<&Path> {
        Some(&self.root)
    }
}
