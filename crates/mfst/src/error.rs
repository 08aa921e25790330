//! CLI error types.

use mfst_config::ConfigError;
use mfst_runtime::SerializerError;
use mfst_storage::StorageError;
use mfst_watch::WatchError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Serializer(#[from] SerializerError),

    #[error("{0}")]
    Watch(#[from] WatchError),

    #[error("{0}")]
    Validation(String),
}
