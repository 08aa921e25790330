//! Storage options shared by every command.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use mfst_cache::Cache;
use mfst_config::{CliSettings, Config};
use mfst_runtime::{ContentType, ObjectKey, ResourceTypeKey, Scheme, SchemeSerializer};
use mfst_storage::{FsRawStorage, GenericStorage, Storage};

use crate::error::CliError;

/// Arguments selecting and configuring the storage.
#[derive(Args)]
pub(crate) struct StoreArgs {
    /// Path to configuration file (default: auto-discover mfst.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Storage root directory (overrides config).
    #[arg(short, long, env = "MFST_ROOT_DIR")]
    root_dir: Option<PathBuf>,

    /// Format of newly written files: json or yaml (overrides config).
    #[arg(long)]
    content_type: Option<ContentType>,

    /// Disable the in-memory cache.
    #[arg(long)]
    no_cache: bool,
}

/// Opened storage with the configuration it was built from.
pub(crate) struct Store {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    /// Set when reads go through the cache.
    pub cache: Option<Arc<Cache>>,
}

impl StoreArgs {
    /// Load configuration and open the storage it describes.
    pub(crate) fn open(self) -> Result<Store, CliError> {
        let cli_settings = CliSettings {
            root_dir: self.root_dir,
            content_type: self.content_type,
            cache_enabled: self.no_cache.then_some(false),
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        let settings = &config.storage_resolved;

        tracing::info!(
            root = %settings.root_dir.display(),
            content_type = %settings.content_type,
            cache = config.cache.enabled,
            "Opening storage"
        );

        let generic: Arc<dyn Storage> = Arc::new(
            GenericStorage::new(
                Arc::new(FsRawStorage::new(&settings.root_dir, settings.content_type)),
                Arc::new(SchemeSerializer::new(Scheme::new())),
            )
            .with_strategies(settings.strategies()?),
        );

        let (storage, cache) = if config.cache.enabled {
            let cache = Arc::new(Cache::new(generic));
            (Arc::clone(&cache) as Arc<dyn Storage>, Some(cache))
        } else {
            (generic, None)
        };

        Ok(Store {
            config,
            storage,
            cache,
        })
    }
}

/// Positional arguments naming a resource type.
#[derive(Args)]
pub(crate) struct TypeArgs {
    /// API version, `group/version` or `version` for the core group.
    api_version: String,

    /// Resource kind, e.g. `Car`.
    kind: String,
}

impl TypeArgs {
    pub(crate) fn type_key(&self) -> ResourceTypeKey {
        ResourceTypeKey::from_api_version(&self.api_version, self.kind.as_str())
    }
}

/// Positional arguments naming one object.
#[derive(Args)]
pub(crate) struct KeyArgs {
    #[command(flatten)]
    type_args: TypeArgs,

    /// Object identifier (file name without extension).
    id: String,
}

impl KeyArgs {
    pub(crate) fn key(&self) -> ObjectKey {
        ObjectKey::new(self.type_args.type_key(), self.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        key: KeyArgs,
    }

    #[test]
    fn test_key_args_parse_group_version() {
        let cli = TestCli::parse_from(["mfst", "sample-app.weave.works/v1alpha1", "Car", "foo"]);

        assert_eq!(
            cli.key.key(),
            ObjectKey::new(
                ResourceTypeKey::new("sample-app.weave.works", "v1alpha1", "Car"),
                "foo"
            )
        );
    }

    #[test]
    fn test_key_args_parse_core_group() {
        let cli = TestCli::parse_from(["mfst", "v1", "ConfigMap", "settings"]);

        assert_eq!(cli.key.key().type_key(), &ResourceTypeKey::new("", "v1", "ConfigMap"));
    }

    #[test]
    fn test_open_without_cache() {
        let temp = tempfile::tempdir().unwrap();
        let args = StoreArgs {
            config: None,
            root_dir: Some(temp.path().to_path_buf()),
            content_type: Some(ContentType::Json),
            no_cache: true,
        };

        let store = args.open().unwrap();

        assert!(store.cache.is_none());
        assert_eq!(store.config.storage_resolved.root_dir, temp.path());
        assert_eq!(
            store.storage.raw_storage().content_type_default(),
            ContentType::Json
        );
    }
}
