//! Object commands: `get`, `list`, `apply`, `patch`, `delete`.

use std::path::PathBuf;

use clap::Args;
use mfst_runtime::ContentType;

use super::store::{KeyArgs, StoreArgs, TypeArgs};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the get command.
#[derive(Args)]
pub(crate) struct GetArgs {
    #[command(flatten)]
    key: KeyArgs,

    /// Output format (default: configured content type).
    #[arg(short, long)]
    output: Option<ContentType>,

    #[command(flatten)]
    store: StoreArgs,
}

impl GetArgs {
    /// Print one object.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let store = self.store.open()?;
        let format = self
            .output
            .unwrap_or(store.config.storage_resolved.content_type);

        let object = store.storage.get(&self.key.key())?;
        let encoded = store.storage.serializer().encode(&object, format)?;
        output.document(&String::from_utf8_lossy(&encoded));
        Ok(())
    }
}

/// Arguments for the list command.
#[derive(Args)]
pub(crate) struct ListArgs {
    #[command(flatten)]
    type_args: TypeArgs,

    #[command(flatten)]
    store: StoreArgs,
}

impl ListArgs {
    /// Print name, uid and generation of every object of a type.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let store = self.store.open()?;
        let type_key = self.type_args.type_key();

        let objects = store.storage.list_meta(&type_key)?;
        if objects.is_empty() {
            output.warning(&format!("No {} objects found", type_key.kind()));
            return Ok(());
        }

        output.highlight(&format!("{:<32} {:<36} GENERATION", "NAME", "UID"));
        for object in objects {
            output.line(&format!(
                "{:<32} {:<36} {}",
                object.metadata.name, object.metadata.uid, object.metadata.generation
            ));
        }
        Ok(())
    }
}

/// Arguments for the apply command.
#[derive(Args)]
pub(crate) struct ApplyArgs {
    /// Manifest file to store (`.json`, `.yaml` or `.yml`).
    file: PathBuf,

    #[command(flatten)]
    store: StoreArgs,
}

impl ApplyArgs {
    /// Create the object, or replace it if it already exists.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let content_type = ContentType::from_path(&self.file).ok_or_else(|| {
            CliError::Validation(format!(
                "{}: unsupported file extension",
                self.file.display()
            ))
        })?;
        let content = std::fs::read(&self.file)?;
        let store = self.store.open()?;

        let mut object = store
            .storage
            .serializer()
            .decode(&content, content_type, None)?;
        let key = store.storage.object_key_for(&object)?;

        if store.storage.raw_storage().exists(&key) {
            store.storage.update(&object)?;
            output.success(&format!("{key} configured"));
        } else {
            store.storage.create(&mut object)?;
            output.success(&format!("{key} created"));
        }
        Ok(())
    }
}

/// Arguments for the patch command.
#[derive(Args)]
pub(crate) struct PatchArgs {
    #[command(flatten)]
    key: KeyArgs,

    /// JSON merge overlay, e.g. `{"status":{"speed":24.7}}`.
    overlay: String,

    #[command(flatten)]
    store: StoreArgs,
}

impl PatchArgs {
    /// Merge an overlay into a stored object.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let store = self.store.open()?;
        let key = self.key.key();

        store.storage.patch(&key, self.overlay.as_bytes())?;
        output.success(&format!("{key} patched"));
        Ok(())
    }
}

/// Arguments for the delete command.
#[derive(Args)]
pub(crate) struct DeleteArgs {
    #[command(flatten)]
    key: KeyArgs,

    #[command(flatten)]
    store: StoreArgs,
}

impl DeleteArgs {
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let store = self.store.open()?;
        let key = self.key.key();

        store.storage.delete(&key)?;
        output.success(&format!("{key} deleted"));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: PatchArgs,
    }

    #[test]
    fn test_patch_args_take_overlay_after_key() {
        let cli = TestCli::parse_from([
            "mfst",
            "sample-app.weave.works/v1alpha1",
            "Car",
            "foo",
            r#"{"status":{"speed":24.7}}"#,
            "--no-cache",
        ]);

        assert_eq!(cli.args.overlay, r#"{"status":{"speed":24.7}}"#);
        assert_eq!(cli.args.key.key().identifier().as_str(), "foo");
    }
}
