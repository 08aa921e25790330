//! `mfst watch` command implementation.

use std::sync::Arc;

use clap::Args;
use mfst_cache::Invalidate;
use mfst_watch::{UpdateEventKind, WatchOptions, Watcher};

use super::store::StoreArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    /// Subscriber queue capacity (overrides config).
    #[arg(long)]
    queue_capacity: Option<usize>,

    #[command(flatten)]
    store: StoreArgs,
}

impl WatchArgs {
    /// Print one line per object change until interrupted.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let store = self.store.open()?;

        let options = WatchOptions {
            queue_capacity: self
                .queue_capacity
                .unwrap_or(store.config.watch.queue_capacity),
            settle: store.config.watch.settle(),
        };
        if options.queue_capacity == 0 {
            return Err(CliError::Validation(
                "--queue-capacity must be greater than 0".to_owned(),
            ));
        }

        let watcher = Watcher::new(Arc::clone(&store.storage), options)?;
        if let Some(cache) = &store.cache {
            watcher.invalidate_on_update(Arc::clone(cache) as Arc<dyn Invalidate>);
        }
        let updates = watcher.subscribe_default();

        output.info(&format!("Watching {}", watcher.root().display()));
        output.info("Press Ctrl+C to stop");

        for event in updates.iter() {
            let line = format!(
                "{:<8} {} (uid: {})",
                event.kind, event.key, event.object.metadata.uid
            );
            match event.kind {
                UpdateEventKind::Added => output.success(&line),
                UpdateEventKind::Modified => output.info(&line),
                UpdateEventKind::Deleted => output.warning(&line),
            }
        }

        watcher.stop();
        Ok(())
    }
}
