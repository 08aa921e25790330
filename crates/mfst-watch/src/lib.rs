//! Change notification for file-backed mfst storage.
//!
//! [`Watcher`] observes the root directory of a storage and publishes one
//! [`UpdateEvent`] per object file change to a single bounded subscriber:
//!
//! - bursts of events for one file are coalesced within a settle window
//! - events for different files keep the order in which files changed
//! - a full subscriber queue holds the watcher back instead of losing events
//!
//! Registered caches are evicted through [`Invalidate`](mfst_cache::Invalidate)
//! before each event is delivered.
//!
//! # Example
//!
//! ```ignore
//! use mfst_watch::{WatchOptions, Watcher};
//!
//! let watcher = Watcher::new(storage, WatchOptions::default())?;
//! watcher.invalidate_on_update(cache);
//! for event in watcher.subscribe(64).iter() {
//!     println!("{} {}", event.kind, event.key);
//! }
//! ```

mod coalescer;
mod event;
mod watcher;

pub use event::{UpdateEvent, UpdateEventKind, UpdateReceiver};
pub use watcher::{WatchError, WatchOptions, Watcher};
