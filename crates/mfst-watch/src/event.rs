//! Update event types delivered to watcher subscribers.
//!
//! Events are obtained through [`Watcher::subscribe`](crate::Watcher::subscribe).

use std::sync::mpsc;
use std::time::Duration;

use mfst_runtime::{ObjectKey, PartialObject};

/// Kind of object change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateEventKind {
    /// Object file appeared.
    Added,
    /// Object file content changed.
    Modified,
    /// Object file was removed.
    Deleted,
}

impl std::fmt::Display for UpdateEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
        };
        f.write_str(name)
    }
}

/// A change to one stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateEvent {
    pub kind: UpdateEventKind,
    /// Metadata of the object. For [`UpdateEventKind::Deleted`] this is the
    /// last metadata seen before removal.
    pub object: PartialObject,
    pub key: ObjectKey,
}

/// Receiving end of a subscription.
///
/// The queue is bounded: the watcher stops publishing while it is full.
/// Dropping the receiver ends the subscription.
pub struct UpdateReceiver {
    rx: mpsc::Receiver<UpdateEvent>,
}

impl UpdateReceiver {
    pub(crate) fn new(rx: mpsc::Receiver<UpdateEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event (blocking).
    ///
    /// Returns `None` once the watcher has stopped or replaced this
    /// subscription.
    #[must_use]
    pub fn recv(&self) -> Option<UpdateEvent> {
        self.rx.recv().ok()
    }

    /// Wait for the next event for at most `timeout`.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<UpdateEvent> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Try to receive an event without blocking.
    #[must_use]
    pub fn try_recv(&self) -> Option<UpdateEvent> {
        self.rx.try_recv().ok()
    }

    /// Blocking iterator over events. Ends when the subscription closes.
    pub fn iter(&self) -> impl Iterator<Item = UpdateEvent> + '_ {
        self.rx.iter()
    }
}
