//! Ordered coalescing of raw filesystem changes.
//!
//! Editors emit several events per save. Consecutive changes to the same
//! path within the settle window merge into one; a change to a different
//! path flushes the pending one first, so changes are never reordered
//! across files.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::event::UpdateEventKind;

/// A classified change to one file path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct RawChange {
    pub path: PathBuf,
    pub kind: UpdateEventKind,
}

impl RawChange {
    pub(crate) fn new(path: impl Into<PathBuf>, kind: UpdateEventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

struct Pending {
    change: RawChange,
    deadline: Instant,
}

/// Holds at most one pending change.
///
/// Not thread-safe; owned by the watcher thread.
pub(crate) struct Coalescer {
    pending: Option<Pending>,
    settle: Duration,
}

impl Coalescer {
    pub(crate) fn new(settle: Duration) -> Self {
        Self {
            pending: None,
            settle,
        }
    }

    /// Record a change observed at `now`.
    ///
    /// Returns the previously pending change when it belongs to another
    /// path; the caller must process it before anything recorded later.
    pub(crate) fn record(
        &mut self,
        path: PathBuf,
        kind: UpdateEventKind,
        now: Instant,
    ) -> Option<RawChange> {
        let deadline = now + self.settle;

        match self.pending.take() {
            Some(pending) if pending.change.path == path => {
                self.pending = Self::coalesce(pending.change.kind, kind).map(|kind| Pending {
                    change: RawChange { path, kind },
                    deadline,
                });
                None
            }
            previous => {
                self.pending = Some(Pending {
                    change: RawChange { path, kind },
                    deadline,
                });
                previous.map(|pending| pending.change)
            }
        }
    }

    /// Coalesce two consecutive kinds for one path.
    ///
    /// Returns `None` when both cancel out (Added + Deleted).
    #[allow(clippy::match_same_arms)]
    fn coalesce(existing: UpdateEventKind, new: UpdateEventKind) -> Option<UpdateEventKind> {
        use UpdateEventKind::{Added, Deleted, Modified};

        match (existing, new) {
            (Added, Added) => Some(Added),
            (Added, Modified) => Some(Added),
            (Added, Deleted) => None,

            (Modified, Added) => Some(Added),
            (Modified, Modified) => Some(Modified),
            (Modified, Deleted) => Some(Deleted),

            // Replaced in place.
            (Deleted, Added) => Some(Modified),
            (Deleted, Modified) => Some(Deleted),
            (Deleted, Deleted) => Some(Deleted),
        }
    }

    /// Take the pending change if its settle window has passed.
    pub(crate) fn drain_ready(&mut self, now: Instant) -> Option<RawChange> {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| pending.deadline <= now)
        {
            self.pending.take().map(|pending| pending.change)
        } else {
            None
        }
    }

    /// Deadline of the pending change, if any.
    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::event::UpdateEventKind::{Added, Deleted, Modified};

    const SETTLE: Duration = Duration::from_millis(10);

    fn after(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    #[test]
    fn test_single_change_emitted_after_deadline() {
        let mut coalescer = Coalescer::new(SETTLE);
        let start = Instant::now();

        assert_eq!(coalescer.record("a.yaml".into(), Modified, start), None);

        assert_eq!(coalescer.drain_ready(after(start, 5)), None);
        assert_eq!(
            coalescer.drain_ready(after(start, 10)),
            Some(RawChange::new("a.yaml", Modified))
        );
        assert_eq!(coalescer.drain_ready(after(start, 20)), None);
        assert_eq!(coalescer.deadline(), None);
    }

    #[test]
    fn test_repeated_changes_extend_deadline() {
        let mut coalescer = Coalescer::new(SETTLE);
        let start = Instant::now();

        coalescer.record("a.yaml".into(), Modified, start);
        coalescer.record("a.yaml".into(), Modified, after(start, 8));

        assert_eq!(coalescer.drain_ready(after(start, 12)), None);
        assert_eq!(
            coalescer.drain_ready(after(start, 18)),
            Some(RawChange::new("a.yaml", Modified))
        );
    }

    #[test]
    fn test_other_path_flushes_pending_in_order() {
        let mut coalescer = Coalescer::new(SETTLE);
        let start = Instant::now();

        assert_eq!(coalescer.record("a.yaml".into(), Added, start), None);
        assert_eq!(
            coalescer.record("b.yaml".into(), Added, start),
            Some(RawChange::new("a.yaml", Added))
        );
        assert_eq!(
            coalescer.record("a.yaml".into(), Modified, start),
            Some(RawChange::new("b.yaml", Added))
        );
        assert_eq!(
            coalescer.drain_ready(after(start, 10)),
            Some(RawChange::new("a.yaml", Modified))
        );
    }

    #[test]
    fn test_added_then_deleted_discards_both() {
        let mut coalescer = Coalescer::new(SETTLE);
        let start = Instant::now();

        coalescer.record("a.yaml".into(), Added, start);
        coalescer.record("a.yaml".into(), Deleted, start);

        assert_eq!(coalescer.deadline(), None);
        assert_eq!(coalescer.drain_ready(after(start, 10)), None);
    }

    #[test]
    fn test_coalesce_all_combinations() {
        assert_eq!(Coalescer::coalesce(Added, Added), Some(Added));
        assert_eq!(Coalescer::coalesce(Added, Modified), Some(Added));
        assert_eq!(Coalescer::coalesce(Added, Deleted), None);

        assert_eq!(Coalescer::coalesce(Modified, Added), Some(Added));
        assert_eq!(Coalescer::coalesce(Modified, Modified), Some(Modified));
        assert_eq!(Coalescer::coalesce(Modified, Deleted), Some(Deleted));

        assert_eq!(Coalescer::coalesce(Deleted, Added), Some(Modified));
        assert_eq!(Coalescer::coalesce(Deleted, Modified), Some(Deleted));
        assert_eq!(Coalescer::coalesce(Deleted, Deleted), Some(Deleted));
    }
}
