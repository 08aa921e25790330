//! Filesystem watcher publishing [`UpdateEvent`]s for a storage root.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use mfst_cache::Invalidate;
use mfst_runtime::{ContentType, Identifier, ObjectKey, PartialObject, Serializer};
use mfst_storage::Storage;
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecursiveMode, Watcher as _};

use crate::coalescer::{Coalescer, RawChange};
use crate::event::{UpdateEvent, UpdateEventKind, UpdateReceiver};

/// Upper bound on how long the watcher thread sleeps between shutdown checks.
const IDLE_POLL: Duration = Duration::from_millis(50);
/// Retry interval while the subscriber queue is full.
const FULL_POLL: Duration = Duration::from_millis(5);

/// Watcher tuning.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchOptions {
    /// Queue capacity used by [`Watcher::subscribe_default`].
    pub queue_capacity: usize,
    /// How long a path must stay quiet before its change is published.
    pub settle: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 4096,
            settle: Duration::from_millis(100),
        }
    }
}

/// Errors starting a [`Watcher`].
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("storage has no filesystem root to watch")]
    NoRoot,
    #[error("cannot prepare watch root {}: {source}", path.display())]
    Root {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start filesystem watcher: {0}")]
    Notify(#[from] notify::Error),
    #[error("failed to spawn watcher thread: {0}")]
    Spawn(#[source] std::io::Error),
}

enum Signal {
    Change(RawChange),
    Shutdown,
}

struct Subscription {
    id: u64,
    tx: SyncSender<UpdateEvent>,
}

#[derive(Default)]
struct Shared {
    subscription: Mutex<Option<Subscription>>,
    next_subscription: AtomicU64,
    invalidators: RwLock<Vec<Arc<dyn Invalidate>>>,
    published: AtomicU64,
    shutdown: AtomicBool,
}

/// Watches the root of a file-backed [`Storage`] and publishes one
/// [`UpdateEvent`] per settled file change, in the order files changed.
///
/// Dropping the watcher (or calling [`stop`](Self::stop)) joins its thread;
/// do this before tearing down the storage it watches.
pub struct Watcher {
    root: PathBuf,
    options: WatchOptions,
    shared: Arc<Shared>,
    signals: mpsc::Sender<Signal>,
    notify: Option<notify::RecommendedWatcher>,
    thread: Option<JoinHandle<()>>,
}

impl Watcher {
    /// Start watching the raw store root of `storage`.
    ///
    /// Existing files are scanned first so that later removals can be
    /// reported with their last known metadata.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::NoRoot`] if the raw store is not file-backed,
    /// and other variants if the root or the OS watcher cannot be set up.
    pub fn new(storage: Arc<dyn Storage>, options: WatchOptions) -> Result<Self, WatchError> {
        let root = prepare_root(storage.as_ref())?;
        let (signals, rx) = mpsc::channel();

        let sender = signals.clone();
        let mut notify = notify::recommended_watcher(
            move |res: Result<notify::Event, notify::Error>| match res {
                Ok(event) => {
                    for change in classify(&event) {
                        if sender.send(Signal::Change(change)).is_err() {
                            return;
                        }
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Filesystem watcher error"),
            },
        )?;
        notify.watch(&root, RecursiveMode::Recursive)?;

        let mut watcher = Self::start(storage, root, options, signals, rx)?;
        watcher.notify = Some(notify);
        Ok(watcher)
    }

    fn start(
        storage: Arc<dyn Storage>,
        root: PathBuf,
        options: WatchOptions,
        signals: mpsc::Sender<Signal>,
        rx: mpsc::Receiver<Signal>,
    ) -> Result<Self, WatchError> {
        let shared = Arc::new(Shared::default());
        let worker = Worker {
            known: scan(&root, storage.serializer()),
            storage,
            coalescer: Coalescer::new(options.settle),
            shared: Arc::clone(&shared),
            signals: rx,
        };
        let thread = thread::Builder::new()
            .name("mfst-watch".to_owned())
            .spawn(move || worker.run())
            .map_err(WatchError::Spawn)?;

        tracing::info!(root = %root.display(), "Watching for changes");

        Ok(Self {
            root,
            options,
            shared,
            signals,
            notify: None,
            thread: Some(thread),
        })
    }

    /// Directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subscribe with a queue of `capacity` events (at least one).
    ///
    /// Replaces any previous subscription. While the queue is full the
    /// watcher waits instead of dropping events.
    pub fn subscribe(&self, capacity: usize) -> UpdateReceiver {
        let (tx, rx) = mpsc::sync_channel(capacity.max(1));
        let id = self.shared.next_subscription.fetch_add(1, Ordering::SeqCst);
        let previous = self
            .shared
            .subscription
            .lock()
            .unwrap()
            .replace(Subscription { id, tx });
        if previous.is_some() {
            tracing::debug!("Replaced previous subscription");
        }
        UpdateReceiver::new(rx)
    }

    /// Subscribe with the configured default queue capacity.
    pub fn subscribe_default(&self) -> UpdateReceiver {
        self.subscribe(self.options.queue_capacity)
    }

    /// Evict the changed key from `target` before each event is published.
    pub fn invalidate_on_update(&self, target: Arc<dyn Invalidate>) {
        self.shared.invalidators.write().unwrap().push(target);
    }

    /// Number of events handed to subscribers so far.
    pub fn published(&self) -> u64 {
        self.shared.published.load(Ordering::SeqCst)
    }

    /// Stop watching and wait for the watcher thread to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        drop(self.notify.take());
        self.shared.shutdown.store(true, Ordering::SeqCst);
        let _ = self.signals.send(Signal::Shutdown);
        if thread.join().is_err() {
            tracing::warn!("Watcher thread panicked");
        }
        self.shared.subscription.lock().unwrap().take();
        tracing::debug!(root = %self.root.display(), "Watcher stopped");
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn prepare_root(storage: &dyn Storage) -> Result<PathBuf, WatchError> {
    let root = storage
        .raw_storage()
        .root()
        .ok_or(WatchError::NoRoot)?
        .to_path_buf();
    let canonical = fs::create_dir_all(&root).and_then(|()| root.canonicalize());
    canonical.map_err(|source| WatchError::Root { path: root, source })
}

/// Identifier encoded in an object file name.
fn identifier_for(path: &Path) -> Option<Identifier> {
    path.file_stem()
        .and_then(OsStr::to_str)
        .filter(|stem| !stem.is_empty() && !stem.starts_with('.'))
        .map(Identifier::new)
}

fn is_object_file(path: &Path) -> bool {
    ContentType::from_path(path).is_some() && identifier_for(path).is_some()
}

/// Map a notify event to changes of object files.
#[allow(clippy::match_same_arms)]
fn classify(event: &notify::Event) -> Vec<RawChange> {
    use UpdateEventKind::{Added, Deleted, Modified};

    event
        .paths
        .iter()
        .enumerate()
        .filter(|(_, path)| is_object_file(path))
        .filter_map(|(index, path)| {
            let kind = match event.kind {
                EventKind::Create(_) => Added,
                EventKind::Remove(_) => Deleted,
                EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Deleted,
                EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Added,
                EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
                    if index == 0 {
                        Deleted
                    } else {
                        Added
                    }
                }
                EventKind::Modify(ModifyKind::Name(_)) => {
                    if path.exists() {
                        Added
                    } else {
                        Deleted
                    }
                }
                EventKind::Modify(_) => Modified,
                EventKind::Access(_) | EventKind::Any | EventKind::Other => return None,
            };
            Some(RawChange::new(path.clone(), kind))
        })
        .collect()
}

/// Read and decode the metadata of one object file.
///
/// Failures are logged and skipped; a half-written file is expected while
/// an editor saves.
fn decode_file(serializer: &dyn Serializer, path: &Path) -> Option<PartialObject> {
    let content_type = ContentType::from_path(path)?;
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
            return None;
        }
    };
    match serializer.decode_meta(&bytes, content_type) {
        Ok(object) if !object.type_meta.is_empty() => Some(object),
        Ok(_) => {
            tracing::warn!(path = %path.display(), "Skipping file without apiVersion and kind");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Skipping undecodable file");
            None
        }
    }
}

/// Metadata of every object file under `root/<kind>/`.
fn scan(root: &Path, serializer: &dyn Serializer) -> HashMap<PathBuf, PartialObject> {
    let mut known = HashMap::new();
    let Ok(dirs) = fs::read_dir(root) else {
        return known;
    };

    for dir in dirs.flatten() {
        let dir = dir.path();
        if !dir.is_dir() {
            continue;
        }
        let Ok(files) = fs::read_dir(&dir) else {
            continue;
        };
        for file in files.flatten() {
            let path = file.path();
            if !path.is_file() || !is_object_file(&path) {
                continue;
            }
            if let Some(object) = decode_file(serializer, &path) {
                known.insert(path, object);
            }
        }
    }

    tracing::debug!(root = %root.display(), files = known.len(), "Scanned watch root");
    known
}

/// State owned by the watcher thread.
struct Worker {
    storage: Arc<dyn Storage>,
    coalescer: Coalescer,
    /// Last decoded metadata per file, used to describe removals.
    known: HashMap<PathBuf, PartialObject>,
    shared: Arc<Shared>,
    signals: mpsc::Receiver<Signal>,
}

impl Worker {
    fn run(mut self) {
        loop {
            let timeout = self.coalescer.deadline().map_or(IDLE_POLL, |deadline| {
                deadline.saturating_duration_since(Instant::now())
            });

            match self.signals.recv_timeout(timeout) {
                Ok(Signal::Change(change)) => {
                    if let Some(previous) =
                        self.coalescer.record(change.path, change.kind, Instant::now())
                    {
                        self.process(previous);
                    }
                }
                Ok(Signal::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }

            if let Some(ready) = self.coalescer.drain_ready(Instant::now()) {
                self.process(ready);
            }
            if self.shared.shutdown.load(Ordering::SeqCst) {
                break;
            }
        }
        tracing::debug!("Watcher thread exiting");
    }

    fn process(&mut self, change: RawChange) {
        let Some((kind, key, object)) = self.resolve(&change) else {
            return;
        };

        for target in self.shared.invalidators.read().unwrap().iter() {
            target.invalidate(&key);
        }

        self.publish(UpdateEvent {
            kind,
            object,
            key,
        });
    }

    /// Decode the object behind a change.
    ///
    /// A file renamed over a known one, which is how the raw store replaces
    /// content, is reported as modified.
    fn resolve(
        &mut self,
        change: &RawChange,
    ) -> Option<(UpdateEventKind, ObjectKey, PartialObject)> {
        let identifier = identifier_for(&change.path)?;

        let (kind, object) = if change.kind == UpdateEventKind::Deleted {
            let Some(object) = self.known.remove(&change.path) else {
                tracing::debug!(path = %change.path.display(), "Skipping removal of unknown file");
                return None;
            };
            (change.kind, object)
        } else {
            let object = decode_file(self.storage.serializer(), &change.path)?;
            let kind = match self.known.insert(change.path.clone(), object.clone()) {
                Some(_) if change.kind == UpdateEventKind::Added => UpdateEventKind::Modified,
                _ => change.kind,
            };
            (kind, object)
        };

        Some((kind, ObjectKey::new(object.type_key(), identifier), object))
    }

    /// Hand `event` to the subscriber, waiting while its queue is full.
    fn publish(&self, mut event: UpdateEvent) {
        let Some((id, tx)) = self
            .shared
            .subscription
            .lock()
            .unwrap()
            .as_ref()
            .map(|subscription| (subscription.id, subscription.tx.clone()))
        else {
            tracing::trace!(key = %event.key, "No subscriber, dropping event");
            return;
        };

        loop {
            match tx.try_send(event) {
                Ok(()) => {
                    self.shared.published.fetch_add(1, Ordering::SeqCst);
                    return;
                }
                Err(TrySendError::Full(pending)) => {
                    if self.shared.shutdown.load(Ordering::SeqCst) {
                        return;
                    }
                    event = pending;
                    thread::sleep(FULL_POLL);
                }
                Err(TrySendError::Disconnected(_)) => {
                    tracing::debug!("Subscriber disconnected");
                    let mut subscription = self.shared.subscription.lock().unwrap();
                    if subscription.as_ref().is_some_and(|current| current.id == id) {
                        subscription.take();
                    }
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use mfst_cache::Cache;
    use mfst_runtime::{Object, ResourceTypeKey, Scheme, SchemeSerializer};
    use mfst_storage::{FsRawStorage, GenericStorage, MockRawStorage};
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::event::UpdateEventKind::{Added, Deleted, Modified};

    const WAIT: Duration = Duration::from_secs(5);

    impl Watcher {
        /// Watcher without an OS backend; changes are fed through [`Self::inject`].
        fn detached(storage: Arc<dyn Storage>, options: WatchOptions) -> Self {
            let root = prepare_root(storage.as_ref()).unwrap();
            let (signals, rx) = mpsc::channel();
            Self::start(storage, root, options, signals, rx).unwrap()
        }

        fn inject(&self, path: PathBuf, kind: UpdateEventKind) {
            self.signals
                .send(Signal::Change(RawChange::new(path, kind)))
                .unwrap();
        }

        fn file(&self, name: &str) -> PathBuf {
            self.root.join("car").join(format!("{name}.yaml"))
        }
    }

    fn car_type() -> ResourceTypeKey {
        ResourceTypeKey::new("sample-app.weave.works", "v1alpha1", "Car")
    }

    fn car(name: &str, engine: &str) -> Object {
        let mut object = Object::new(&car_type());
        object.metadata.name = name.to_owned();
        object.set_field("spec", json!({ "engine": engine }));
        object
    }

    fn storage(temp: &tempfile::TempDir) -> Arc<dyn Storage> {
        Arc::new(GenericStorage::new(
            Arc::new(FsRawStorage::new(temp.path(), ContentType::Yaml)),
            Arc::new(SchemeSerializer::new(Scheme::new())),
        ))
    }

    fn options() -> WatchOptions {
        WatchOptions {
            settle: Duration::from_millis(10),
            ..WatchOptions::default()
        }
    }

    fn wait_until(condition: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < WAIT {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn summary(event: &UpdateEvent) -> (UpdateEventKind, String) {
        (event.kind, event.key.identifier().to_string())
    }

    #[test]
    fn test_watcher_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Watcher>();
    }

    #[test]
    fn test_requires_filesystem_root() {
        let storage: Arc<dyn Storage> = Arc::new(GenericStorage::new(
            Arc::new(MockRawStorage::new()),
            Arc::new(SchemeSerializer::new(Scheme::new())),
        ));

        let err = Watcher::new(storage, WatchOptions::default()).err().unwrap();

        assert!(matches!(err, WatchError::NoRoot));
    }

    #[test]
    fn test_events_follow_file_order() {
        let temp = tempfile::tempdir().unwrap();
        let storage = storage(&temp);
        let watcher = Watcher::detached(Arc::clone(&storage), options());
        let updates = watcher.subscribe(16);

        storage.create(&mut car("a", "v8")).unwrap();
        storage.create(&mut car("b", "v6")).unwrap();
        storage.set(&car_type(), &car("a", "electric")).unwrap();
        watcher.inject(watcher.file("a"), Added);
        watcher.inject(watcher.file("b"), Added);
        watcher.inject(watcher.file("a"), Modified);

        let received: Vec<_> = (0..3)
            .map(|_| summary(&updates.recv_timeout(WAIT).unwrap()))
            .collect();

        assert_eq!(
            received,
            vec![
                (Added, "a".to_owned()),
                (Added, "b".to_owned()),
                (Modified, "a".to_owned()),
            ]
        );
    }

    #[test]
    fn test_replaced_known_file_is_modified() {
        let temp = tempfile::tempdir().unwrap();
        let storage = storage(&temp);
        storage.create(&mut car("a", "v8")).unwrap();
        let watcher = Watcher::detached(Arc::clone(&storage), options());
        let updates = watcher.subscribe(4);

        storage.set(&car_type(), &car("a", "electric")).unwrap();
        watcher.inject(watcher.file("a"), Added);
        storage.create(&mut car("b", "v6")).unwrap();
        watcher.inject(watcher.file("b"), Added);

        let received: Vec<_> = (0..2)
            .map(|_| summary(&updates.recv_timeout(WAIT).unwrap()))
            .collect();
        assert_eq!(
            received,
            vec![(Modified, "a".to_owned()), (Added, "b".to_owned())]
        );
    }

    #[test]
    fn test_event_carries_decoded_metadata() {
        let temp = tempfile::tempdir().unwrap();
        let storage = storage(&temp);
        let watcher = Watcher::detached(Arc::clone(&storage), options());
        let updates = watcher.subscribe(4);
        let mut object = car("a", "v8");

        storage.create(&mut object).unwrap();
        watcher.inject(watcher.file("a"), Added);

        let event = updates.recv_timeout(WAIT).unwrap();
        assert_eq!(event.key, ObjectKey::new(car_type(), "a"));
        assert_eq!(event.object, object.to_partial());
    }

    #[test]
    fn test_full_queue_holds_back_next_event() {
        let temp = tempfile::tempdir().unwrap();
        let storage = storage(&temp);
        let watcher = Watcher::detached(Arc::clone(&storage), options());
        let updates = watcher.subscribe(1);

        storage.create(&mut car("a", "v8")).unwrap();
        storage.create(&mut car("b", "v6")).unwrap();
        watcher.inject(watcher.file("a"), Added);
        watcher.inject(watcher.file("b"), Added);

        assert!(wait_until(|| watcher.published() == 1));
        thread::sleep(Duration::from_millis(100));
        assert_eq!(watcher.published(), 1);

        assert_eq!(summary(&updates.recv().unwrap()), (Added, "a".to_owned()));
        assert!(wait_until(|| watcher.published() == 2));
        assert_eq!(summary(&updates.recv().unwrap()), (Added, "b".to_owned()));
    }

    #[test]
    fn test_deleted_reports_last_known_metadata() {
        let temp = tempfile::tempdir().unwrap();
        let storage = storage(&temp);
        let mut object = car("a", "v8");
        storage.create(&mut object).unwrap();
        let watcher = Watcher::detached(Arc::clone(&storage), options());
        let updates = watcher.subscribe(4);

        storage.delete(&ObjectKey::new(car_type(), "a")).unwrap();
        watcher.inject(watcher.file("a"), Deleted);

        let event = updates.recv_timeout(WAIT).unwrap();
        assert_eq!(event.kind, Deleted);
        assert_eq!(event.object.metadata.uid, object.metadata.uid);
    }

    #[test]
    fn test_unknown_and_undecodable_files_are_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let storage = storage(&temp);
        let watcher = Watcher::detached(Arc::clone(&storage), options());
        let updates = watcher.subscribe(4);

        fs::create_dir_all(watcher.root().join("car")).unwrap();
        fs::write(watcher.file("broken"), "kind: [unterminated").unwrap();
        storage.create(&mut car("b", "v6")).unwrap();
        watcher.inject(watcher.file("ghost"), Deleted);
        watcher.inject(watcher.file("broken"), Added);
        watcher.inject(watcher.file("b"), Added);

        assert_eq!(
            summary(&updates.recv_timeout(WAIT).unwrap()),
            (Added, "b".to_owned())
        );
        assert!(updates.recv_timeout(Duration::from_millis(50)).is_none());
    }

    #[test]
    fn test_invalidates_cache_before_publishing() {
        let temp = tempfile::tempdir().unwrap();
        let storage = storage(&temp);
        let cache = Arc::new(Cache::new(Arc::clone(&storage)));
        let key = ObjectKey::new(car_type(), "a");
        cache.create(&mut car("a", "v8")).unwrap();
        assert!(cache.entry(&key).is_some());

        let watcher = Watcher::detached(Arc::clone(&storage), options());
        watcher.invalidate_on_update(Arc::clone(&cache) as Arc<dyn Invalidate>);
        let updates = watcher.subscribe(4);

        storage.set(&car_type(), &car("a", "electric")).unwrap();
        watcher.inject(watcher.file("a"), Modified);

        assert_eq!(updates.recv_timeout(WAIT).unwrap().kind, Modified);
        assert!(cache.entry(&key).is_none());
        assert_eq!(
            cache.get(&key).unwrap().spec(),
            Some(&json!({ "engine": "electric" }))
        );
    }

    #[test]
    fn test_events_without_subscriber_are_dropped() {
        let temp = tempfile::tempdir().unwrap();
        let storage = storage(&temp);
        let watcher = Watcher::detached(Arc::clone(&storage), options());

        storage.create(&mut car("a", "v8")).unwrap();
        watcher.inject(watcher.file("a"), Added);
        thread::sleep(Duration::from_millis(100));

        let updates = watcher.subscribe(4);
        storage.create(&mut car("b", "v6")).unwrap();
        watcher.inject(watcher.file("b"), Added);

        assert_eq!(
            summary(&updates.recv_timeout(WAIT).unwrap()),
            (Added, "b".to_owned())
        );
        assert_eq!(watcher.published(), 1);
    }

    #[test]
    fn test_stop_closes_subscription() {
        let temp = tempfile::tempdir().unwrap();
        let watcher = Watcher::detached(storage(&temp), options());
        let updates = watcher.subscribe(4);

        watcher.stop();

        assert!(updates.recv().is_none());
    }

    #[test]
    fn test_classify_event_kinds() {
        let path = PathBuf::from("/root/car/a.yaml");
        let create = notify::Event::new(EventKind::Create(CreateKind::File)).add_path(path.clone());
        let modify = notify::Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
            .add_path(path.clone());
        let remove = notify::Event::new(EventKind::Remove(RemoveKind::File)).add_path(path.clone());
        let access = notify::Event::new(EventKind::Access(AccessKind::Read)).add_path(path.clone());

        assert_eq!(classify(&create), vec![RawChange::new(&path, Added)]);
        assert_eq!(classify(&modify), vec![RawChange::new(&path, Modified)]);
        assert_eq!(classify(&remove), vec![RawChange::new(&path, Deleted)]);
        assert!(classify(&access).is_empty());
    }

    #[test]
    fn test_classify_rename() {
        let from = PathBuf::from("/root/car/a.yaml");
        let to = PathBuf::from("/root/car/b.json");
        let both = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(from.clone())
            .add_path(to.clone());

        assert_eq!(
            classify(&both),
            vec![RawChange::new(&from, Deleted), RawChange::new(&to, Added)]
        );
    }

    #[test]
    fn test_classify_ignores_other_files() {
        let event = notify::Event::new(EventKind::Create(CreateKind::Any))
            .add_path(PathBuf::from("/root/car"))
            .add_path(PathBuf::from("/root/car/notes.txt"))
            .add_path(PathBuf::from("/root/car/.a.yaml"));

        assert!(classify(&event).is_empty());
    }

    // Real filesystem notifications are timing-sensitive; run manually.
    #[test]
    #[ignore]
    fn test_watch_detects_file_changes() {
        let temp = tempfile::tempdir().unwrap();
        let storage = storage(&temp);
        let watcher = Watcher::new(Arc::clone(&storage), options()).unwrap();
        let updates = watcher.subscribe(16);

        storage.create(&mut car("a", "v8")).unwrap();
        let added = updates.recv_timeout(WAIT).unwrap();
        storage.delete(&ObjectKey::new(car_type(), "a")).unwrap();
        let deleted = updates.recv_timeout(WAIT).unwrap();

        assert_eq!(summary(&added), (Added, "a".to_owned()));
        assert_eq!(summary(&deleted), (Deleted, "a".to_owned()));
    }
}
