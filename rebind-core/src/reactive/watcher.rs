//! Watcher Implementation
//!
//! A Watcher binds a property path and a callback to a store and calls the
//! callback whenever the value at that path changes.
//!
//! # How Watchers Work
//!
//! 1. When created, the watcher resolves its path with itself installed in
//!    the capture slot, which registers it on every slot along the path. The
//!    resolved value is snapshotted.
//!
//! 2. When any of those slots notifies, the watcher leaves the registries it
//!    joined, resolves the path again (joining whatever it reads this time),
//!    and compares the result with the snapshot.
//!
//! 3. If they differ, the callback runs. The callback gets no arguments; it
//!    reads whatever it needs back through the store.
//!
//! The snapshot is taken once, at construction, and never refreshed: every
//! later update compares against the construction-time value.
//!
//! # Lifetime
//!
//! Registries hold watchers weakly. A watcher stays subscribed while at least
//! one handle is alive and until [`Watcher::dispose`] is called; dropping the
//! last handle removes it from every registry it joined.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use serde_json::Value as Json;
use tracing::{debug, trace};

use super::context::{ActiveCapture, PropagationGuard};
use super::dep::WeakDep;
use super::{Dep, Subscriber, SubscriberId};
use crate::error::{CallbackResult, Error, Result};
use crate::path::{self, PropertyPath};
use crate::store::Store;

type Callback = Box<dyn Fn() -> CallbackResult + Send + Sync>;

struct WatcherCore {
    id: SubscriberId,
    this: Weak<WatcherCore>,
    store: Store,
    path: PropertyPath,
    on_change: Callback,

    /// Value seen at construction.
    snapshot: OnceLock<Json>,

    /// Registries joined during the latest evaluation.
    subscriptions: Mutex<Vec<WeakDep>>,

    disposed: AtomicBool,
    evaluations: AtomicUsize,
    changes: AtomicUsize,
}

/// A live binding between a property path and a change callback.
///
/// # Example
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use rebind_core::Store;
///
/// let store = Store::new(serde_json::json!({ "msg": "hi" })).unwrap();
/// let calls = Arc::new(AtomicUsize::new(0));
/// let counter = calls.clone();
/// let _watcher = store
///     .watch("msg", move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     })
///     .unwrap();
///
/// store.write("msg", "bye").unwrap();
/// assert_eq!(calls.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone)]
pub struct Watcher {
    core: Arc<WatcherCore>,
}

impl Watcher {
    /// Create a watcher on `path` and subscribe it.
    ///
    /// Fails if the path is malformed or cannot be resolved right now.
    pub fn new<F>(store: &Store, path: &str, on_change: F) -> Result<Self>
    where
        F: Fn() -> CallbackResult + Send + Sync + 'static,
    {
        let path = store.path(path)?;
        let core = Arc::new_cyclic(|this| WatcherCore {
            id: SubscriberId::new(),
            this: this.clone(),
            store: store.clone(),
            path,
            on_change: Box::new(on_change),
            snapshot: OnceLock::new(),
            subscriptions: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
            evaluations: AtomicUsize::new(0),
            changes: AtomicUsize::new(0),
        });

        let snapshot = core.evaluate()?;
        // Only set here, on a core nothing else can reach yet.
        let _ = core.snapshot.set(snapshot);
        debug!(watcher = %core.id, path = %core.path, "watcher created");

        Ok(Self { core })
    }

    pub fn id(&self) -> SubscriberId {
        self.core.id
    }

    pub fn path(&self) -> &PropertyPath {
        &self.core.path
    }

    /// The value captured when the watcher was created.
    pub fn snapshot(&self) -> &Json {
        self.core.snapshot.get().unwrap_or(&Json::Null)
    }

    /// Re-evaluate now, as if one of the watched slots had notified.
    pub fn update(&self) -> Result<()> {
        self.core.update()
    }

    /// Leave every registry. The callback never runs again.
    pub fn dispose(&self) {
        self.core.disposed.store(true, Ordering::SeqCst);
        self.core.release_subscriptions();
        debug!(watcher = %self.core.id, path = %self.core.path, "watcher disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.core.disposed.load(Ordering::SeqCst)
    }

    /// How many times the path has been resolved, construction included.
    pub fn evaluation_count(&self) -> usize {
        self.core.evaluations.load(Ordering::SeqCst)
    }

    /// How many times the callback has been invoked.
    pub fn change_count(&self) -> usize {
        self.core.changes.load(Ordering::SeqCst)
    }

    /// Registrations made by the latest evaluation.
    pub fn subscription_count(&self) -> usize {
        self.core.subscriptions.lock().len()
    }
}

impl WatcherCore {
    fn evaluate(self: &Arc<Self>) -> Result<Json> {
        self.release_subscriptions();
        self.evaluations.fetch_add(1, Ordering::SeqCst);

        let value = {
            let _capture = ActiveCapture::enter(self.clone());
            path::resolve(&self.store, &self.path)?
        };
        ActiveCapture::untracked(|| value.to_json())
    }

    fn release_subscriptions(&self) {
        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        for dep in subscriptions.iter().filter_map(WeakDep::upgrade) {
            dep.remove(self.id);
        }
    }
}

impl Subscriber for WatcherCore {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn update(&self) -> Result<()> {
        if self.disposed.load(Ordering::SeqCst) {
            return Ok(());
        }
        let Some(this) = self.this.upgrade() else {
            return Ok(());
        };
        let _depth = PropagationGuard::enter(self.store.config().max_propagation_depth)?;

        let current = this.evaluate()?;
        if self.snapshot.get() == Some(&current) {
            trace!(watcher = %self.id, path = %self.path, "watched value unchanged");
            return Ok(());
        }

        trace!(watcher = %self.id, path = %self.path, "watched value changed");
        self.changes.fetch_add(1, Ordering::SeqCst);
        (self.on_change)().map_err(Error::Callback)
    }

    fn track(&self, dep: &Dep) {
        self.subscriptions.lock().push(dep.downgrade());
    }
}

impl Drop for WatcherCore {
    fn drop(&mut self) {
        self.release_subscriptions();
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.core.id)
            .field("path", &self.core.path.as_str())
            .field("evaluations", &self.evaluation_count())
            .field("changes", &self.change_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> CallbackResult + Send + Sync + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let inner = count.clone();
        (count, move || {
            inner.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn watcher_snapshots_on_creation() {
        let store = Store::new(json!({ "n": 1 })).unwrap();
        let (count, callback) = counter();
        let watcher = Watcher::new(&store, "n", callback).unwrap();

        assert_eq!(watcher.snapshot(), &json!(1));
        assert_eq!(watcher.evaluation_count(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn update_releases_previous_subscriptions() {
        let store = Store::new(json!({ "a": { "b": 1 } })).unwrap();
        let (_, callback) = counter();
        let watcher = Watcher::new(&store, "a.b", callback).unwrap();
        assert_eq!(watcher.subscription_count(), 2);

        watcher.update().unwrap();
        watcher.update().unwrap();
        assert_eq!(watcher.subscription_count(), 2);
        assert_eq!(store.data().subscriber_count("a"), 1);
    }

    #[test]
    fn dispose_leaves_registries() {
        let store = Store::new(json!({ "n": 1 })).unwrap();
        let (count, callback) = counter();
        let watcher = Watcher::new(&store, "n", callback).unwrap();

        watcher.dispose();
        assert!(watcher.is_disposed());
        assert_eq!(store.data().subscriber_count("n"), 0);

        store.write("n", 2).unwrap();
        watcher.update().unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_the_handle_unsubscribes() {
        let store = Store::new(json!({ "n": 1 })).unwrap();
        let (count, callback) = counter();
        drop(Watcher::new(&store, "n", callback).unwrap());

        assert_eq!(store.data().subscriber_count("n"), 0);
        store.write("n", 2).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn clones_share_state() {
        let store = Store::new(json!({ "n": 1 })).unwrap();
        let (_, callback) = counter();
        let first = Watcher::new(&store, "n", callback).unwrap();
        let second = first.clone();

        store.write("n", 2).unwrap();
        assert_eq!(first.id(), second.id());
        assert_eq!(second.change_count(), 1);

        first.dispose();
        assert!(second.is_disposed());
    }

    #[test]
    fn unresolvable_path_fails_construction() {
        let store = Store::new(json!({ "n": 1 })).unwrap();
        let (_, callback) = counter();
        assert!(matches!(
            Watcher::new(&store, "n.x.y", callback),
            Err(Error::PathResolution { .. })
        ));
        assert_eq!(store.data().subscriber_count("n"), 0);
    }
}
