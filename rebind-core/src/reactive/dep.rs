//! Subscriber Registry
//!
//! A `Dep` is attached to exactly one reactive slot: one per object key, one
//! per array. It keeps the subscribers that read the slot, in the order they
//! read it, and fans out synchronously when the slot changes.
//!
//! Entries are appended without deduplication, so a subscriber that reads the
//! same slot twice during one evaluation is updated twice per notification.
//! Registries only hold weak references: a subscriber that has been dropped
//! is skipped and pruned on the next notification.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::context::ActiveCapture;
use super::{Subscriber, SubscriberId};
use crate::error::{NotifyError, Result};

#[derive(Clone)]
struct Entry {
    id: SubscriberId,
    subscriber: Weak<dyn Subscriber>,
}

struct DepInner {
    subscribers: Mutex<SmallVec<[Entry; 4]>>,
}

/// Ordered registry of the subscribers of one slot.
///
/// Cloning a `Dep` yields another handle to the same registry.
#[derive(Clone)]
pub struct Dep {
    inner: Arc<DepInner>,
}

/// Non-owning handle to a [`Dep`], held by subscribers so they can leave.
#[derive(Clone)]
pub struct WeakDep(Weak<DepInner>);

impl WeakDep {
    pub fn upgrade(&self) -> Option<Dep> {
        self.0.upgrade().map(|inner| Dep { inner })
    }
}

impl Dep {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DepInner {
                subscribers: Mutex::new(SmallVec::new()),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakDep {
        WeakDep(Arc::downgrade(&self.inner))
    }

    /// Capturing read: register the active subscriber, if there is one.
    pub fn depend(&self) {
        if let Some(subscriber) = ActiveCapture::current() {
            self.add(&subscriber);
            subscriber.track(self);
        }
    }

    /// Append `subscriber` unconditionally.
    pub fn add(&self, subscriber: &Arc<dyn Subscriber>) {
        trace!(subscriber = %subscriber.id(), "subscriber added to registry");
        self.inner.subscribers.lock().push(Entry {
            id: subscriber.id(),
            subscriber: Arc::downgrade(subscriber),
        });
    }

    /// Remove every entry belonging to `id`.
    pub fn remove(&self, id: SubscriberId) {
        self.inner.subscribers.lock().retain(|entry| entry.id != id);
    }

    /// Number of entries, counting repeated registrations.
    pub fn len(&self) -> usize {
        self.inner.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Update every registered subscriber, in insertion order.
    ///
    /// The entries are snapshotted first, so subscribers that re-register
    /// while updating are not visited again by this call. A failing
    /// subscriber does not stop the fan-out; all failures are returned
    /// together once every subscriber has been updated.
    pub fn notify(&self) -> Result<()> {
        let entries = {
            let mut subscribers = self.inner.subscribers.lock();
            subscribers.retain(|entry| entry.subscriber.strong_count() > 0);
            subscribers.clone()
        };
        trace!(subscribers = entries.len(), "notifying registry");

        let attempted = entries.len();
        let mut failures = Vec::new();
        for entry in entries {
            let Some(subscriber) = entry.subscriber.upgrade() else {
                continue;
            };
            if let Err(err) = subscriber.update() {
                debug!(subscriber = %entry.id, error = %err, "subscriber update failed");
                failures.push((entry.id, err));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError { attempted, failures }.into())
        }
    }
}

impl Default for Dep {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dep").field("subscribers", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        id: SubscriberId,
        updates: AtomicUsize,
        fail: bool,
        log: Arc<Mutex<Vec<SubscriberId>>>,
    }

    impl Probe {
        fn new(fail: bool, log: &Arc<Mutex<Vec<SubscriberId>>>) -> Arc<Self> {
            Arc::new(Self {
                id: SubscriberId::new(),
                updates: AtomicUsize::new(0),
                fail,
                log: log.clone(),
            })
        }
    }

    impl Subscriber for Probe {
        fn id(&self) -> SubscriberId {
            self.id
        }

        fn update(&self) -> Result<()> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            self.log.lock().push(self.id);
            if self.fail {
                return Err(Error::ReadOnlyProperty("probe".into()));
            }
            Ok(())
        }

        fn track(&self, _dep: &Dep) {}
    }

    #[test]
    fn notify_runs_in_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first = Probe::new(false, &log);
        let second = Probe::new(false, &log);
        let dep = Dep::new();

        dep.add(&(first.clone() as Arc<dyn Subscriber>));
        dep.add(&(second.clone() as Arc<dyn Subscriber>));
        dep.notify().unwrap();

        assert_eq!(*log.lock(), vec![first.id, second.id]);
    }

    #[test]
    fn repeated_add_is_not_deduplicated() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let probe = Probe::new(false, &log);
        let subscriber: Arc<dyn Subscriber> = probe.clone();
        let dep = Dep::new();

        dep.add(&subscriber);
        dep.add(&subscriber);
        assert_eq!(dep.len(), 2);

        dep.notify().unwrap();
        assert_eq!(probe.updates.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failure_does_not_stop_fan_out() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing = Probe::new(true, &log);
        let healthy = Probe::new(false, &log);
        let dep = Dep::new();

        dep.add(&(failing.clone() as Arc<dyn Subscriber>));
        dep.add(&(healthy.clone() as Arc<dyn Subscriber>));

        let err = dep.notify().unwrap_err();
        assert_eq!(healthy.updates.load(Ordering::SeqCst), 1);
        match err {
            Error::Notify(notify) => {
                assert_eq!(notify.attempted, 2);
                assert_eq!(notify.failures.len(), 1);
                assert_eq!(notify.failures[0].0, failing.id);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let dep = Dep::new();
        {
            let probe: Arc<dyn Subscriber> = Probe::new(false, &log);
            dep.add(&probe);
        }
        assert_eq!(dep.len(), 1);
        dep.notify().unwrap();
        assert!(dep.is_empty());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn remove_drops_every_entry_of_a_subscriber() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let probe = Probe::new(false, &log);
        let subscriber: Arc<dyn Subscriber> = probe.clone();
        let dep = Dep::new();

        dep.add(&subscriber);
        dep.add(&subscriber);
        dep.remove(probe.id);
        assert!(dep.is_empty());
    }

    #[test]
    fn depend_without_capture_is_a_no_op() {
        let dep = Dep::new();
        dep.depend();
        assert!(dep.is_empty());
    }
}
