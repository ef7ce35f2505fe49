//! Active Capture
//!
//! The capture slot records which subscriber is currently resolving a path.
//! Every capturing read consults it: if a subscriber is present, the read
//! appends it to the registry of the slot being read.
//!
//! # Implementation
//!
//! The slot is thread-local, so each thread of execution has its own
//! register and capture never leaks across threads. It holds at most one
//! subscriber. Entering installs a subscriber and returns a guard; dropping
//! the guard (including during unwinding) puts back whatever was there
//! before, which is normally nothing.
//!
//! The same module keeps the propagation depth counter used to stop runaway
//! chains of synchronous updates before they exhaust the stack.

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use super::Subscriber;
use crate::error::{Error, Result};

thread_local! {
    static ACTIVE: RefCell<Option<Arc<dyn Subscriber>>> = const { RefCell::new(None) };
    static PROPAGATION_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Guard that restores the previous capture slot when dropped.
pub struct ActiveCapture {
    previous: Option<Arc<dyn Subscriber>>,
}

impl ActiveCapture {
    /// Install `subscriber` as the capturing subscriber.
    ///
    /// Reads performed while the returned guard is alive register
    /// `subscriber` into every registry they touch.
    pub fn enter(subscriber: Arc<dyn Subscriber>) -> Self {
        let previous = ACTIVE.with(|slot| slot.borrow_mut().replace(subscriber));
        Self { previous }
    }

    /// Check if a subscriber is currently capturing.
    pub fn is_active() -> bool {
        ACTIVE.with(|slot| slot.borrow().is_some())
    }

    /// Get the capturing subscriber, if any.
    pub fn current() -> Option<Arc<dyn Subscriber>> {
        ACTIVE.with(|slot| slot.borrow().clone())
    }

    /// Run `f` with the slot empty, so none of its reads are captured.
    pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
        let previous = ACTIVE.with(|slot| slot.borrow_mut().take());
        let _restore = Self { previous };
        f()
    }
}

impl Drop for ActiveCapture {
    fn drop(&mut self) {
        let replaced = ACTIVE.with(|slot| std::mem::replace(&mut *slot.borrow_mut(), self.previous.take()));
        // Dropping a subscriber may run its own cleanup, keep that outside the borrow.
        drop(replaced);
    }
}

/// Guard counting one level of nested propagation.
pub struct PropagationGuard(());

impl PropagationGuard {
    /// Enter one more level of nested propagation, failing once `limit`
    /// levels are already active on this thread.
    pub fn enter(limit: usize) -> Result<Self> {
        PROPAGATION_DEPTH.with(|depth| {
            let next = depth.get() + 1;
            if next > limit {
                return Err(Error::PropagationDepthExceeded { limit });
            }
            depth.set(next);
            Ok(Self(()))
        })
    }

    /// Current nesting depth on this thread.
    pub fn depth() -> usize {
        PROPAGATION_DEPTH.with(Cell::get)
    }
}

impl Drop for PropagationGuard {
    fn drop(&mut self) {
        PROPAGATION_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Dep, SubscriberId};

    struct Noop(SubscriberId);

    impl Subscriber for Noop {
        fn id(&self) -> SubscriberId {
            self.0
        }

        fn update(&self) -> Result<()> {
            Ok(())
        }

        fn track(&self, _dep: &Dep) {}
    }

    fn noop() -> Arc<dyn Subscriber> {
        Arc::new(Noop(SubscriberId::new()))
    }

    #[test]
    fn capture_is_cleared_on_drop() {
        let subscriber = noop();
        let id = subscriber.id();

        assert!(!ActiveCapture::is_active());
        {
            let _capture = ActiveCapture::enter(subscriber);
            assert_eq!(ActiveCapture::current().map(|s| s.id()), Some(id));
        }
        assert!(!ActiveCapture::is_active());
    }

    #[test]
    fn nested_capture_restores_outer() {
        let outer = noop();
        let inner = noop();
        let outer_id = outer.id();

        let _outer = ActiveCapture::enter(outer);
        {
            let _inner = ActiveCapture::enter(inner);
            assert_ne!(ActiveCapture::current().map(|s| s.id()), Some(outer_id));
        }
        assert_eq!(ActiveCapture::current().map(|s| s.id()), Some(outer_id));
    }

    #[test]
    fn untracked_hides_capture() {
        let _capture = ActiveCapture::enter(noop());
        ActiveCapture::untracked(|| assert!(!ActiveCapture::is_active()));
        assert!(ActiveCapture::is_active());
    }

    #[test]
    fn capture_survives_panic() {
        let result = std::panic::catch_unwind(|| {
            let _capture = ActiveCapture::enter(noop());
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(!ActiveCapture::is_active());
    }

    #[test]
    fn propagation_depth_is_bounded() {
        let first = PropagationGuard::enter(2).unwrap();
        let second = PropagationGuard::enter(2).unwrap();
        assert_eq!(PropagationGuard::depth(), 2);
        assert!(matches!(
            PropagationGuard::enter(2),
            Err(Error::PropagationDepthExceeded { limit: 2 })
        ));
        drop(second);
        drop(first);
        assert_eq!(PropagationGuard::depth(), 0);
    }
}
