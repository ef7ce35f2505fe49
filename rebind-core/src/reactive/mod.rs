//! Dependency Tracking
//!
//! This module implements the observer side of the engine: who is reading,
//! who must be told about a write, and the watchers that tie the two
//! together.
//!
//! # Concepts
//!
//! ## Capture
//!
//! While a watcher resolves its path it sits in the thread-local capture
//! slot ([`ActiveCapture`]). Every slot read while the slot is occupied
//! appends the watcher to that slot's registry. Nothing has to be wired by
//! hand: reading is subscribing.
//!
//! ## Registries
//!
//! A [`Dep`] belongs to one object key or one array. Writing the key, or
//! mutating the array, notifies every registered subscriber synchronously,
//! in registration order, isolating failures per subscriber.
//!
//! ## Watchers
//!
//! A [`Watcher`] re-resolves its path on every notification, re-subscribing
//! as it goes, and runs its callback when the result differs from the value
//! it saw at construction.
//!
//! Computed properties need no machinery of their own: their getters run
//! while the outer watcher is still capturing, so the slots they read
//! register that watcher directly.

mod context;
mod dep;
mod subscriber;
mod watcher;

pub use context::{ActiveCapture, PropagationGuard};
pub use dep::{Dep, WeakDep};
pub use subscriber::{Subscriber, SubscriberId};
pub use watcher::Watcher;
