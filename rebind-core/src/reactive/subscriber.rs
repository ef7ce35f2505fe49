//! Subscriber types for the reactive system.
//!
//! A Subscriber is anything that can sit in a [`Dep`] and be told that a slot
//! it read has changed. Watchers are the only subscribers the crate ships,
//! but registries only see the trait.

use std::sync::atomic::{AtomicU64, Ordering};

use super::Dep;
use crate::error::Result;

/// Unique identifier for a subscriber.
///
/// Registries key their entries by this ID so that a subscriber can leave
/// every registry it joined without holding strong references to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// A computation that depends on reactive slots.
pub trait Subscriber: Send + Sync {
    /// Get the subscriber's unique ID.
    fn id(&self) -> SubscriberId;

    /// Re-evaluate after one of the slots this subscriber read has changed.
    fn update(&self) -> Result<()>;

    /// Record that a capturing read added this subscriber to `dep`.
    fn track(&self, dep: &Dep);
}
