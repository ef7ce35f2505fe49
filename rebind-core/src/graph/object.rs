//! Object nodes and their property slots.
//!
//! Each key of an instrumented object owns one [`Dep`], created when the
//! object is instrumented and never replaced while the key exists. Reading a
//! key is a capturing read on that registry; writing a different value
//! instruments the new value, stores it and notifies the registry.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::trace;

use super::{observer, NodeId, Value};
use crate::error::{Error, Result};
use crate::reactive::Dep;
use crate::store::ComputedFn;

/// One key of an object.
pub(crate) enum PropertySlot {
    /// A stored value. `dep` is present once the owning object is reactive,
    /// except for keys added after instrumentation.
    Data { value: Value, dep: Option<Dep> },
    /// A get-only accessor evaluated against the store on every read.
    Computed(ComputedFn),
}

/// What a capturing read of a key found.
pub(crate) enum SlotRead {
    Value(Value),
    Computed(ComputedFn),
}

struct ObjectInner {
    reactive: bool,
    slots: IndexMap<String, PropertySlot>,
}

/// Shared handle to an object node.
///
/// Cloning the handle never copies the node; all clones see the same keys.
#[derive(Clone)]
pub struct ObjectNode {
    id: NodeId,
    inner: Arc<RwLock<ObjectInner>>,
}

impl ObjectNode {
    /// Create an empty, plain object.
    pub fn new() -> Self {
        Self {
            id: NodeId::next(),
            inner: Arc::new(RwLock::new(ObjectInner {
                reactive: false,
                slots: IndexMap::new(),
            })),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_reactive(&self) -> bool {
        self.inner.read().reactive
    }

    pub fn len(&self) -> usize {
        self.inner.read().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.inner.read().slots.contains_key(key)
    }

    /// All keys in insertion order, computed properties included.
    pub fn keys(&self) -> Vec<String> {
        self.inner.read().slots.keys().cloned().collect()
    }

    /// Read a stored value, registering the capturing subscriber if any.
    ///
    /// Computed properties are only evaluated through a [`Store`](crate::Store)
    /// and read as `None` here.
    pub fn get(&self, key: &str) -> Option<Value> {
        match self.read_slot(key)? {
            SlotRead::Value(value) => Some(value),
            SlotRead::Computed(_) => None,
        }
    }

    /// Read a stored value without registering anything.
    pub fn get_untracked(&self, key: &str) -> Option<Value> {
        match self.inner.read().slots.get(key)? {
            PropertySlot::Data { value, .. } => Some(value.clone()),
            PropertySlot::Computed(_) => None,
        }
    }

    pub(crate) fn read_slot(&self, key: &str) -> Option<SlotRead> {
        let (value, dep) = {
            let inner = self.inner.read();
            match inner.slots.get(key)? {
                PropertySlot::Computed(getter) => return Some(SlotRead::Computed(getter.clone())),
                PropertySlot::Data { value, dep } => (value.clone(), dep.clone()),
            }
        };
        if let Some(dep) = dep {
            dep.depend();
        }
        value.track();
        Some(SlotRead::Value(value))
    }

    /// Write `value` under `key`.
    ///
    /// Writing a value equal to the current one does nothing. Otherwise, if
    /// the key is reactive, the new value is deep-instrumented before it is
    /// stored and the key's subscribers are notified. An assignment that
    /// would close a cycle through this object fails and leaves the key
    /// unchanged. Keys that did not exist are added as plain entries.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        let (reactive, dep) = {
            let inner = self.inner.read();
            match inner.slots.get(key) {
                Some(PropertySlot::Computed(_)) => return Err(Error::ReadOnlyProperty(key.to_owned())),
                Some(PropertySlot::Data { value: current, .. }) if *current == value => return Ok(()),
                Some(PropertySlot::Data { dep, .. }) => (inner.reactive, dep.clone()),
                None => (inner.reactive, None),
            }
        };

        if reactive {
            observer::observe_assigned(&value, self.id, dep.is_some())?;
        }

        {
            let mut inner = self.inner.write();
            match inner.slots.get_mut(key) {
                Some(PropertySlot::Data { value: current, .. }) => *current = value,
                _ => {
                    inner.slots.insert(key.to_owned(), PropertySlot::Data { value, dep: None });
                }
            }
        }

        match dep {
            Some(dep) => {
                trace!(node = %self.id, key, "property changed");
                dep.notify()
            }
            None => Ok(()),
        }
    }

    /// Remove a key without notifying anyone.
    ///
    /// Subscribers that read the key stay registered in its registry; they
    /// are simply never notified through it again.
    pub fn remove(&self, key: &str) -> Option<Value> {
        match self.inner.write().slots.shift_remove(key)? {
            PropertySlot::Data { value, .. } => Some(value),
            PropertySlot::Computed(_) => None,
        }
    }

    /// Number of registrations in the registry of `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        match self.inner.read().slots.get(key) {
            Some(PropertySlot::Data { dep: Some(dep), .. }) => dep.len(),
            _ => 0,
        }
    }

    pub(crate) fn define_computed(&self, key: &str, getter: ComputedFn) -> Result<()> {
        let mut inner = self.inner.write();
        if inner.slots.contains_key(key) {
            return Err(Error::DuplicateProperty(key.to_owned()));
        }
        inner.slots.insert(key.to_owned(), PropertySlot::Computed(getter));
        Ok(())
    }

    pub(crate) fn entries_untracked(&self) -> Vec<(String, Value)> {
        self.inner
            .read()
            .slots
            .iter()
            .filter_map(|(key, slot)| match slot {
                PropertySlot::Data { value, .. } => Some((key.clone(), value.clone())),
                PropertySlot::Computed(_) => None,
            })
            .collect()
    }

    pub(crate) fn instrument(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.reactive {
            return false;
        }
        for slot in inner.slots.values_mut() {
            if let PropertySlot::Data { dep, .. } = slot {
                dep.get_or_insert_with(Dep::new);
            }
        }
        inner.reactive = true;
        true
    }
}

impl Default for ObjectNode {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for ObjectNode {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let object = ObjectNode::new();
        {
            let mut inner = object.inner.write();
            for (key, value) in iter {
                inner.slots.insert(key.into(), PropertySlot::Data { value, dep: None });
            }
        }
        object
    }
}

impl std::fmt::Debug for ObjectNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectNode")
            .field("id", &self.id)
            .field("keys", &self.keys())
            .field("reactive", &self.is_reactive())
            .finish()
    }
}
