//! Array nodes.
//!
//! An instrumented array owns a single [`Dep`] for the whole sequence. Every
//! mutating operation applies its change and then notifies that registry,
//! whether or not anything actually changed. Elements inserted after the
//! array was instrumented are stored as given; they are not instrumented.

use std::cmp::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use super::{observer, NodeId, Value};
use crate::error::Result;
use crate::reactive::Dep;

struct ArrayInner {
    items: Vec<Value>,
    dep: Option<Dep>,
}

/// Shared handle to an array node.
#[derive(Clone)]
pub struct ArrayNode {
    id: NodeId,
    inner: Arc<RwLock<ArrayInner>>,
}

impl ArrayNode {
    pub fn new() -> Self {
        Self::from_values(Vec::new())
    }

    /// Create a plain array holding `items`.
    pub fn from_values(items: Vec<Value>) -> Self {
        Self {
            id: NodeId::next(),
            inner: Arc::new(RwLock::new(ArrayInner { items, dep: None })),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn is_reactive(&self) -> bool {
        self.inner.read().dep.is_some()
    }

    /// Number of registrations in the array's registry.
    pub fn subscriber_count(&self) -> usize {
        self.inner.read().dep.as_ref().map_or(0, Dep::len)
    }

    pub fn len(&self) -> usize {
        self.depend();
        self.inner.read().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index`. A capturing read of the whole array.
    pub fn get(&self, index: usize) -> Option<Value> {
        self.depend();
        self.inner.read().items.get(index).cloned()
    }

    /// Copy of the elements. A capturing read of the whole array.
    pub fn to_vec(&self) -> Vec<Value> {
        self.depend();
        self.to_vec_untracked()
    }

    pub(crate) fn to_vec_untracked(&self) -> Vec<Value> {
        self.inner.read().items.clone()
    }

    pub(crate) fn depend(&self) {
        let dep = self.inner.read().dep.clone();
        if let Some(dep) = dep {
            dep.depend();
        }
    }

    pub(crate) fn instrument(&self) -> bool {
        let mut inner = self.inner.write();
        if inner.dep.is_some() {
            return false;
        }
        inner.dep = Some(Dep::new());
        true
    }

    /// Append to the end, returning the new length.
    pub fn push(&self, value: Value) -> Result<usize> {
        self.check_inserted(std::slice::from_ref(&value))?;
        self.mutate("push", |items| {
            items.push(value);
            items.len()
        })
    }

    /// Remove from the end.
    pub fn pop(&self) -> Result<Option<Value>> {
        self.mutate("pop", Vec::pop)
    }

    /// Remove from the front.
    pub fn shift(&self) -> Result<Option<Value>> {
        self.mutate("shift", |items| (!items.is_empty()).then(|| items.remove(0)))
    }

    /// Insert at the front, returning the new length.
    pub fn unshift(&self, value: Value) -> Result<usize> {
        self.check_inserted(std::slice::from_ref(&value))?;
        self.mutate("unshift", |items| {
            items.insert(0, value);
            items.len()
        })
    }

    /// Remove `delete_count` elements starting at `start` and insert `items`
    /// in their place. Both bounds are clamped to the array. Returns the
    /// removed elements.
    pub fn splice(&self, start: usize, delete_count: usize, items: Vec<Value>) -> Result<Vec<Value>> {
        self.check_inserted(&items)?;
        self.mutate("splice", |current| {
            let start = start.min(current.len());
            let end = start.saturating_add(delete_count).min(current.len());
            current.splice(start..end, items).collect()
        })
    }

    pub fn reverse(&self) -> Result<()> {
        self.mutate("reverse", |items| items.reverse())
    }

    /// Stable sort by display text, nulls last.
    pub fn sort(&self) -> Result<()> {
        let mut keyed: Vec<_> = self
            .to_vec_untracked()
            .into_iter()
            .map(|item| ((item.is_null(), item.to_string()), item))
            .collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        let sorted = keyed.into_iter().map(|(_, item)| item).collect();
        self.mutate("sort", move |items| *items = sorted)
    }

    /// Stable sort with a caller-supplied comparator. The comparator runs on
    /// a copy of the elements, outside the node lock, so it may read this
    /// array.
    pub fn sort_by<F>(&self, compare: F) -> Result<()>
    where
        F: FnMut(&Value, &Value) -> Ordering,
    {
        let mut sorted = self.to_vec_untracked();
        sorted.sort_by(compare);
        self.mutate("sort", move |items| *items = sorted)
    }

    /// Values entering a reactive array must not close a cycle through it.
    fn check_inserted(&self, values: &[Value]) -> Result<()> {
        if !self.is_reactive() {
            return Ok(());
        }
        for value in values {
            observer::observe_assigned(value, self.id, false)?;
        }
        Ok(())
    }

    /// Apply `f` to the elements, then notify the registry if the array is
    /// reactive. The lock is released before notifying.
    fn mutate<R>(&self, op: &'static str, f: impl FnOnce(&mut Vec<Value>) -> R) -> Result<R> {
        let (result, dep) = {
            let mut inner = self.inner.write();
            let result = f(&mut inner.items);
            (result, inner.dep.clone())
        };
        if let Some(dep) = dep {
            trace!(node = %self.id, op, "array mutated");
            dep.notify()?;
        }
        Ok(result)
    }
}

impl Default for ArrayNode {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ArrayNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArrayNode")
            .field("id", &self.id)
            .field("items", &self.to_vec_untracked())
            .field("reactive", &self.is_reactive())
            .finish()
    }
}
