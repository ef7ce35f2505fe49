//! Graph Instrumentation
//!
//! Turns a plain object graph into a reactive one, in place.
//!
//! # Algorithm
//!
//! Instrumentation runs in two phases so that a failure never leaves a
//! half-instrumented graph behind:
//!
//! 1. Walk every reachable node depth-first with an explicit stack of
//!    enter/exit frames. The set of nodes on the active path detects cycles;
//!    the set of finished nodes lets shared (DAG) nodes be visited once.
//!    Plain nodes that are not below an already-instrumented node are
//!    collected.
//! 2. Attach registries to every collected node: one per key for objects,
//!    one per array.
//!
//! Nodes already instrumented are walked for cycle detection only. Their
//! descendants keep whatever state they have, which is how elements pushed
//! into a reactive array stay plain even when the array is reassigned.

use std::collections::HashSet;

use tracing::debug;

use super::{NodeId, Value};
use crate::error::{Error, Result};

/// Instrument `root` and everything reachable from it.
///
/// Scalars are left alone. Calling this on a node that is already reactive
/// fails with `AlreadyReactive`; a graph containing a cycle fails with
/// `CyclicGraph` before anything is instrumented. Returns the number of
/// nodes that were instrumented.
pub fn make_reactive(root: &Value) -> Result<usize> {
    if let Some(node) = root.node_id().filter(|_| root.is_reactive()) {
        return Err(Error::AlreadyReactive { node });
    }
    Observer::new().observe(root)
}

/// Instrument a value being assigned into a reactive slot of `owner`.
///
/// `owner` counts as being on the active path, so an assignment that would
/// make the owner reachable from itself fails. When `instrument` is false the
/// value is only checked for cycles.
pub(crate) fn observe_assigned(value: &Value, owner: NodeId, instrument: bool) -> Result<usize> {
    let mut observer = Observer::new();
    observer.on_path.insert(owner);
    if instrument {
        observer.observe(value)
    } else {
        observer.collect(value).map(|_| 0)
    }
}

enum Frame {
    Enter { value: Value, below_reactive: bool },
    Exit(NodeId),
}

struct Observer {
    on_path: HashSet<NodeId>,
    finished: HashSet<NodeId>,
}

impl Observer {
    fn new() -> Self {
        Self {
            on_path: HashSet::new(),
            finished: HashSet::new(),
        }
    }

    fn observe(mut self, root: &Value) -> Result<usize> {
        let pending = self.collect(root)?;
        let instrumented = pending.iter().filter(|node| node.instrument()).count();
        if instrumented > 0 {
            debug!(root = ?root.node_id(), instrumented, "object graph made reactive");
        }
        Ok(instrumented)
    }

    fn collect(&mut self, root: &Value) -> Result<Vec<Value>> {
        let mut pending = Vec::new();
        let mut stack = vec![Frame::Enter {
            value: root.clone(),
            below_reactive: false,
        }];

        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Exit(id) => {
                    self.on_path.remove(&id);
                    self.finished.insert(id);
                }
                Frame::Enter { value, below_reactive } => {
                    let Some(id) = value.node_id() else {
                        continue;
                    };
                    if self.on_path.contains(&id) {
                        return Err(Error::CyclicGraph { node: id });
                    }
                    if self.finished.contains(&id) {
                        continue;
                    }

                    self.on_path.insert(id);
                    stack.push(Frame::Exit(id));

                    let below_reactive = below_reactive || value.is_reactive();
                    for child in value.child_nodes() {
                        stack.push(Frame::Enter { value: child, below_reactive });
                    }
                    if !below_reactive {
                        pending.push(value);
                    }
                }
            }
        }

        Ok(pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ArrayNode, ObjectNode};
    use serde_json::json;

    #[test]
    fn instruments_nested_objects_and_arrays() {
        let root = Value::from_json(json!({
            "user": { "name": "a", "tags": [{ "id": 1 }, "x"] },
            "count": 0
        }));
        assert_eq!(make_reactive(&root).unwrap(), 4);

        let user = root.as_object().unwrap().get_untracked("user").unwrap();
        let tags = user.as_object().unwrap().get_untracked("tags").unwrap();
        let first = tags.as_array().unwrap().get(0).unwrap();
        assert!(user.is_reactive());
        assert!(tags.is_reactive());
        assert!(first.is_reactive());
    }

    #[test]
    fn rejects_reinstrumentation() {
        let root = Value::from_json(json!({ "a": 1 }));
        make_reactive(&root).unwrap();
        assert!(matches!(make_reactive(&root), Err(Error::AlreadyReactive { .. })));
    }

    #[test]
    fn scalars_are_ignored() {
        assert_eq!(make_reactive(&Value::from(1)).unwrap(), 0);
    }

    #[test]
    fn cycles_fail_before_instrumenting() {
        let outer = ObjectNode::new();
        let inner = ObjectNode::new();
        outer.set("inner", Value::Object(inner.clone())).unwrap();
        inner.set("outer", Value::Object(outer.clone())).unwrap();

        let err = make_reactive(&Value::Object(outer.clone())).unwrap_err();
        assert!(matches!(err, Error::CyclicGraph { .. }));
        assert!(!outer.is_reactive());
        assert!(!inner.is_reactive());
    }

    #[test]
    fn shared_nodes_are_instrumented_once() {
        let shared = Value::from_json(json!({ "v": 1 }));
        let root = ObjectNode::new();
        root.set("a", shared.clone()).unwrap();
        root.set("b", shared.clone()).unwrap();
        let list = ArrayNode::from_values(vec![shared.clone()]);
        root.set("list", Value::Array(list)).unwrap();

        assert_eq!(make_reactive(&Value::Object(root)).unwrap(), 3);
        assert!(shared.is_reactive());
    }

    #[test]
    fn assignment_closing_a_cycle_fails() {
        let root = Value::from_json(json!({ "child": { "slot": null } }));
        make_reactive(&root).unwrap();
        let child = root.as_object().unwrap().get_untracked("child").unwrap();
        let child = child.as_object().unwrap();

        let err = child.set("slot", root.clone()).unwrap_err();
        assert!(matches!(err, Error::CyclicGraph { .. }));
        assert_eq!(child.get_untracked("slot"), Some(Value::Null));
    }

    #[test]
    fn plain_descendants_of_reactive_nodes_stay_plain() {
        let list = ArrayNode::new();
        let list_value = Value::Array(list.clone());
        make_reactive(&list_value).unwrap();

        let late = Value::from_json(json!({ "x": 1 }));
        list.push(late.clone()).unwrap();

        let holder = ObjectNode::new();
        holder.set("list", list_value).unwrap();
        make_reactive(&Value::Object(holder)).unwrap();
        assert!(!late.is_reactive());
    }
}
