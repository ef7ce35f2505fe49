//! The closed set of values a reactive graph can hold.

use std::collections::HashSet;
use std::fmt;

use serde_json::Value as Json;

use super::{ArrayNode, NodeId, ObjectNode};
use crate::error::{Error, Result};

/// A value stored in a property slot or array element.
///
/// Scalars compare by value. Objects and arrays are shared handles and
/// compare by node identity, so assigning a structurally equal but distinct
/// object still counts as a change.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(ObjectNode),
    Array(ArrayNode),
}

impl Value {
    /// Build a plain (not yet reactive) graph from JSON.
    pub fn from_json(json: Json) -> Self {
        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            Json::String(s) => Value::String(s),
            Json::Array(items) => {
                Value::Array(ArrayNode::from_values(items.into_iter().map(Value::from_json).collect()))
            }
            Json::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Structural snapshot of the value and everything below it.
    ///
    /// Reads are untracked at the slot level; callers that must not capture
    /// wrap this in [`ActiveCapture::untracked`](crate::reactive::ActiveCapture::untracked).
    /// Computed properties are not part of the snapshot.
    pub fn to_json(&self) -> Result<Json> {
        self.to_json_on_path(&mut HashSet::new())
    }

    fn to_json_on_path(&self, path: &mut HashSet<NodeId>) -> Result<Json> {
        Ok(match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => Json::String(s.clone()),
            Value::Object(object) => {
                let id = object.id();
                if !path.insert(id) {
                    return Err(Error::CyclicGraph { node: id });
                }
                let mut map = serde_json::Map::new();
                for (key, value) in object.entries_untracked() {
                    map.insert(key, value.to_json_on_path(path)?);
                }
                path.remove(&id);
                Json::Object(map)
            }
            Value::Array(array) => {
                let id = array.id();
                if !path.insert(id) {
                    return Err(Error::CyclicGraph { node: id });
                }
                let items = array
                    .to_vec_untracked()
                    .iter()
                    .map(|item| item.to_json_on_path(path))
                    .collect::<Result<Vec<_>>>()?;
                path.remove(&id);
                Json::Array(items)
            }
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Objects and arrays are nodes; everything else is a scalar.
    pub fn is_node(&self) -> bool {
        self.node_id().is_some()
    }

    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Value::Object(object) => Some(object.id()),
            Value::Array(array) => Some(array.id()),
            _ => None,
        }
    }

    /// Whether this node has been instrumented. Scalars never are.
    pub fn is_reactive(&self) -> bool {
        match self {
            Value::Object(object) => object.is_reactive(),
            Value::Array(array) => array.is_reactive(),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayNode> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    /// The direct children that are themselves nodes.
    pub(crate) fn child_nodes(&self) -> Vec<Value> {
        match self {
            Value::Object(object) => object
                .entries_untracked()
                .into_iter()
                .map(|(_, value)| value)
                .filter(Value::is_node)
                .collect(),
            Value::Array(array) => array.to_vec_untracked().into_iter().filter(Value::is_node).collect(),
            _ => Vec::new(),
        }
    }

    /// Attach registries to this node. Returns false if it already had them.
    pub(crate) fn instrument(&self) -> bool {
        match self {
            Value::Object(object) => object.instrument(),
            Value::Array(array) => array.instrument(),
            _ => false,
        }
    }

    /// Capturing read of the array registry when this value is an array.
    pub(crate) fn track(&self) {
        if let Value::Array(array) = self {
            array.depend();
        }
    }
}

fn number_to_json(n: f64) -> Json {
    // Integral values render without a fractional part, as JSON.stringify does.
    if n.fract() == 0.0 && n.abs() < 9.0e15 {
        Json::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.id() == b.id(),
            (Value::Array(a), Value::Array(b)) => a.id() == b.id(),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Number(n) => write!(f, "Number({n})"),
            Value::String(s) => write!(f, "String({s:?})"),
            Value::Object(object) => write!(f, "Object({})", object.id()),
            Value::Array(array) => write!(f, "Array({})", array.id()),
        }
    }
}

/// Display text of a value, the way a text binding would show it.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => f.write_str(s),
            Value::Object(_) => f.write_str("[object Object]"),
            Value::Array(array) => write_joined(f, array, &mut Vec::new()),
        }
    }
}

/// Comma-joined display text of an array. An array already being written
/// further up shows as empty text.
fn write_joined(f: &mut fmt::Formatter<'_>, array: &ArrayNode, open: &mut Vec<NodeId>) -> fmt::Result {
    if open.contains(&array.id()) {
        return Ok(());
    }
    open.push(array.id());
    for (index, item) in array.to_vec_untracked().iter().enumerate() {
        if index > 0 {
            f.write_str(",")?;
        }
        match item {
            Value::Array(inner) => write_joined(f, inner, open)?,
            other => write!(f, "{other}")?,
        }
    }
    open.pop();
    Ok(())
}

impl From<Json> for Value {
    fn from(json: Json) -> Self {
        Value::from_json(json)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<ObjectNode> for Value {
    fn from(object: ObjectNode) -> Self {
        Value::Object(object)
    }
}

impl From<ArrayNode> for Value {
    fn from(array: ArrayNode) -> Self {
        Value::Array(array)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(ArrayNode::from_values(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalars_compare_by_value() {
        assert_eq!(Value::from("a"), Value::from("a"));
        assert_eq!(Value::from(1), Value::from(1.0));
        assert_ne!(Value::from(1), Value::from("1"));
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn nodes_compare_by_identity() {
        let a = Value::from_json(json!({ "x": 1 }));
        let b = Value::from_json(json!({ "x": 1 }));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn json_snapshot_keeps_structure() {
        let json = json!({ "name": "a", "tags": ["x", "y"], "n": 2, "half": 0.5, "none": null });
        let value = Value::from_json(json.clone());
        assert_eq!(value.to_json().unwrap(), json);
    }

    #[test]
    fn snapshot_detects_cycles() {
        let object = ObjectNode::new();
        object.set("me", Value::Object(object.clone())).unwrap();
        assert!(matches!(
            Value::Object(object).to_json(),
            Err(Error::CyclicGraph { .. })
        ));
    }

    #[test]
    fn shared_children_are_not_cycles() {
        let shared = Value::from_json(json!({ "v": 1 }));
        let parent = ObjectNode::new();
        parent.set("a", shared.clone()).unwrap();
        parent.set("b", shared).unwrap();
        assert_eq!(
            Value::Object(parent).to_json().unwrap(),
            json!({ "a": { "v": 1 }, "b": { "v": 1 } })
        );
    }

    #[test]
    fn display_matches_text_bindings() {
        assert_eq!(Value::from(3).to_string(), "3");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from_json(json!([1, "b", true])).to_string(), "1,b,true");
        assert_eq!(Value::from_json(json!({})).to_string(), "[object Object]");
    }
}
