//! Property paths and the resolver that folds them through a store.
//!
//! A path such as `user.address.city` is split on the store's separator and
//! folded left to right starting at the store's data object. Each hop is an
//! ordinary slot read, so when a watcher is capturing, it is registered on
//! every slot along the path, not only on the leaf.

use std::fmt;

use smallvec::SmallVec;

use crate::error::{Error, Result};
use crate::graph::{SlotRead, Value};
use crate::store::Store;

/// A parsed, non-empty property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    raw: String,
    separator: char,
    segments: SmallVec<[String; 4]>,
}

impl PropertyPath {
    /// Parse `raw`, rejecting empty paths and empty segments.
    pub fn parse(raw: &str, separator: char) -> Result<Self> {
        let segments: SmallVec<[String; 4]> = raw.split(separator).map(str::to_owned).collect();
        if raw.is_empty() || segments.iter().any(String::is_empty) {
            return Err(Error::InvalidPath(raw.to_owned()));
        }
        Ok(Self {
            raw: raw.to_owned(),
            separator,
            segments,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The first `len` segments joined back together.
    pub fn prefix(&self, len: usize) -> String {
        self.segments[..len.min(self.segments.len())].join(&self.separator.to_string())
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Read the value at `path`.
///
/// A missing leaf key reads as `Null`. A segment applied to anything other
/// than an object or array fails with `PathResolution`.
pub fn resolve(store: &Store, path: &PropertyPath) -> Result<Value> {
    path.segments()
        .iter()
        .enumerate()
        .try_fold(store.root(), |current, (depth, segment)| step(store, path, depth, &current, segment))
}

/// Write `value` at `path`.
///
/// Intermediate segments are read exactly as [`resolve`] reads them. The
/// final segment is a slot write on an object, or an element replacement on
/// an array (an index equal to the length appends).
pub fn write(store: &Store, path: &PropertyPath, value: Value) -> Result<()> {
    let Some((last, parents)) = path.segments().split_last() else {
        return Err(Error::InvalidPath(path.to_string()));
    };
    let parent = parents
        .iter()
        .enumerate()
        .try_fold(store.root(), |current, (depth, segment)| step(store, path, depth, &current, segment))?;

    match &parent {
        Value::Object(object) => object.set(last, value).map_err(|err| match err {
            Error::ReadOnlyProperty(_) => Error::ReadOnlyProperty(path.to_string()),
            other => other,
        }),
        Value::Array(array) => {
            let index = last
                .parse::<usize>()
                .map_err(|_| Error::InvalidPath(path.to_string()))?;
            let len = array.len();
            if index > len {
                return Err(Error::IndexOutOfBounds {
                    path: path.to_string(),
                    index,
                    len,
                });
            }
            if array.get(index).as_ref() == Some(&value) {
                return Ok(());
            }
            array.splice(index, 1, vec![value]).map(drop)
        }
        _ => Err(not_traversable(path, parents.len())),
    }
}

fn step(store: &Store, path: &PropertyPath, depth: usize, current: &Value, segment: &str) -> Result<Value> {
    match current {
        Value::Object(object) => match object.read_slot(segment) {
            Some(SlotRead::Value(value)) => Ok(value),
            Some(SlotRead::Computed(getter)) => getter(store),
            None => Ok(Value::Null),
        },
        Value::Array(array) => match segment.parse::<usize>() {
            Ok(index) => Ok(array.get(index).unwrap_or_default()),
            Err(_) if segment == "length" => Ok(Value::from(array.len())),
            Err(_) => Ok(Value::Null),
        },
        _ => Err(not_traversable(path, depth)),
    }
}

fn not_traversable(path: &PropertyPath, depth: usize) -> Error {
    Error::PathResolution {
        path: path.to_string(),
        prefix: path.prefix(depth),
    }
}
