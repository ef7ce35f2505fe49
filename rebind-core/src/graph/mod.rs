//! Reactive Object Graph
//!
//! This module holds the data side of the engine: the value model and the
//! instrumentation pass that makes a graph reactive.
//!
//! # Overview
//!
//! A graph is built from [`Value`]s. Objects and arrays are shared nodes
//! with a stable [`NodeId`]; scalars are stored inline. A freshly built node
//! is plain: reading and writing it has no side effects. [`make_reactive`]
//! instruments a node and everything below it:
//!
//! - every key of an object gets its own registry, so reads are captured and
//!   writes notify exactly the subscribers of that key
//! - every array gets one registry for the whole sequence, notified by each
//!   mutating operation
//!
//! The graph must stay acyclic. Instrumentation and structural snapshots
//! detect cycles and fail with `CyclicGraph` rather than looping.

mod array;
mod node;
mod object;
pub(crate) mod observer;
mod value;

pub use array::ArrayNode;
pub use node::NodeId;
pub use object::ObjectNode;
pub(crate) use object::SlotRead;
pub use observer::make_reactive;
pub use value::Value;
