//! Rebind Core
//!
//! This crate provides the core runtime for the Rebind reactive data-binding
//! engine. It turns a plain object graph into one where reads are observed
//! and writes are propagated to interested parties automatically.
//!
//! It implements:
//!
//! - Deep, in-place instrumentation of objects and arrays
//! - Per-property subscriber registries with synchronous fan-out
//! - Implicit dependency capture while a watcher resolves a path
//! - Watchers that re-evaluate and call back when their value changes
//! - Computed properties that piggy-back on the same capture protocol
//!
//! Parsing templates, updating a presentation layer and batching updates
//! are left to the consumer.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Values, object and array nodes, and instrumentation
//! - `reactive`: Capture slot, subscriber registries and watchers
//! - `path`: Property paths and the resolver
//! - `store`: The root object consumers bind against
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use rebind_core::Store;
//!
//! let store = Store::new(serde_json::json!({ "user": { "name": "a" } })).unwrap();
//!
//! let renders = Arc::new(AtomicUsize::new(0));
//! let counter = renders.clone();
//! let _watcher = store
//!     .watch("user.name", move || {
//!         counter.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     })
//!     .unwrap();
//!
//! // Replacing the whole object still reaches the watcher, which is also
//! // subscribed to `user`.
//! store.write("user", serde_json::json!({ "name": "b" })).unwrap();
//! assert_eq!(renders.load(Ordering::SeqCst), 1);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod path;
pub mod reactive;
pub mod store;

pub use config::StoreConfig;
pub use error::{CallbackError, CallbackResult, Error, NotifyError, Result};
pub use graph::{make_reactive, ArrayNode, NodeId, ObjectNode, Value};
pub use path::PropertyPath;
pub use reactive::Watcher;
pub use store::{ComputedFn, Store, StoreBuilder};
