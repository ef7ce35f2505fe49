//! Error types shared by every layer of the engine.

use thiserror::Error;

use crate::graph::NodeId;
use crate::reactive::SubscriberId;

/// Error returned by a consumer's watcher callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a watcher callback.
pub type CallbackResult = std::result::Result<(), CallbackError>;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while instrumenting, reading, writing or
/// propagating changes.
#[derive(Debug, Error)]
pub enum Error {
    /// An intermediate segment did not resolve to an object or array.
    #[error("cannot resolve `{path}`: `{prefix}` is not an object or array")]
    PathResolution { path: String, prefix: String },

    /// The path expression itself is malformed (empty, or has an empty segment).
    #[error("invalid property path `{0}`")]
    InvalidPath(String),

    /// An array segment is past the end of the array.
    #[error("index {index} is out of bounds for `{path}` (length {len})")]
    IndexOutOfBounds { path: String, index: usize, len: usize },

    /// Instrumentation met a node that is already on the active traversal path.
    #[error("object graph contains a cycle through node {node}")]
    CyclicGraph { node: NodeId },

    /// `make_reactive` was called on a node that is already instrumented.
    #[error("node {node} is already reactive")]
    AlreadyReactive { node: NodeId },

    /// A store must be rooted at an object.
    #[error("store data must be an object, got {0}")]
    InvalidRoot(&'static str),

    /// The property is a computed getter.
    #[error("`{0}` is a computed property and cannot be written")]
    ReadOnlyProperty(String),

    /// A computed property name collides with an existing key.
    #[error("property `{0}` is already defined")]
    DuplicateProperty(String),

    /// Synchronous propagation nested deeper than the configured limit.
    #[error("change propagation exceeded {limit} nested watcher updates")]
    PropagationDepthExceeded { limit: usize },

    /// One or more subscribers failed while a registry was notifying.
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// A watcher callback returned an error.
    #[error("watcher callback failed: {0}")]
    Callback(#[source] CallbackError),

    #[error("failed to render value as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Walks nested notification failures and reports whether any of them
    /// was caused by the propagation depth guard.
    pub fn is_depth_exceeded(&self) -> bool {
        match self {
            Error::PropagationDepthExceeded { .. } => true,
            Error::Notify(notify) => notify.failures.iter().any(|(_, e)| e.is_depth_exceeded()),
            Error::Callback(source) => source
                .downcast_ref::<Error>()
                .is_some_and(Error::is_depth_exceeded),
            _ => false,
        }
    }
}

/// Failures collected from a single `notify` fan-out.
///
/// Every live subscriber is updated even when an earlier one fails, so this
/// carries all of the failures rather than the first.
#[derive(Debug, Error)]
#[error("{} of {attempted} subscribers failed to update", .failures.len())]
pub struct NotifyError {
    /// Number of subscribers the registry tried to update.
    pub attempted: usize,
    /// The failing subscribers, in notification order.
    pub failures: Vec<(SubscriberId, Error)>,
}
