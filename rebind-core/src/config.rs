//! Store configuration.

use serde::{Deserialize, Serialize};

/// Default separator between path segments.
const DEFAULT_SEPARATOR: char = '.';
/// Default limit on nested watcher updates within one write.
const DEFAULT_MAX_PROPAGATION_DEPTH: usize = 100;

/// Tunables for a [`Store`](crate::Store).
///
/// Missing fields fall back to their defaults when deserialized, so a
/// consumer can embed a partial table in its own configuration file.
///
/// # Example
///
/// ```rust
/// use rebind_core::StoreConfig;
///
/// let config = StoreConfig::default().with_separator('/');
/// assert_eq!(config.separator, '/');
/// assert_eq!(config.max_propagation_depth, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Character separating segments of a property path.
    pub separator: char,

    /// How many watcher updates may nest inside one another before
    /// propagation is aborted with `PropagationDepthExceeded`.
    pub max_propagation_depth: usize,
}

impl StoreConfig {
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_max_propagation_depth(mut self, depth: usize) -> Self {
        self.max_propagation_depth = depth;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            max_propagation_depth: DEFAULT_MAX_PROPAGATION_DEPTH,
        }
    }
}
