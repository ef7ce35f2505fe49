//! Store
//!
//! The store owns the root data object of a binding context together with
//! its configuration, and is the surface a templating or UI layer talks to:
//! it resolves and writes paths, creates watchers, and hosts computed
//! properties.

use std::sync::Arc;

use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{CallbackResult, Error, Result};
use crate::graph::{make_reactive, ObjectNode, Value};
use crate::path::{self, PropertyPath};
use crate::reactive::{ActiveCapture, Watcher};

/// Getter backing a computed property.
///
/// It receives the store so it can read other properties; those reads are
/// captured by whichever watcher is resolving the computed key.
pub type ComputedFn = Arc<dyn Fn(&Store) -> Result<Value> + Send + Sync>;

struct StoreInner {
    data: ObjectNode,
    config: StoreConfig,
}

/// A reactive root object.
///
/// Cloning the store yields another handle to the same data.
///
/// # Example
///
/// ```rust
/// use rebind_core::{Store, Value};
///
/// let store = Store::builder()
///     .data(serde_json::json!({ "first": "Ada", "last": "Lovelace" }))
///     .computed("full", |store| {
///         Ok(Value::from(format!("{} {}", store.resolve("first")?, store.resolve("last")?)))
///     })
///     .build()
///     .unwrap();
///
/// assert_eq!(store.resolve("full").unwrap(), Value::from("Ada Lovelace"));
/// ```
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Instrument `data` with the default configuration.
    pub fn new(data: impl Into<Value>) -> Result<Self> {
        Self::builder().data(data).build()
    }

    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    /// The root data object.
    pub fn data(&self) -> &ObjectNode {
        &self.inner.data
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Parse `raw` with this store's separator.
    pub fn path(&self, raw: &str) -> Result<PropertyPath> {
        PropertyPath::parse(raw, self.inner.config.separator)
    }

    pub(crate) fn root(&self) -> Value {
        Value::Object(self.inner.data.clone())
    }

    /// Read the value at `path`.
    pub fn resolve(&self, path: &str) -> Result<Value> {
        path::resolve(self, &self.path(path)?)
    }

    /// Read the value at `path` and render it as JSON text.
    pub fn resolve_json(&self, path: &str) -> Result<String> {
        let value = self.resolve(path)?;
        let json = ActiveCapture::untracked(|| value.to_json())?;
        Ok(serde_json::to_string(&json)?)
    }

    /// Write `value` at `path`, notifying the subscribers of the written slot.
    ///
    /// The value is stored even when a subscriber fails; the failures are
    /// returned as `Error::Notify`.
    pub fn write(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        path::write(self, &self.path(path)?, value.into())
    }

    /// Create a watcher on `path`. See [`Watcher`].
    pub fn watch<F>(&self, path: &str, on_change: F) -> Result<Watcher>
    where
        F: Fn() -> CallbackResult + Send + Sync + 'static,
    {
        Watcher::new(self, path, on_change)
    }

    /// Install a get-only property on the data object.
    pub fn define_computed<F>(&self, name: &str, getter: F) -> Result<()>
    where
        F: Fn(&Store) -> Result<Value> + Send + Sync + 'static,
    {
        self.inner.data.define_computed(name, Arc::new(getter))
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("data", &self.inner.data)
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Assembles a [`Store`] from data, computed properties and configuration.
pub struct StoreBuilder {
    data: Value,
    computed: Vec<(String, ComputedFn)>,
    config: StoreConfig,
}

impl StoreBuilder {
    /// Root data. Must be an object; plain JSON is accepted.
    pub fn data(mut self, data: impl Into<Value>) -> Self {
        self.data = data.into();
        self
    }

    pub fn computed<F>(mut self, name: impl Into<String>, getter: F) -> Self
    where
        F: Fn(&Store) -> Result<Value> + Send + Sync + 'static,
    {
        self.computed.push((name.into(), Arc::new(getter)));
        self
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Instrument the data and install the computed properties.
    pub fn build(self) -> Result<Store> {
        let data = match self.data {
            Value::Object(data) => data,
            other => return Err(Error::InvalidRoot(other.kind())),
        };
        make_reactive(&Value::Object(data.clone()))?;

        let computed = self.computed.len();
        for (name, getter) in self.computed {
            data.define_computed(&name, getter)?;
        }
        debug!(root = %data.id(), keys = data.len(), computed, "store created");

        Ok(Store {
            inner: Arc::new(StoreInner {
                data,
                config: self.config,
            }),
        })
    }
}

impl Default for StoreBuilder {
    fn default() -> Self {
        Self {
            data: Value::Object(ObjectNode::new()),
            computed: Vec::new(),
            config: StoreConfig::default(),
        }
    }
}
