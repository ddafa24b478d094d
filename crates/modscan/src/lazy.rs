//! Lazily bound values and components.
//!
//! Both handle types are returned before their target module may exist. A
//! [`LazyValue`] reads as `Undefined` until resolved. A [`LazyComponent`]
//! renders the host's no-op placeholder until resolved, then the real
//! component, through the same handle.

use std::{collections::BTreeMap, sync::Arc};

use parking_lot::RwLock;
use tracing::debug;

use crate::{Discovery, Result, deferred::Deferred, filter::Filter, value::Value};

/// Transform applied to a matched export before it is bound.
pub type Transform = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Identity transform.
pub fn identity() -> Transform {
    Arc::new(|v: Value| v)
}

/// UI framework collaborator supplying the unresolved placeholder.
pub trait ComponentHost: Send + Sync {
    /// A renderable component that renders nothing.
    fn placeholder(&self) -> Value;
}

/// Host whose placeholder is a function returning null.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHost;

impl ComponentHost for NoopHost {
    fn placeholder(&self) -> Value {
        Value::function("NoopComponent", "function NoopComponent(){return null}")
    }
}

/// Deferred export value.
#[derive(Clone, Debug, Default)]
pub struct LazyValue {
    /// Resolution slot.
    slot: Deferred<Value>,
}

impl LazyValue {
    /// Unresolved handle.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Producer side.
    pub(crate) fn slot(&self) -> &Deferred<Value> {
        &self.slot
    }

    /// The bound value, if resolved.
    #[must_use]
    pub fn get(&self) -> Option<Value> {
        self.slot.get().cloned()
    }

    /// The bound value, or `Undefined` before resolution.
    #[must_use]
    pub fn value(&self) -> Value {
        self.get().unwrap_or_default()
    }

    /// Property of the bound value; `Undefined` before resolution.
    #[must_use]
    pub fn prop(&self, key: &str) -> Value {
        self.slot.get().map(|v| v.get(key)).unwrap_or_default()
    }

    /// True once bound.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.slot.is_resolved()
    }

    /// Wait until bound.
    pub async fn resolved(&self) -> Value {
        self.slot.wait().await
    }
}

/// A component paired with its props, ready for the host to draw.
#[derive(Clone, Debug)]
pub struct Element {
    /// Component rendered.
    pub component: Value,
    /// Props passed to it.
    pub props: Value,
}

/// Stable component handle that becomes the real component once bound.
#[derive(Clone)]
pub struct LazyComponent {
    /// Handle given out to callers. Receives the real component's own
    /// properties on resolution.
    handle: Value,
    /// Component currently rendered through the handle.
    inner: Arc<RwLock<Value>>,
    /// Resolution signal.
    resolved: Deferred<Value>,
}

impl LazyComponent {
    /// Handle rendering `placeholder` until bound.
    pub(crate) fn new(placeholder: Value, label: &str) -> Self {
        let source = format!("function LazyComponent(props){{/* {label} */}}");
        Self {
            handle: Value::function("LazyComponent", &source),
            inner: Arc::new(RwLock::new(placeholder)),
            resolved: Deferred::new(),
        }
    }

    /// Bind the real component.
    ///
    /// The new component's own properties are copied onto the original
    /// handle so references taken before resolution see them too.
    pub(crate) fn bind(&self, component: Value) {
        self.handle.assign_from(&component);
        *self.inner.write() = component.clone();
        if let Err(e) = self.resolved.resolve(component) {
            debug!("lazy component rebound: {e}");
        }
    }

    /// The stable handle.
    #[must_use]
    pub fn handle(&self) -> Value {
        self.handle.clone()
    }

    /// Render through the handle.
    #[must_use]
    pub fn render(&self, props: Value) -> Element {
        Element {
            component: self.current(),
            props,
        }
    }

    /// Current inner binding: the placeholder, then the real component.
    #[must_use]
    pub fn current(&self) -> Value {
        self.inner.read().clone()
    }

    /// True once the real component is bound.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.is_resolved()
    }

    /// Wait until the real component is bound.
    pub async fn resolved(&self) -> Value {
        self.resolved.wait().await
    }
}

/// Deferred [`Discovery::map_mangled_module`].
///
/// The mapping runs on first access. A non-empty result is cached; an empty
/// one (owning module not found yet) is retried on the next access.
#[derive(Clone)]
pub struct LazyMangledModule {
    /// Service to run against.
    discovery: Arc<Discovery>,
    /// Code locating the owning factory.
    code: Arc<[String]>,
    /// Stable names and the filters choosing their exports.
    mappers: Arc<[(String, Filter)]>,
    /// Cached mapping.
    mapped: Deferred<BTreeMap<String, Value>>,
}

impl LazyMangledModule {
    /// Bundle the arguments of a later mapping.
    pub(crate) fn new(
        discovery: Arc<Discovery>,
        code: Vec<String>,
        mappers: Vec<(String, Filter)>,
    ) -> Self {
        Self {
            discovery,
            code: code.into(),
            mappers: mappers.into(),
            mapped: Deferred::new(),
        }
    }

    /// The mapped exports, computing them if not cached.
    pub fn get(&self) -> Result<BTreeMap<String, Value>> {
        if let Some(mapped) = self.mapped.get() {
            return Ok(mapped.clone());
        }
        let mappers: Vec<(&str, Filter)> = self
            .mappers
            .iter()
            .map(|(name, filter)| (name.as_str(), filter.clone()))
            .collect();
        let mapped = self.discovery.mangled_exports(&self.code, &mappers)?;
        if !mapped.is_empty() && self.mapped.resolve(mapped.clone()).is_err() {
            debug!("mangled module mapped concurrently");
        }
        Ok(mapped)
    }

    /// A single mapped export; `Undefined` when unmapped.
    pub fn member(&self, name: &str) -> Result<Value> {
        Ok(self.get()?.remove(name).unwrap_or_default())
    }

    /// True once a mapping is cached.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.mapped.is_resolved()
    }
}
