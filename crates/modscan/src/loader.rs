//! Interface to the external bundle loader, plus an in-memory implementation.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::trace;

use crate::{Error, Result, ids::ModuleId, value::Value};

/// Hook invoked by the loader each time a module finishes executing.
pub type RegistrationHook = Arc<dyn Fn(&ModuleId, &Value) + Send + Sync>;

/// Entry in the loader's module registry.
#[derive(Clone, Debug)]
pub struct ModuleRecord {
    /// Exports produced by the module.
    pub exports: Value,
    /// Whether the module finished executing.
    pub loaded: bool,
}

/// Un-executed module factory with its serialized source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Factory {
    /// Module id the factory produces.
    pub id: ModuleId,
    /// Serialized factory source.
    pub source: Arc<str>,
}

/// Trait abstraction over the bundle loader.
///
/// Registries only grow during a session. Implementations must not hold
/// internal locks while invoking registration hooks.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Snapshot of the module registry in registry order.
    fn modules(&self) -> Vec<(ModuleId, ModuleRecord)>;

    /// Ids of every known factory, in registry order.
    fn factory_ids(&self) -> Vec<ModuleId>;

    /// Factory for `id`, if known.
    fn factory(&self, id: &ModuleId) -> Option<Factory>;

    /// Load the chunk with the given entry-point id.
    async fn load_chunk(&self, id: &ModuleId) -> Result<()>;

    /// Execute (if needed) and return the exports of module `id`.
    fn require(&self, id: &ModuleId) -> Option<Value>;

    /// Install a hook called for every module registered from now on.
    fn on_module_registered(&self, hook: RegistrationHook);
}

/// Registry state behind [`MemoryLoader`].
#[derive(Default)]
struct MemoryState {
    /// Executed modules, in registration order.
    modules: Vec<(ModuleId, ModuleRecord)>,
    /// Factory sources, in definition order.
    factories: Vec<Factory>,
    /// Modules that become requirable once their chunk is loaded.
    staged: HashMap<ModuleId, Vec<(ModuleId, Value)>>,
    /// Modules made available by loaded chunks but not yet executed.
    available: BTreeMap<ModuleId, Value>,
    /// Chunks whose loading fails.
    failing: HashSet<ModuleId>,
}

/// In-memory loader used by tests and offline inspection.
#[derive(Clone, Default)]
pub struct MemoryLoader {
    /// Registry state.
    state: Arc<Mutex<MemoryState>>,
    /// Registration hooks.
    hooks: Arc<Mutex<Vec<RegistrationHook>>>,
    /// Log of loader calls, e.g. `load_chunk:42`.
    calls: Arc<Mutex<Vec<String>>>,
}

impl MemoryLoader {
    /// Create an empty loader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a factory with the given serialized source.
    pub fn define_factory(&self, id: impl Into<ModuleId>, source: &str) {
        self.state.lock().factories.push(Factory {
            id: id.into(),
            source: Arc::from(source),
        });
    }

    /// Register an executed module and fire registration hooks.
    pub fn register(&self, id: impl Into<ModuleId>, exports: Value) {
        let id = id.into();
        trace!(%id, "register module");
        self.state.lock().modules.push((
            id.clone(),
            ModuleRecord {
                exports: exports.clone(),
                loaded: true,
            },
        ));
        self.fire_hooks(&id, &exports);
    }

    /// Add a module that has started executing but not finished.
    ///
    /// The record is visible in [`Loader::modules`] with `loaded: false`;
    /// hooks fire once [`MemoryLoader::finish_module`] is called.
    pub fn begin_module(&self, id: impl Into<ModuleId>, exports: Value) {
        let id = id.into();
        trace!(%id, "begin module");
        self.state.lock().modules.push((
            id,
            ModuleRecord {
                exports,
                loaded: false,
            },
        ));
    }

    /// Mark a module started with [`MemoryLoader::begin_module`] as loaded
    /// and fire registration hooks. Returns false if no such module is executing.
    pub fn finish_module(&self, id: &ModuleId) -> bool {
        let exports = {
            let mut state = self.state.lock();
            let Some((_, record)) = state
                .modules
                .iter_mut()
                .find(|(mid, record)| mid == id && !record.loaded)
            else {
                return false;
            };
            record.loaded = true;
            record.exports.clone()
        };
        self.fire_hooks(id, &exports);
        true
    }

    /// Stage modules that become requirable once chunk `chunk` is loaded.
    pub fn stage_chunk(&self, chunk: impl Into<ModuleId>, modules: Vec<(ModuleId, Value)>) {
        self.state
            .lock()
            .staged
            .entry(chunk.into())
            .or_default()
            .extend(modules);
    }

    /// Make loading of `chunk` fail.
    pub fn set_fail_chunk(&self, chunk: impl Into<ModuleId>) {
        self.state.lock().failing.insert(chunk.into());
    }

    /// Recorded loader calls.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// True if `call` was recorded.
    pub fn calls_contains(&self, call: &str) -> bool {
        self.calls.lock().iter().any(|c| c == call)
    }

    /// Number of installed registration hooks.
    pub fn hook_count(&self) -> usize {
        self.hooks.lock().len()
    }

    /// Invoke registration hooks with no locks held.
    fn fire_hooks(&self, id: &ModuleId, exports: &Value) {
        let hooks = self.hooks.lock().clone();
        for hook in hooks {
            hook(id, exports);
        }
    }

    /// Record a call.
    fn note(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl Loader for MemoryLoader {
    fn modules(&self) -> Vec<(ModuleId, ModuleRecord)> {
        self.state.lock().modules.clone()
    }

    fn factory_ids(&self) -> Vec<ModuleId> {
        self.state
            .lock()
            .factories
            .iter()
            .map(|f| f.id.clone())
            .collect()
    }

    fn factory(&self, id: &ModuleId) -> Option<Factory> {
        self.state
            .lock()
            .factories
            .iter()
            .find(|f| &f.id == id)
            .cloned()
    }

    async fn load_chunk(&self, id: &ModuleId) -> Result<()> {
        self.note(format!("load_chunk:{id}"));
        let mut state = self.state.lock();
        if state.failing.contains(id) {
            return Err(Error::ChunkLoad {
                id: id.clone(),
                message: "chunk request failed".to_string(),
            });
        }
        if let Some(modules) = state.staged.remove(id) {
            state.available.extend(modules);
        }
        Ok(())
    }

    fn require(&self, id: &ModuleId) -> Option<Value> {
        self.note(format!("require:{id}"));
        let pending = {
            let mut state = self.state.lock();
            if let Some((_, record)) = state.modules.iter().find(|(mid, _)| mid == id) {
                return Some(record.exports.clone());
            }
            state.available.remove(id)
        };
        let exports = pending?;
        self.register(id.clone(), exports.clone());
        Some(exports)
    }

    fn on_module_registered(&self, hook: RegistrationHook) {
        self.hooks.lock().push(hook);
    }
}
