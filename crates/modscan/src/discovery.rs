//! The discovery service.
//!
//! [`Discovery`] owns the subscription registry, the search history and the
//! strictness policy. It is built once over a [`Loader`] (usually through
//! [`crate::ReadinessGate`]) and shared by reference.
//!
//! Misses are reported through one policy: strict mode logs at error level
//! and returns the error unless running under tooling; resilient mode logs a
//! warning and degrades to an absent value. Internal ("indirect") searches
//! made on behalf of a composite operation never report.

use std::{collections::BTreeMap, fmt, future::Future, sync::Arc};

use regex::Regex;
use tokio::sync::oneshot;
use tracing::{debug, error, warn};

use crate::{
    DiscoveryConfig, Error, Result,
    chunks::{self, LazyChunks},
    filter::Filter,
    history::{SearchHistory, SearchKind, SearchRecord},
    ids::ModuleId,
    lazy::{
        ComponentHost, LazyComponent, LazyMangledModule, LazyValue, NoopHost, Transform, identity,
    },
    loader::{Factory, Loader},
    search,
    source::{self, CodeFilter},
    subscribe::{ListenerId, ModuleListener, Subscriptions, WaitCallback},
    value::Value,
};

/// Outcome of [`Discovery::wait_for`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitStatus {
    /// A loaded module already matched; the callback has run.
    Immediate,
    /// The callback runs when a matching module registers.
    Pending,
}

/// Module discovery service over a live loader.
pub struct Discovery {
    /// External loader.
    loader: Arc<dyn Loader>,
    /// Construction parameters.
    config: DiscoveryConfig,
    /// Pending subscriptions, fed by the loader's registration hook.
    subscriptions: Arc<Subscriptions>,
    /// Lazy search history.
    history: SearchHistory,
    /// Compiled default chunk matcher.
    chunk_matcher: Regex,
    /// Provider of the unresolved component placeholder.
    host: Arc<dyn ComponentHost>,
}

impl fmt::Debug for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Discovery")
            .field("config", &self.config)
            .field("pending", &self.subscriptions.pending_len())
            .field("listeners", &self.subscriptions.listener_count())
            .field("history", &self.history.len())
            .finish_non_exhaustive()
    }
}

/// Owned copies of a string list.
fn owned<S: AsRef<str>>(items: &[S]) -> Vec<String> {
    items.iter().map(|s| s.as_ref().to_string()).collect()
}

/// Owned copies of a string list that must not be empty.
fn non_empty<S: AsRef<str>>(operation: &str, items: &[S]) -> Result<Vec<String>> {
    if items.is_empty() {
        return Err(Error::invalid(format!("{operation} needs at least one argument")));
    }
    Ok(owned(items))
}

impl Discovery {
    /// Build the service with the no-op component host.
    pub fn new(loader: Arc<dyn Loader>, config: DiscoveryConfig) -> Result<Arc<Self>> {
        Self::with_host(loader, config, Arc::new(NoopHost))
    }

    /// Build the service and wire it into the loader's registration hook.
    pub fn with_host(
        loader: Arc<dyn Loader>,
        config: DiscoveryConfig,
        host: Arc<dyn ComponentHost>,
    ) -> Result<Arc<Self>> {
        let chunk_matcher = Regex::new(&config.chunk_matcher)?;
        chunks::check_matcher(&chunk_matcher)?;
        let subscriptions = Arc::new(Subscriptions::new());
        let hook_target = subscriptions.clone();
        loader.on_module_registered(Arc::new(move |id: &ModuleId, exports: &Value| {
            hook_target.notify(id, exports);
        }));
        Ok(Arc::new(Self {
            loader,
            config,
            subscriptions,
            history: SearchHistory::default(),
            chunk_matcher,
            host,
        }))
    }

    /// Construction parameters.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// The underlying loader.
    pub fn loader(&self) -> &Arc<dyn Loader> {
        &self.loader
    }

    /// Recorded lazy searches, oldest first.
    pub fn history(&self) -> Vec<SearchRecord> {
        self.history.entries()
    }

    /// Number of subscriptions still waiting for a module.
    pub fn pending_subscriptions(&self) -> usize {
        self.subscriptions.pending_len()
    }

    // ===== Eager search =====

    /// First export matching `filter`.
    pub fn find(&self, filter: &Filter) -> Result<Option<Value>> {
        Ok(self.find_with_id(filter)?.map(|(_, value)| value))
    }

    /// First export matching `filter`, with the id of its module.
    pub fn find_with_id(&self, filter: &Filter) -> Result<Option<(ModuleId, Value)>> {
        let found = search::find(self.loader.as_ref(), filter);
        if found.is_none() {
            self.report_miss(Error::NotFound {
                operation: "find",
                filter: filter.to_string(),
            })?;
        }
        Ok(found)
    }

    /// Every export matching `filter`, in registry order.
    pub fn find_all(&self, filter: &Filter) -> Vec<Value> {
        search::find_all(self.loader.as_ref(), filter)
    }

    /// Resolve several filters in one registry pass. Results align with
    /// `filters`; unmatched slots are `None`.
    pub fn find_bulk(&self, filters: &[Filter]) -> Result<Vec<Option<Value>>> {
        if filters.len() < 2 {
            return Err(Error::invalid("findBulk needs at least two filters"));
        }
        let results = search::find_bulk(self.loader.as_ref(), filters);
        let found = results.iter().filter(|r| r.is_some()).count();
        if found != filters.len() {
            self.report_miss(Error::BulkMismatch {
                found,
                requested: filters.len(),
            })?;
        }
        Ok(results)
    }

    /// First export defining every property in `names`.
    pub fn find_by_props<S: AsRef<str>>(&self, names: &[S]) -> Result<Option<Value>> {
        self.find(&Filter::by_props(non_empty("findByProps", names)?))
    }

    /// First callable export whose source contains every substring.
    pub fn find_by_code<S: AsRef<str>>(&self, code: &[S]) -> Result<Option<Value>> {
        self.find(&Filter::by_code(non_empty("findByCode", code)?))
    }

    /// Store instance with the given constructor name.
    pub fn find_store(&self, name: &str) -> Result<Option<Value>> {
        self.find(&Filter::by_store_name(name))
    }

    /// Component whose (possibly wrapped) source contains every substring.
    pub fn find_component_by_code<S: AsRef<str>>(&self, code: &[S]) -> Result<Option<Value>> {
        self.find(&Filter::by_component_code(non_empty("findComponentByCode", code)?))
    }

    // ===== Subscriptions =====

    /// Run `callback` with the first export matching `filter`: now, if one
    /// is loaded, otherwise when a matching module registers.
    pub fn wait_for<F>(&self, filter: Filter, callback: F) -> WaitStatus
    where
        F: FnOnce(Value, ModuleId) + Send + 'static,
    {
        self.record(SearchKind::WaitFor, vec![filter.to_string()]);
        self.wait_for_inner(filter, Box::new(callback))
    }

    /// Future resolving to the first export matching `filter`.
    ///
    /// The subscription is registered immediately, not on first poll.
    pub fn wait_for_async(
        &self,
        filter: Filter,
    ) -> impl Future<Output = Option<(ModuleId, Value)>> + Send + use<> {
        let (tx, rx) = oneshot::channel();
        self.wait_for_inner(
            filter,
            Box::new(move |value: Value, id: ModuleId| {
                if tx.send((id, value)).is_err() {
                    debug!("wait_for_async receiver dropped");
                }
            }),
        );
        async move { rx.await.ok() }
    }

    /// Add a listener called for every module registered from now on.
    pub fn add_listener(&self, listener: ModuleListener) -> ListenerId {
        self.subscriptions.add_listener(listener)
    }

    /// Remove a listener added with [`Discovery::add_listener`].
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.subscriptions.remove_listener(id)
    }

    // ===== Lazy bindings =====

    /// Deferred value bound to `transform(export)` once `filter` matches.
    pub fn bind_lazy_value(&self, filter: Filter, transform: Transform) -> LazyValue {
        let lazy = LazyValue::new();
        let slot = lazy.slot().clone();
        self.wait_for_inner(
            filter,
            Box::new(move |value: Value, id: ModuleId| {
                if slot.resolve(transform(value)).is_err() {
                    debug!(%id, "lazy value already bound");
                }
            }),
        );
        lazy
    }

    /// Component handle bound to `transform(export)` once `filter` matches.
    pub fn bind_lazy_component(&self, filter: Filter, transform: Transform) -> LazyComponent {
        let lazy = LazyComponent::new(self.host.placeholder(), &filter.to_string());
        let target = lazy.clone();
        self.wait_for_inner(
            filter,
            Box::new(move |value: Value, _: ModuleId| target.bind(transform(value))),
        );
        lazy
    }

    /// Component exported as `names[0]`. Later names are recorded in the
    /// history for diagnostics only.
    pub fn find_exported_component<S: AsRef<str>>(
        &self,
        names: &[S],
        transform: Option<Transform>,
    ) -> Result<LazyComponent> {
        let names = owned(names);
        let Some(export) = names.first().cloned() else {
            return Err(Error::invalid(
                "findExportedComponent needs at least one property name",
            ));
        };
        self.record(SearchKind::FindExportedComponent, names);
        let transform = transform.unwrap_or_else(identity);
        Ok(self.bind_lazy_component(
            Filter::by_props([export.clone()]),
            Arc::new(move |exports: Value| transform(exports.get(&export))),
        ))
    }

    /// Lazy [`Discovery::find`].
    pub fn find_lazy(&self, filter: Filter) -> LazyValue {
        self.record(SearchKind::Find, vec![filter.to_string()]);
        self.bind_lazy_value(filter, identity())
    }

    /// Lazy [`Discovery::find_by_props`].
    pub fn find_by_props_lazy<S: AsRef<str>>(&self, names: &[S]) -> LazyValue {
        self.record(SearchKind::FindByProps, owned(names));
        self.bind_lazy_value(Filter::by_props(owned(names)), identity())
    }

    /// Lazy [`Discovery::find_by_code`].
    pub fn find_by_code_lazy<S: AsRef<str>>(&self, code: &[S]) -> LazyValue {
        self.record(SearchKind::FindByCode, owned(code));
        self.bind_lazy_value(Filter::by_code(owned(code)), identity())
    }

    /// Lazy [`Discovery::find_store`].
    pub fn find_store_lazy(&self, name: &str) -> LazyValue {
        self.record(SearchKind::FindStore, vec![name.to_string()]);
        self.bind_lazy_value(Filter::by_store_name(name), identity())
    }

    /// Lazy component matching `filter`.
    pub fn find_component_lazy(
        &self,
        filter: Filter,
        transform: Option<Transform>,
    ) -> LazyComponent {
        self.record(SearchKind::FindComponent, vec![filter.to_string()]);
        self.bind_lazy_component(filter, transform.unwrap_or_else(identity))
    }

    /// Lazy [`Discovery::find_component_by_code`].
    pub fn find_component_by_code_lazy<S: AsRef<str>>(&self, code: &[S]) -> LazyComponent {
        self.record(SearchKind::FindComponentByCode, owned(code));
        self.bind_lazy_component(Filter::by_component_code(owned(code)), identity())
    }

    // ===== Factory source =====

    /// Id of the first factory whose source contains every substring.
    pub fn find_module_id<S: AsRef<str>>(&self, code: &[S]) -> Result<Option<ModuleId>> {
        self.module_id(&owned(code), false)
    }

    /// Factory of the module found by [`Discovery::find_module_id`].
    pub fn find_module_factory<S: AsRef<str>>(&self, code: &[S]) -> Result<Option<Factory>> {
        Ok(self
            .find_module_id(code)?
            .and_then(|id| self.loader.factory(&id)))
    }

    /// Every factory satisfying all `filters`, keyed by id. Diagnostic only.
    pub fn search(&self, filters: &[CodeFilter]) -> Result<BTreeMap<ModuleId, Factory>> {
        if filters.is_empty() {
            return Err(Error::invalid("search needs at least one filter"));
        }
        Ok(source::search(self.loader.as_ref(), filters))
    }

    /// Detached, annotated copy of a factory's source.
    pub fn extract(&self, id: &ModuleId) -> Option<String> {
        source::extract(self.loader.as_ref(), id)
    }

    /// Locate the factory containing `code`, recover the chunk entry point
    /// with `matcher` (or the configured default), load the chunk and
    /// require the entry module.
    pub async fn extract_and_load_chunks<S: AsRef<str> + Sync>(
        &self,
        code: &[S],
        matcher: Option<&Regex>,
    ) -> Result<Option<Value>> {
        let code = owned(code);
        let matcher = matcher.unwrap_or(&self.chunk_matcher);
        chunks::check_matcher(matcher)?;
        let failure = |reason: String| Error::Extraction {
            filters: source::describe(&code),
            matcher: matcher.as_str().to_string(),
            reason,
        };

        let factory = self
            .module_id(&code, true)?
            .and_then(|id| self.loader.factory(&id));
        let Some(factory) = factory else {
            self.report_miss(failure("owning factory not found".to_string()))?;
            return Ok(None);
        };
        let id = match chunks::entry_point(&factory.source, matcher) {
            Ok(id) => id,
            Err(reason) => {
                self.report_miss(failure(reason))?;
                return Ok(None);
            }
        };

        debug!(%id, factory = %factory.id, "loading chunk entry point");
        self.loader.load_chunk(&id).await?;
        let exports = self.loader.require(&id);
        if exports.is_none() {
            self.report_miss(Error::NotFound {
                operation: "extractAndLoadChunks",
                filter: format!("entry module {id}"),
            })?;
        }
        Ok(exports)
    }

    /// Deferred [`Discovery::extract_and_load_chunks`].
    pub fn extract_and_load_chunks_lazy<S: AsRef<str>>(
        self: &Arc<Self>,
        code: &[S],
        matcher: Option<Regex>,
    ) -> LazyChunks {
        let code = owned(code);
        self.record(SearchKind::ExtractAndLoadChunks, code.clone());
        LazyChunks::new(self.clone(), code, matcher)
    }

    /// Find a module by factory code and give its mangled exports stable
    /// names. Each mapper claims the first export its filter matches.
    pub fn map_mangled_module<S: AsRef<str>>(
        &self,
        code: &[S],
        mappers: &[(&str, Filter)],
    ) -> Result<BTreeMap<String, Value>> {
        let code = owned(code);
        self.record(SearchKind::MapMangledModule, code.clone());
        self.mangled_exports(&code, mappers)
    }

    /// Deferred [`Discovery::map_mangled_module`], evaluated on first access.
    pub fn map_mangled_module_lazy<S: AsRef<str>>(
        self: &Arc<Self>,
        code: &[S],
        mappers: Vec<(String, Filter)>,
    ) -> LazyMangledModule {
        let code = owned(code);
        self.record(SearchKind::MapMangledModule, code.clone());
        LazyMangledModule::new(self.clone(), code, mappers)
    }

    /// Mapping step shared by the eager and lazy forms. Does not record history.
    pub(crate) fn mangled_exports(
        &self,
        code: &[String],
        mappers: &[(&str, Filter)],
    ) -> Result<BTreeMap<String, Value>> {
        let mut mapped = BTreeMap::new();
        let Some(id) = self.module_id(code, false)? else {
            return Ok(mapped);
        };
        let Some(exports) = self.loader.require(&id) else {
            self.report_miss(Error::NotFound {
                operation: "mapMangledModule",
                filter: format!("exports of module {id}"),
            })?;
            return Ok(mapped);
        };
        for (_, member) in exports.own_props() {
            for (name, filter) in mappers {
                if !mapped.contains_key(*name) && filter.matches(&member) {
                    mapped.insert((*name).to_string(), member.clone());
                }
            }
        }
        let missing: Vec<&str> = mappers
            .iter()
            .map(|(name, _)| *name)
            .filter(|name| !mapped.contains_key(*name))
            .collect();
        if !missing.is_empty() {
            warn!(%id, ?missing, "mapMangledModule: unmapped exports");
        }
        Ok(mapped)
    }

    // ===== Internals =====

    /// Subscribe, then scan the loaded modules. A hit withdraws the
    /// subscription and runs the callback here; whichever side removes the
    /// subscription first owns the callback.
    fn wait_for_inner(&self, filter: Filter, callback: WaitCallback) -> WaitStatus {
        let fid = filter.id();
        let probe = filter.clone();
        self.subscriptions.subscribe(filter, callback);
        if let Some((id, value)) = search::find(self.loader.as_ref(), &probe) {
            if let Some(callback) = self.subscriptions.take(fid) {
                callback(value, id);
            }
            return WaitStatus::Immediate;
        }
        WaitStatus::Pending
    }

    /// Source-code id lookup with optional reporting.
    fn module_id(&self, code: &[String], indirect: bool) -> Result<Option<ModuleId>> {
        if code.is_empty() {
            return Err(Error::invalid("findModuleId needs at least one substring"));
        }
        let found = source::find_module_id(self.loader.as_ref(), code);
        if found.is_none() && !indirect {
            self.report_miss(Error::NotFound {
                operation: "findModuleId",
                filter: source::describe(code),
            })?;
        }
        Ok(found)
    }

    /// Apply the strictness policy to a miss.
    fn report_miss(&self, err: Error) -> Result<()> {
        if self.config.is_strict() {
            error!("{err}");
            if !self.config.tooling {
                return Err(err);
            }
        } else {
            warn!("{err}");
        }
        Ok(())
    }

    /// Append to the history when enabled.
    fn record(&self, kind: SearchKind, args: Vec<String>) {
        if self.config.records_history() {
            self.history.push(kind, args);
        }
    }
}
