//! Pending subscriptions and raw registration listeners.
//!
//! Every module registration is fanned out first to raw listeners, then to
//! pending subscriptions. A subscription whose filter matches the module's
//! exports (or their `default`) is removed under the lock and its callback is
//! invoked afterwards, so it fires exactly once. No lock is held while
//! filters, listeners or callbacks run.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    filter::{Filter, FilterId},
    ids::ModuleId,
    value::Value,
};

/// Callback invoked with the matched value and the id of its module.
pub type WaitCallback = Box<dyn FnOnce(Value, ModuleId) + Send>;

/// Listener invoked for every registered module.
pub type ModuleListener = Arc<dyn Fn(&ModuleId, &Value) + Send + Sync>;

/// Handle used to remove a raw listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// A subscription waiting for a matching module.
struct Pending {
    /// Filter to satisfy.
    filter: Filter,
    /// Callback to run once.
    callback: WaitCallback,
}

/// Subscription and listener registry.
#[derive(Default)]
pub struct Subscriptions {
    /// Pending subscriptions keyed by filter identity.
    pending: Mutex<HashMap<FilterId, Pending>>,
    /// Raw listeners.
    listeners: Mutex<Vec<(ListenerId, ModuleListener)>>,
    /// Next listener id.
    next_listener: AtomicU64,
}

impl Subscriptions {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Park `callback` until a module matching `filter` registers.
    ///
    /// Subscriptions are keyed by filter identity: subscribing the same
    /// filter instance twice replaces the earlier callback.
    pub fn subscribe(&self, filter: Filter, callback: WaitCallback) {
        let id = filter.id();
        let replaced = self
            .pending
            .lock()
            .insert(id, Pending { filter, callback })
            .is_some();
        if replaced {
            debug!(?id, "replaced pending subscription");
        }
    }

    /// Withdraw the pending subscription for `filter`, returning its callback.
    pub fn take(&self, filter: FilterId) -> Option<WaitCallback> {
        self.pending.lock().remove(&filter).map(|p| p.callback)
    }

    /// Add a raw listener.
    pub fn add_listener(&self, listener: ModuleListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, listener));
        id
    }

    /// Remove a raw listener. Returns false if it was not installed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    /// Number of pending subscriptions.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of raw listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Fan a newly registered module out to listeners and subscriptions.
    pub fn notify(&self, id: &ModuleId, exports: &Value) {
        let listeners: Vec<ModuleListener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(id, exports);
        }

        if !exports.is_truthy() {
            return;
        }
        let default = exports.get("default");

        let candidates: Vec<(FilterId, Filter)> = self
            .pending
            .lock()
            .iter()
            .map(|(fid, p)| (*fid, p.filter.clone()))
            .collect();
        let mut matched = Vec::new();
        for (fid, filter) in candidates {
            if filter.matches(exports) {
                matched.push((fid, exports.clone()));
            } else if default.is_truthy() && filter.matches(&default) {
                matched.push((fid, default.clone()));
            }
        }
        if matched.is_empty() {
            return;
        }

        let fired: Vec<(WaitCallback, Value)> = {
            let mut pending = self.pending.lock();
            matched
                .into_iter()
                .filter_map(|(fid, value)| pending.remove(&fid).map(|p| (p.callback, value)))
                .collect()
        };
        trace!(%id, count = fired.len(), "subscriptions satisfied");
        for (callback, value) in fired {
            callback(value, id.clone());
        }
    }
}
