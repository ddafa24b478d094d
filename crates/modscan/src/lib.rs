//! modscan: runtime module discovery over a bundled-module loader.
//!
//! The loader's module graph is unknown ahead of time and grows as chunks
//! load. This crate lets callers name what they want with a [`Filter`]
//! instead of a module id:
//! - [`Discovery::find`] and friends scan the modules loaded so far
//! - [`Discovery::wait_for`] parks a callback until a matching module registers
//! - [`Discovery::bind_lazy_value`] and [`Discovery::bind_lazy_component`]
//!   hand out handles that become the real export once it appears
//! - [`Discovery::search`], [`Discovery::find_module_id`] and
//!   [`Discovery::extract_and_load_chunks`] work on serialized factory source
//!
//! The service is created once, through [`ReadinessGate::initialize`], over
//! any [`Loader`] implementation. [`MemoryLoader`] is an in-memory loader for
//! tests and offline inspection.

mod chunks;
mod config;
mod deferred;
mod discovery;
mod error;
mod filter;
mod gate;
mod history;
mod ids;
mod lazy;
mod loader;
mod search;
mod source;
mod subscribe;
pub mod test_support;
mod value;

pub use chunks::{DEFAULT_CHUNK_MATCHER, LazyChunks};
pub use config::{DiscoveryConfig, Strictness};
pub use deferred::Deferred;
pub use discovery::{Discovery, WaitStatus};
pub use error::{Error, Result};
pub use filter::{Filter, FilterId, FilterKind};
pub use gate::ReadinessGate;
pub use history::{SearchKind, SearchRecord};
pub use ids::ModuleId;
pub use lazy::{
    ComponentHost, Element, LazyComponent, LazyMangledModule, LazyValue, NoopHost, Transform,
    identity,
};
pub use loader::{Factory, Loader, MemoryLoader, ModuleRecord, RegistrationHook};
pub use source::CodeFilter;
pub use subscribe::{ListenerId, ModuleListener, WaitCallback};
pub use value::{Function, Object, Props, Value};
