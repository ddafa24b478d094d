//! Append-only record of lazy searches, consumed by external reporting.

use parking_lot::Mutex;

/// Kind of recorded search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchKind {
    /// `find_lazy`.
    Find,
    /// `find_by_props_lazy`.
    FindByProps,
    /// `find_by_code_lazy`.
    FindByCode,
    /// `find_store_lazy`.
    FindStore,
    /// `find_component_lazy`.
    FindComponent,
    /// `find_component_by_code_lazy`.
    FindComponentByCode,
    /// `find_exported_component`.
    FindExportedComponent,
    /// Direct `wait_for` subscription.
    WaitFor,
    /// `extract_and_load_chunks_lazy`.
    ExtractAndLoadChunks,
    /// `map_mangled_module` and its lazy form.
    MapMangledModule,
}

/// A single history entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchRecord {
    /// What kind of search ran.
    pub kind: SearchKind,
    /// Rendered arguments.
    pub args: Vec<String>,
}

/// Search history. Entries are never removed.
#[derive(Debug, Default)]
pub struct SearchHistory {
    /// Recorded entries, oldest first.
    entries: Mutex<Vec<SearchRecord>>,
}

impl SearchHistory {
    /// Append an entry.
    pub fn push(&self, kind: SearchKind, args: Vec<String>) {
        self.entries.lock().push(SearchRecord { kind, args });
    }

    /// Snapshot of all entries.
    pub fn entries(&self) -> Vec<SearchRecord> {
        self.entries.lock().clone()
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
