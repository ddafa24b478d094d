//! Scans over the live module registry.
//!
//! Each module is tested on its exports first, then on `exports.default`.
//! Modules still executing and modules with falsy exports are skipped.
//! These scans never report; the strictness policy is applied by the caller.

use crate::{filter::Filter, ids::ModuleId, loader::Loader, value::Value};

/// First export matching `filter`, with its module id.
pub fn find(loader: &dyn Loader, filter: &Filter) -> Option<(ModuleId, Value)> {
    for (id, record) in loader.modules() {
        if !record.loaded {
            continue;
        }
        let exports = record.exports;
        if !exports.is_truthy() {
            continue;
        }
        if filter.matches(&exports) {
            return Some((id, exports));
        }
        let default = exports.get("default");
        if default.is_truthy() && filter.matches(&default) {
            return Some((id, default));
        }
    }
    None
}

/// Every export matching `filter`, in registry order. A module may
/// contribute both its exports and its default export.
pub fn find_all(loader: &dyn Loader, filter: &Filter) -> Vec<Value> {
    let mut found = Vec::new();
    for (_, record) in loader.modules() {
        if !record.loaded {
            continue;
        }
        let exports = record.exports;
        if !exports.is_truthy() {
            continue;
        }
        if filter.matches(&exports) {
            found.push(exports.clone());
        }
        let default = exports.get("default");
        if default.is_truthy() && filter.matches(&default) {
            found.push(default);
        }
    }
    found
}

/// Single pass resolving several filters at once.
///
/// Slot `i` holds the first match of `filters[i]`. A module satisfies at
/// most one filter: the first declared pending filter that matches it wins
/// and the remaining filters carry on to later modules. The scan stops as
/// soon as every filter is satisfied.
pub fn find_bulk(loader: &dyn Loader, filters: &[Filter]) -> Vec<Option<Value>> {
    let mut results: Vec<Option<Value>> = vec![None; filters.len()];
    let mut pending: Vec<usize> = (0..filters.len()).collect();

    for (_, record) in loader.modules() {
        if pending.is_empty() {
            break;
        }
        if !record.loaded {
            continue;
        }
        let exports = record.exports;
        if !exports.is_truthy() {
            continue;
        }
        let default = exports.get("default");
        let hit = pending.iter().position(|&slot| {
            let filter = &filters[slot];
            if filter.matches(&exports) {
                results[slot] = Some(exports.clone());
                true
            } else if default.is_truthy() && filter.matches(&default) {
                results[slot] = Some(default.clone());
                true
            } else {
                false
            }
        });
        if let Some(pos) = hit {
            pending = pending
                .iter()
                .enumerate()
                .filter(|&(i, _)| i != pos)
                .map(|(_, &slot)| slot)
                .collect();
        }
    }
    results
}
