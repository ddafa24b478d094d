//! Recovering chunk entry points from factory source.
//!
//! A factory that lazily pulls in another chunk serializes to something like
//! `n.el("123").then(n.bind(n,"456"))`. The matcher's last capture group is
//! the entry-point module id, which must be numeric.

use std::{result, sync::Arc};

use regex::Regex;

use crate::{Discovery, Error, Result, ids::ModuleId, value::Value};

/// Default entry-point pattern.
pub const DEFAULT_CHUNK_MATCHER: &str =
    r#"(?s)(?:\.el\("[^"]*"\)|Promise\.resolve\(\)).*?\.then\([\w$]+\.bind\([\w$]+,\s*"?([^")]+?)"?\)\)"#;

/// Reject matchers without a capture group.
pub fn check_matcher(matcher: &Regex) -> Result<()> {
    if matcher.captures_len() < 2 {
        return Err(Error::invalid(format!(
            "chunk matcher /{}/ has no capture group",
            matcher.as_str()
        )));
    }
    Ok(())
}

/// Apply `matcher` to `source` and parse the captured entry-point id.
pub fn entry_point(source: &str, matcher: &Regex) -> result::Result<ModuleId, String> {
    let caps = matcher
        .captures(source)
        .ok_or_else(|| "matcher did not match factory source".to_string())?;
    let raw = (1..caps.len())
        .rev()
        .find_map(|i| caps.get(i))
        .map(|m| m.as_str())
        .ok_or_else(|| "matcher captured nothing".to_string())?;
    ModuleId::parse_numeric(raw).ok_or_else(|| format!("captured id {raw:?} is not numeric"))
}

/// Deferred [`Discovery::extract_and_load_chunks`] invocation.
///
/// Every call to [`LazyChunks::load`] re-runs the extraction and load; nothing
/// is cached between calls.
#[derive(Clone)]
pub struct LazyChunks {
    /// Service to run against.
    discovery: Arc<Discovery>,
    /// Code locating the owning factory.
    code: Vec<String>,
    /// Matcher override.
    matcher: Option<Regex>,
}

impl LazyChunks {
    /// Bundle the arguments of a later extraction.
    pub(crate) fn new(
        discovery: Arc<Discovery>,
        code: Vec<String>,
        matcher: Option<Regex>,
    ) -> Self {
        Self {
            discovery,
            code,
            matcher,
        }
    }

    /// Run the extraction and load.
    pub async fn load(&self) -> Result<Option<Value>> {
        self.discovery
            .extract_and_load_chunks(&self.code, self.matcher.as_ref())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_matcher() -> Regex {
        Regex::new(DEFAULT_CHUNK_MATCHER).unwrap()
    }

    #[test]
    fn default_matcher_recovers_entry_point() {
        let re = default_matcher();
        let src = r#"function(e,t,n){let o=()=>n.el("42").then(n.bind(n,"42"));return o}"#;
        assert_eq!(entry_point(src, &re), Ok(ModuleId::Num(42)));

        let multi = r#"Promise.all([r.el("7"),r.el("8")]).then(r.bind(r,"1234"))"#;
        assert_eq!(entry_point(multi, &re), Ok(ModuleId::Num(1234)));

        let resolved = r#"Promise.resolve().then(r.bind(r,99))"#;
        assert_eq!(entry_point(resolved, &re), Ok(ModuleId::Num(99)));
    }

    #[test]
    fn non_numeric_capture_is_rejected() {
        let re = default_matcher();
        let src = r#"n.el("42").then(n.bind(n,"abc"))"#;
        assert!(entry_point(src, &re).unwrap_err().contains("not numeric"));
        assert!(entry_point("nothing here", &re).is_err());
    }

    #[test]
    fn matcher_needs_a_group() {
        assert!(check_matcher(&Regex::new("el").unwrap()).is_err());
        assert!(check_matcher(&default_matcher()).is_ok());
    }
}
