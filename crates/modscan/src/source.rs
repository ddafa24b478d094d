//! Searches over serialized factory source rather than live exports.

use std::{collections::BTreeMap, fmt};

use regex::Regex;

use crate::{
    ids::ModuleId,
    loader::{Factory, Loader},
};

/// A text test applied to factory source.
#[derive(Clone, Debug)]
pub enum CodeFilter {
    /// Substring containment.
    Text(String),
    /// Regular expression search.
    Pattern(Regex),
}

impl CodeFilter {
    /// True if `source` satisfies this filter.
    #[must_use]
    pub fn matches(&self, source: &str) -> bool {
        match self {
            Self::Text(text) => source.contains(text.as_str()),
            Self::Pattern(re) => re.is_match(source),
        }
    }
}

impl fmt::Display for CodeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "{text:?}"),
            Self::Pattern(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

impl From<&str> for CodeFilter {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CodeFilter {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Regex> for CodeFilter {
    fn from(value: Regex) -> Self {
        Self::Pattern(value)
    }
}

/// Id of the first factory whose source contains every substring in `code`.
pub fn find_module_id(loader: &dyn Loader, code: &[String]) -> Option<ModuleId> {
    loader.factory_ids().into_iter().find(|id| {
        loader
            .factory(id)
            .is_some_and(|f| code.iter().all(|c| f.source.contains(c.as_str())))
    })
}

/// Every factory satisfying all `filters`, keyed by id.
pub fn search(loader: &dyn Loader, filters: &[CodeFilter]) -> BTreeMap<ModuleId, Factory> {
    loader
        .factory_ids()
        .into_iter()
        .filter_map(|id| loader.factory(&id).map(|f| (id, f)))
        .filter(|(_, f)| filters.iter().all(|flt| flt.matches(&f.source)))
        .collect()
}

/// Standalone, annotated copy of a factory's source.
///
/// The returned text is detached from the loader; editing or instrumenting
/// it has no effect on the running module.
pub fn extract(loader: &dyn Loader, id: &ModuleId) -> Option<String> {
    let factory = loader.factory(id)?;
    Some(format!(
        "// [EXTRACTED] Module {id}\n\
         // This is a detached copy of the factory source. It is NOT the live module.\n\
         \n\
         0,{source}\n\
         //# sourceURL=ExtractedModule{id}\n",
        source = factory.source
    ))
}

/// Render substrings for diagnostics.
pub fn describe(code: &[String]) -> String {
    format!("{code:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;

    #[test]
    fn code_filters_mix_text_and_patterns() {
        let loader = MemoryLoader::new();
        loader.define_factory(1u64, "const Foo=1;Bar()");
        loader.define_factory(2u64, "Baz");
        let filters = [
            CodeFilter::from("Foo"),
            CodeFilter::from(Regex::new("Bar").unwrap()),
        ];
        let found = search(&loader, &filters);
        assert_eq!(found.len(), 1);
        assert_eq!(&*found[&ModuleId::Num(1)].source, "const Foo=1;Bar()");
    }

    #[test]
    fn extract_is_annotated_copy() {
        let loader = MemoryLoader::new();
        loader.define_factory(9u64, "function(e,t,n){n.d(t,{})}");
        let text = extract(&loader, &ModuleId::Num(9)).unwrap();
        assert!(text.contains("0,function(e,t,n){n.d(t,{})}"));
        assert!(text.contains("sourceURL=ExtractedModule9"));
        assert!(extract(&loader, &ModuleId::Num(10)).is_none());
    }
}
