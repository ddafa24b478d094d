//! Snapshot files: a frozen view of a loader's registries.
//!
//! ```json
//! {
//!   "factories": [{ "id": 100, "source": "function(e,t,n){...}" }],
//!   "modules": [{ "id": 1, "exports": { "Foo": 1 } }],
//!   "chunks": [{ "id": 42, "modules": [{ "id": 42, "exports": { "default": { "$fn": "function(){}" } } }] }]
//! }
//! ```
//!
//! Objects carrying a `$fn` key become functions whose source is that
//! string (named by `$name`, if present). Objects carrying a `$class` key
//! become instances of that class. Remaining keys are properties. Arrays
//! become objects keyed by index with a `length`.

use std::{fs, iter, path::Path};

use modscan::{MemoryLoader, ModuleId, Value};
use serde::Deserialize;
use serde_json::Value as Json;

use crate::error::{Error, Result};

/// Module id as written in a snapshot.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawId {
    /// Numeric id.
    Num(u64),
    /// Named id; all-digit names collapse to numbers.
    Name(String),
}

impl From<RawId> for ModuleId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Num(n) => Self::Num(n),
            RawId::Name(s) => Self::from(s),
        }
    }
}

/// A factory entry.
#[derive(Debug, Deserialize)]
struct RawFactory {
    /// Factory id.
    id: RawId,
    /// Serialized source.
    source: String,
}

/// A module entry.
#[derive(Debug, Deserialize)]
struct RawModule {
    /// Module id.
    id: RawId,
    /// Exports in the encoding described above.
    #[serde(default)]
    exports: Json,
}

/// A lazily loadable chunk.
#[derive(Debug, Deserialize)]
struct RawChunk {
    /// Chunk id as passed to the chunk loader.
    id: RawId,
    /// Modules that become requirable once loaded.
    #[serde(default)]
    modules: Vec<RawModule>,
}

/// Top-level snapshot document.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Snapshot {
    /// Factory sources, in definition order.
    factories: Vec<RawFactory>,
    /// Executed modules, in registration order.
    modules: Vec<RawModule>,
    /// Chunks not yet loaded.
    chunks: Vec<RawChunk>,
}

impl Snapshot {
    /// Read and parse a snapshot file.
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parse snapshot JSON.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Populate `loader` with the snapshot's registries.
    pub fn install(self, loader: &MemoryLoader) {
        for factory in self.factories {
            loader.define_factory(ModuleId::from(factory.id), &factory.source);
        }
        for module in self.modules {
            loader.register(ModuleId::from(module.id), to_value(&module.exports));
        }
        for chunk in self.chunks {
            let modules = chunk
                .modules
                .into_iter()
                .map(|m| (ModuleId::from(m.id), to_value(&m.exports)))
                .collect();
            loader.stage_chunk(ModuleId::from(chunk.id), modules);
        }
    }
}

/// Decode a snapshot-encoded JSON value.
pub fn to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => Value::from(s.as_str()),
        Json::Array(items) => {
            let obj = Value::object(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), to_value(item))),
            );
            obj.set("length", Value::from(items.len() as f64));
            obj
        }
        Json::Object(map) => {
            let target = if let Some(Json::String(source)) = map.get("$fn") {
                let name = map.get("$name").and_then(Json::as_str).unwrap_or("");
                Value::function(name, source)
            } else if let Some(Json::String(class)) = map.get("$class") {
                Value::instance(class, iter::empty::<(String, Value)>())
            } else {
                Value::object(iter::empty::<(String, Value)>())
            };
            for (key, item) in map {
                if !key.starts_with('$') || key == "$$typeof" {
                    target.set(key.as_str(), to_value(item));
                }
            }
            target
        }
    }
}

#[cfg(test)]
mod tests {
    use modscan::Loader;

    use super::*;

    #[test]
    fn decodes_functions_and_instances() {
        let json: Json = serde_json::from_str(
            r#"{"$class":"UserStore","getUser":{"$fn":"function g(){}","$name":"g","cached":true}}"#,
        )
        .unwrap();
        let value = to_value(&json);
        assert_eq!(value.class_name(), Some("UserStore"));
        let getter = value.get("getUser");
        assert_eq!(getter.as_function().map(|f| f.name()), Some("g"));
        assert_eq!(getter.get("cached"), Value::Bool(true));
        assert!(!value.has("$class"));
    }

    #[test]
    fn keeps_component_wrapper_tag() {
        let json: Json =
            serde_json::from_str(r#"{"$$typeof":"react.memo","type":{"$fn":"function A(){}"}}"#)
                .unwrap();
        let value = to_value(&json);
        assert!(value.has("$$typeof"));
        assert!(value.get("type").as_function().is_some());
    }

    #[test]
    fn installs_registries() {
        let snapshot = Snapshot::parse(
            r#"{
                "factories": [{"id": 1, "source": "Foo"}, {"id": "2", "source": "Bar"}],
                "modules": [{"id": "named", "exports": {"Foo": 1}}],
                "chunks": [{"id": 42, "modules": [{"id": 42, "exports": [1, 2]}]}]
            }"#,
        )
        .unwrap();
        let loader = MemoryLoader::new();
        snapshot.install(&loader);

        assert_eq!(loader.factory_ids(), vec![ModuleId::Num(1), ModuleId::Num(2)]);
        let modules = loader.modules();
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].0, ModuleId::from("named"));
        assert!(loader.require(&ModuleId::Num(42)).is_none());
    }
}
