use std::sync::Arc;

use logging::capture::capture_scope;
use modscan::{
    DiscoveryConfig, Error, Filter, ModuleId, Value,
    test_support::{discovery_with, run_async_test},
};
use parking_lot::Mutex;
use regex::Regex;
use tracing::Level;

const OWNER: &str = r#"function(e,t,n){n.d(t,{Z:()=>s});let s=()=>n.el("42").then(n.bind(n,"42"))}"#;

fn settings_panel() -> Value {
    Value::object([("SettingsPanel", Value::function("S", "function S(){}"))])
}

#[test]
fn loads_chunk_and_requires_entry_point() {
    run_async_test(async {
        let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
        loader.define_factory(100u64, OWNER);
        let panel = settings_panel();
        loader.stage_chunk(42u64, vec![(ModuleId::Num(42), panel.clone())]);

        let seen = Arc::new(Mutex::new(None));
        let s = seen.clone();
        discovery.wait_for(Filter::by_props(["SettingsPanel"]), move |_, id| {
            *s.lock() = Some(id);
        });

        let exports = discovery
            .extract_and_load_chunks(&[r#"n.el("42")"#], None)
            .await
            .expect("load")
            .expect("exports");
        assert!(Value::ptr_eq(&exports, &panel));
        assert!(loader.calls_contains("load_chunk:42"));
        assert!(loader.calls_contains("require:42"));
        assert_eq!(*seen.lock(), Some(ModuleId::Num(42)));
    });
}

#[test]
fn custom_matcher_overrides_default() {
    run_async_test(async {
        let (loader, discovery) = discovery_with(DiscoveryConfig::resilient());
        loader.define_factory(1u64, "function(){return load(\"7\", 31337)}");
        loader.stage_chunk(31337u64, vec![(ModuleId::Num(31337), settings_panel())]);

        let matcher = Regex::new(r#"load\("\d+", (\d+)\)"#).expect("regex");
        let exports = discovery
            .extract_and_load_chunks(&["return load"], Some(&matcher))
            .await
            .expect("load");
        assert!(exports.is_some());
        assert!(loader.calls_contains("load_chunk:31337"));

        let no_group = Regex::new("load").expect("regex");
        let err = discovery
            .extract_and_load_chunks(&["return load"], Some(&no_group))
            .await
            .expect_err("no group");
        assert!(matches!(err, Error::InvalidArgument(_)));
    });
}

#[test]
fn unmatched_source_follows_strictness() {
    run_async_test(async {
        let (_guard, logs) = capture_scope();
        let (loader, discovery) = discovery_with(DiscoveryConfig::resilient());
        loader.define_factory(1u64, "function(){return 1}");

        let out = discovery
            .extract_and_load_chunks(&["return 1"], None)
            .await
            .expect("resilient");
        assert!(out.is_none());
        assert!(logs.contains(Level::WARN, "matcher did not match"));
        assert!(loader.calls().is_empty());

        let out = discovery
            .extract_and_load_chunks(&["absent"], None)
            .await
            .expect("resilient");
        assert!(out.is_none());
        assert!(logs.contains(Level::WARN, "owning factory not found"));

        let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
        loader.define_factory(1u64, r#"n.el("1").then(n.bind(n,"abc"))"#);
        let err = discovery
            .extract_and_load_chunks(&["n.el"], None)
            .await
            .expect_err("strict");
        assert!(matches!(err, Error::Extraction { .. }));
        assert!(err.to_string().contains("not numeric"));
    });
}

#[test]
fn chunk_load_failure_propagates() {
    run_async_test(async {
        let (loader, discovery) = discovery_with(DiscoveryConfig::resilient());
        loader.define_factory(100u64, OWNER);
        loader.set_fail_chunk(42u64);

        let err = discovery
            .extract_and_load_chunks(&[r#"n.el("42")"#], None)
            .await
            .expect_err("load failure");
        assert!(matches!(err, Error::ChunkLoad { .. }));
        assert!(!loader.calls_contains("require:42"));
    });
}

#[test]
fn lazy_chunks_rerun_on_each_load() {
    run_async_test(async {
        let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
        loader.define_factory(100u64, OWNER);
        loader.stage_chunk(42u64, vec![(ModuleId::Num(42), settings_panel())]);

        let lazy = discovery.extract_and_load_chunks_lazy(&[r#"n.el("42")"#], None);
        assert!(loader.calls().is_empty());

        let first = lazy.load().await.expect("first").expect("exports");
        let second = lazy.load().await.expect("second").expect("exports");
        assert!(Value::ptr_eq(&first, &second));
        let loads = loader.calls().iter().filter(|c| *c == "load_chunk:42").count();
        assert_eq!(loads, 2);
    });
}
