use logging::capture::capture_scope;
use modscan::{
    CodeFilter, DiscoveryConfig, Error, Filter, ModuleId, SearchKind, Value,
    test_support::discovery_with,
};
use regex::Regex;
use tracing::Level;

#[test]
fn search_requires_every_filter() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
    loader.define_factory(1u64, "function(e){e.Foo=1;e.Bar=2}");
    loader.define_factory(2u64, "function(e){e.Foo=1}");
    loader.define_factory(3u64, "function(e){e.Bar=2;e.Baz=3}");

    let found = discovery
        .search(&[CodeFilter::from("Foo"), CodeFilter::from("Bar")])
        .expect("search");
    assert_eq!(found.keys().cloned().collect::<Vec<_>>(), vec![ModuleId::Num(1)]);

    let pattern = Regex::new(r"Ba[rz]=\d;e\.Baz").expect("regex");
    let found = discovery.search(&[CodeFilter::from(pattern)]).expect("search");
    assert_eq!(found.keys().cloned().collect::<Vec<_>>(), vec![ModuleId::Num(3)]);

    let err = discovery.search(&[]).expect_err("no filters");
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn find_module_id_returns_first_factory() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
    loader.define_factory(10u64, "function(){return \"Bar\"}");
    loader.define_factory(11u64, "function(){return \"Bar\"}");

    assert_eq!(discovery.find_module_id(&["Bar"]).expect("id"), Some(ModuleId::Num(10)));
    let factory = discovery
        .find_module_factory(&["Bar", "return"])
        .expect("factory")
        .expect("hit");
    assert_eq!(factory.id, ModuleId::Num(10));

    let err = discovery.find_module_id(&["Nope"]).expect_err("strict miss");
    assert!(matches!(err, Error::NotFound { operation: "findModuleId", .. }));
    let empty: [&str; 0] = [];
    assert!(matches!(
        discovery.find_module_id(&empty),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn extract_returns_a_detached_copy() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::resilient());
    loader.define_factory(77u64, "function(e,t){t.x=1}");

    let text = discovery.extract(&ModuleId::Num(77)).expect("factory");
    assert!(text.starts_with("// [EXTRACTED] Module 77"));
    assert!(text.contains("0,function(e,t){t.x=1}"));
    assert!(discovery.extract(&ModuleId::Num(78)).is_none());
}

#[test]
fn map_mangled_module_names_exports() {
    let (_guard, logs) = capture_scope();
    let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
    loader.define_factory(5u64, "function(e,t,n){n.d(t,{Z:()=>a,q:()=>o});\"modal-root\"}");
    let close = Value::function("a", "function a(){closeModal()}");
    let open = Value::function("o", "function o(e){openModal(e)}");
    loader.register(
        5u64,
        Value::object([("Z", close.clone()), ("q", open.clone()), ("k", Value::from(3))]),
    );

    let mapped = discovery
        .map_mangled_module(
            &["modal-root"],
            &[
                ("openModal", Filter::by_code(["openModal"])),
                ("closeModal", Filter::by_code(["closeModal"])),
                ("resizeModal", Filter::by_code(["resizeModal"])),
            ],
        )
        .expect("mapped");

    assert_eq!(mapped.len(), 2);
    assert!(Value::ptr_eq(&mapped["openModal"], &open));
    assert!(Value::ptr_eq(&mapped["closeModal"], &close));
    assert!(logs.contains(Level::WARN, "resizeModal"));
    assert_eq!(discovery.history()[0].kind, SearchKind::MapMangledModule);
}

#[test]
fn map_mangled_module_miss_follows_strictness() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::resilient());
    loader.define_factory(5u64, "function(){\"unrelated\"}");
    let mapped = discovery
        .map_mangled_module(&["modal-root"], &[("open", Filter::by_code(["open"]))])
        .expect("resilient");
    assert!(mapped.is_empty());

    let (_loader, discovery) = discovery_with(DiscoveryConfig::strict());
    assert!(
        discovery
            .map_mangled_module(&["modal-root"], &[("open", Filter::by_code(["open"]))])
            .is_err()
    );
}

#[test]
fn lazy_mangled_module_maps_on_first_access() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::resilient());
    let lazy = discovery.map_mangled_module_lazy(
        &["modal-root"],
        vec![("openModal".to_string(), Filter::by_code(["openModal"]))],
    );
    assert!(loader.calls().is_empty());
    assert!(lazy.get().expect("resilient").is_empty());
    assert!(!lazy.is_resolved());

    loader.define_factory(5u64, "function(e,t,n){n.d(t,{q:()=>o});\"modal-root\"}");
    let open = Value::function("o", "function o(e){openModal(e)}");
    loader.register(5u64, Value::object([("q", open.clone())]));

    assert!(Value::ptr_eq(&lazy.member("openModal").expect("mapped"), &open));
    assert!(lazy.is_resolved());
    assert!(lazy.member("closeModal").expect("mapped").is_undefined());
    assert_eq!(loader.calls().len(), 1);
}

#[test]
fn lazy_mangled_module_reports_misses_when_accessed() {
    let (_loader, discovery) = discovery_with(DiscoveryConfig::strict());
    let lazy = discovery.map_mangled_module_lazy(
        &["modal-root"],
        vec![("open".to_string(), Filter::by_code(["open"]))],
    );
    assert_eq!(discovery.history()[0].kind, SearchKind::MapMangledModule);
    assert!(matches!(lazy.get(), Err(Error::NotFound { .. })));
}
