use logging::capture::capture_scope;
use modscan::{
    DiscoveryConfig, Error, Filter, ModuleId, Value,
    test_support::discovery_with,
};
use tracing::Level;

fn foo_module() -> Value {
    Value::object([("Foo", Value::from(1))])
}

#[test]
fn strict_miss_on_empty_registry_is_an_error() {
    let (_guard, logs) = capture_scope();
    let (_loader, discovery) = discovery_with(DiscoveryConfig::strict());

    let err = discovery
        .find(&Filter::by_props(["Foo"]))
        .expect_err("strict miss");
    assert!(matches!(err, Error::NotFound { operation: "find", .. }));
    assert!(logs.contains(Level::ERROR, "byProps"));
}

#[test]
fn tooling_logs_strict_misses_without_failing() {
    let (_guard, logs) = capture_scope();
    let config = DiscoveryConfig {
        tooling: true,
        ..DiscoveryConfig::strict()
    };
    let (_loader, discovery) = discovery_with(config);

    assert_eq!(discovery.find(&Filter::by_props(["Foo"])).expect("tooling"), None);
    assert_eq!(logs.at(Level::ERROR).len(), 1);
}

#[test]
fn resilient_miss_warns_and_returns_none() {
    let (_guard, logs) = capture_scope();
    let (_loader, discovery) = discovery_with(DiscoveryConfig::resilient());

    assert_eq!(discovery.find_by_props(&["Foo"]).expect("resilient"), None);
    assert!(logs.contains(Level::WARN, "Foo"));
    assert!(logs.at(Level::ERROR).is_empty());
}

#[test]
fn find_returns_the_exports_object() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
    let module = foo_module();
    loader.register(1u64, module.clone());

    let found = discovery.find_by_props(&["Foo"]).expect("find").expect("hit");
    assert!(Value::ptr_eq(&found, &module));

    let (id, again) = discovery
        .find_with_id(&Filter::by_props(["Foo"]))
        .expect("find")
        .expect("hit");
    assert_eq!(id.as_num(), Some(1));
    assert!(Value::ptr_eq(&again, &found));
}

#[test]
fn default_export_is_checked_after_exports() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
    let inner = Value::object([("Inner", Value::from(true))]);
    loader.register(3u64, Value::object([("default", inner.clone())]));

    let found = discovery.find_by_props(&["Inner"]).expect("find").expect("hit");
    assert!(Value::ptr_eq(&found, &inner));
}

#[test]
fn falsy_exports_are_skipped() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::resilient());
    loader.register(1u64, Value::Null);
    loader.register(2u64, Value::from(0));
    loader.register(3u64, foo_module());

    let (id, _) = discovery
        .find_with_id(&Filter::custom("anything", |_| true))
        .expect("find")
        .expect("hit");
    assert_eq!(id.as_num(), Some(3));
}

#[test]
fn find_all_keeps_registry_order_and_defaults() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
    let a = foo_module();
    let b = Value::object([("Foo", Value::from(2))]);
    let c = Value::object([("default", Value::object([("Foo", Value::from(3))]))]);
    loader.register(1u64, a.clone());
    loader.register(2u64, Value::object([("Bar", Value::from(1))]));
    loader.register(3u64, b.clone());
    loader.register(4u64, c.clone());

    let found = discovery.find_all(&Filter::by_props(["Foo"]));
    assert_eq!(found.len(), 3);
    assert!(Value::ptr_eq(&found[0], &a));
    assert!(Value::ptr_eq(&found[1], &b));
    assert!(Value::ptr_eq(&found[2], &c.get("default")));
}

#[test]
fn find_bulk_needs_two_filters() {
    let (_loader, discovery) = discovery_with(DiscoveryConfig::resilient());
    let err = discovery
        .find_bulk(&[Filter::by_props(["Foo"])])
        .expect_err("one filter");
    assert!(matches!(err, Error::InvalidArgument(_)));
}

#[test]
fn find_bulk_assigns_each_module_once() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
    let first = Value::object([("Foo", Value::from(1)), ("Bar", Value::from(1))]);
    let second = Value::object([("Bar", Value::from(2))]);
    loader.register(1u64, first.clone());
    loader.register(2u64, second.clone());

    let found = discovery
        .find_bulk(&[Filter::by_props(["Foo"]), Filter::by_props(["Bar"])])
        .expect("bulk");
    assert!(Value::ptr_eq(found[0].as_ref().expect("foo"), &first));
    assert!(Value::ptr_eq(found[1].as_ref().expect("bar"), &second));
}

#[test]
fn find_bulk_partial_results_depend_on_strictness() {
    let filters = || vec![Filter::by_props(["Foo"]), Filter::by_props(["Missing"])];

    let (_guard, logs) = capture_scope();
    let (loader, discovery) = discovery_with(DiscoveryConfig::resilient());
    loader.register(1u64, foo_module());
    let found = discovery.find_bulk(&filters()).expect("resilient");
    assert!(found[0].is_some());
    assert!(found[1].is_none());
    assert!(logs.contains(Level::WARN, "1 of 2"));

    let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
    loader.register(1u64, foo_module());
    let err = discovery.find_bulk(&filters()).expect_err("strict");
    assert!(matches!(err, Error::BulkMismatch { found: 1, requested: 2 }));
}

#[test]
fn code_and_store_helpers() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
    let helper = Value::function("e", "function e(t){return t.isDevtoolsOpen}");
    let store = Value::instance("UserStore", [("getCurrentUser", Value::function("g", "g(){}"))]);
    let memo = Value::object([
        ("$$typeof", Value::from("react.memo")),
        (
            "type",
            Value::function("Avatar", "function Avatar(e){return e.avatarSrc}"),
        ),
    ]);
    loader.register(1u64, Value::object([("default", helper.clone())]));
    loader.register(2u64, store.clone());
    loader.register(3u64, memo.clone());

    let found = discovery.find_by_code(&["isDevtoolsOpen"]).expect("code");
    assert!(Value::ptr_eq(&found.expect("helper"), &helper));
    let found = discovery.find_store("UserStore").expect("store");
    assert!(Value::ptr_eq(&found.expect("store"), &store));
    let found = discovery.find_component_by_code(&["avatarSrc"]).expect("component");
    assert!(Value::ptr_eq(&found.expect("memo"), &memo));
}

#[test]
fn repeated_finds_are_idempotent() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
    loader.register(1u64, foo_module());
    let filter = Filter::by_props(["Foo"]);

    let a = discovery.find(&filter).expect("first").expect("hit");
    let b = discovery.find(&filter).expect("second").expect("hit");
    assert!(Value::ptr_eq(&a, &b));
    assert!(discovery.history().is_empty());
}

#[test]
fn empty_argument_lists_are_invalid_in_any_mode() {
    let (_loader, discovery) = discovery_with(DiscoveryConfig::resilient());
    let none: [&str; 0] = [];
    assert!(matches!(discovery.find_by_props(&none), Err(Error::InvalidArgument(_))));
    assert!(matches!(discovery.find_by_code(&none), Err(Error::InvalidArgument(_))));
    assert!(matches!(
        discovery.find_component_by_code(&none),
        Err(Error::InvalidArgument(_))
    ));
}

#[test]
fn modules_still_executing_are_invisible() {
    let (loader, discovery) = discovery_with(DiscoveryConfig::strict());
    loader.begin_module(1u64, foo_module());
    let filter = Filter::by_props(["Foo"]);

    assert!(matches!(discovery.find(&filter), Err(Error::NotFound { .. })));
    assert!(discovery.find_all(&filter).is_empty());

    assert!(loader.finish_module(&ModuleId::Num(1)));
    assert!(discovery.find(&filter).expect("loaded").is_some());
    assert!(!loader.finish_module(&ModuleId::Num(1)));
}
