use std::cell::Cell;
use std::error::Error as _;
use std::rc::Rc;

use super::{Plugin, PluginContext, PluginRegistry};
use crate::terminal::FontMetrics;
use crate::test_support::{MockBackend, MockPlugin};
use crate::widget::WidgetError;

fn registry() -> PluginRegistry<MockBackend> {
    PluginRegistry::new(PluginContext {
        device: Default::default(),
        metrics: FontMetrics::default(),
    })
}

#[test]
fn create_by_plugin_name_uses_first_kind() {
    let mut reg = registry();
    reg.register(Box::new(MockPlugin::new("shapes")));
    let handle = reg.create("shapes", "", "hello").unwrap();
    assert_eq!(handle.borrow().name(), "box");
    assert_eq!(handle.borrow().payload(), "hello");
}

#[test]
fn create_by_plugin_and_kind() {
    let mut reg = registry();
    reg.register(Box::new(MockPlugin::new("shapes")));
    let handle = reg.create("shapes.other", "-x 1", "").unwrap();
    assert_eq!(handle.borrow().name(), "other");
}

#[test]
fn unknown_plugin_is_an_error() {
    let mut reg = registry();
    let err = reg.create("nope", "", "").err().unwrap();
    assert!(matches!(err, WidgetError::UnknownPlugin(ref n) if n == "nope"));
}

#[test]
fn unknown_kind_is_an_error() {
    let mut reg = registry();
    reg.register(Box::new(MockPlugin::new("shapes")));
    assert!(matches!(
        reg.create("shapes.circle", "", ""),
        Err(WidgetError::UnknownWidget { ref kind, .. }) if kind == "circle"
    ));
}

#[test]
fn bad_args_fail_before_plugin_runs() {
    let mut reg = registry();
    let plugin = MockPlugin::new("shapes");
    let tallies = plugin.tallies.clone();
    reg.register(Box::new(plugin));
    assert!(matches!(
        reg.create("shapes", "-w nan", ""),
        Err(WidgetError::InvalidArgument { .. })
    ));
    assert!(tallies.borrow().is_empty());
}

#[test]
fn init_failure_is_reported_as_construction_error() {
    let mut reg = registry();
    let plugin = MockPlugin::new("shapes");
    let tallies = plugin.tallies.clone();
    reg.register(Box::new(plugin));

    let err = reg.create("shapes", "", "fail").err().unwrap();
    assert!(matches!(err, WidgetError::Init { .. }));
    assert!(tallies.borrow()[0].dropped.get());
}

#[test]
fn lazy_plugin_loads_once_on_first_use() {
    let mut reg = registry();
    let loads = Rc::new(Cell::new(0));
    let counter = loads.clone();
    reg.register_lazy("late", move |_ctx| {
        counter.set(counter.get() + 1);
        Ok(Box::new(MockPlugin::new("late")) as Box<dyn Plugin<MockBackend>>)
    });

    assert!(reg.has_plugin("late"));
    assert_eq!(loads.get(), 0);
    reg.create("late", "", "").unwrap();
    reg.create("late.other", "", "").unwrap();
    assert_eq!(loads.get(), 1);
}

#[test]
fn lazy_load_failure_is_cached() {
    let mut reg = registry();
    let loads = Rc::new(Cell::new(0));
    let counter = loads.clone();
    reg.register_lazy("flaky", move |_ctx| {
        counter.set(counter.get() + 1);
        Err(WidgetError::Payload("missing library".to_owned()))
    });

    for _ in 0..2 {
        let err = reg.create("flaky", "", "").err().unwrap();
        assert!(matches!(err, WidgetError::PluginLoad { ref name, .. } if name == "flaky"));
        assert!(err.source().unwrap().to_string().contains("missing library"));
    }
    assert_eq!(loads.get(), 1);
}

#[test]
fn listing_and_metadata() {
    let mut reg = registry();
    reg.register(Box::new(MockPlugin::new("zeta")));
    reg.register(Box::new(MockPlugin::new("alpha")));
    assert_eq!(reg.available_plugins(), vec!["alpha", "zeta"]);
    assert!(!reg.has_plugin("beta"));
    assert_eq!(reg.widget_kinds("alpha").unwrap(), vec!["box", "other"]);
    assert_eq!(reg.meta("zeta").unwrap().version, "0.1.0");
}

#[test]
fn resize_broadcast_and_single_dispose() {
    let mut reg = registry();
    let plugin = MockPlugin::new("shapes");
    let resizes = plugin.resizes.clone();
    let disposes = plugin.disposes.clone();
    reg.register(Box::new(plugin));

    reg.on_terminal_resize(100, 30);
    assert_eq!(resizes.get(), 1);

    reg.dispose();
    reg.dispose();
    drop(reg);
    assert_eq!(disposes.get(), 1);
}

#[test]
fn create_after_dispose_fails() {
    let mut reg = registry();
    reg.register(Box::new(MockPlugin::new("shapes")));
    reg.dispose();
    assert!(matches!(
        reg.create("shapes", "", ""),
        Err(WidgetError::Disposed(_))
    ));
}

#[test]
fn reregistering_disposes_previous_instance() {
    let mut reg = registry();
    let first = MockPlugin::new("shapes");
    let first_disposes = first.disposes.clone();
    reg.register(Box::new(first));
    reg.register(Box::new(MockPlugin::new("shapes")));
    assert_eq!(first_disposes.get(), 1);
}
