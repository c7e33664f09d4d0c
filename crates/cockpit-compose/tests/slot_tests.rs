//! Extension slot tests

use cockpit_compose::{CompositionError, DataSharing, ExtensionSlot};
use cockpit_datadepend::{DataDependError, DataNode, Datum};
use cockpit_test_utils::{flagged_view, registry_with, view, DatumLog, RecordingRenderer, RenderEvent};
use cockpit_views::{ViewContext, ViewRegistry};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

const EP: &str = "cockpit.processInstance.runtime.tab";

fn two_views() -> Arc<ViewRegistry> {
    Arc::new(registry_with([view(EP, "a", 5), view(EP, "b", 10)]))
}

fn admin_registry() -> Arc<ViewRegistry> {
    Arc::new(registry_with([
        flagged_view(EP, "admin", 20, "admin"),
        view(EP, "public", 0),
    ]))
}

fn admin(on: bool) -> ViewContext {
    ViewContext::new().with("admin", on)
}

#[test]
fn test_mount_follows_query_order() {
    let page = DataNode::root();
    let mut renderer = RecordingRenderer::new();

    let slot = ExtensionSlot::mount(
        two_views(),
        EP,
        &page,
        ViewContext::new(),
        DataSharing::Isolated,
        &mut renderer,
    )
    .unwrap();

    assert_eq!(renderer.displayed(), vec!["b", "a"]);
    assert_eq!(
        slot.views().map(|v| v.id()).collect::<Vec<_>>(),
        vec!["b", "a"]
    );
    assert!(matches!(
        renderer.events()[0],
        RenderEvent::Mounted { ref view, position: 0, .. } if view == "b"
    ));
    assert_eq!(slot.len(), 2);
}

#[test]
fn test_isolated_regions_inherit_but_do_not_share() {
    let page = DataNode::root();
    page.set("processDefinition", json!({"key": "invoice"})).unwrap();
    let mut renderer = RecordingRenderer::new();

    let slot = ExtensionSlot::mount(
        two_views(),
        EP,
        &page,
        ViewContext::new(),
        DataSharing::Isolated,
        &mut renderer,
    )
    .unwrap();

    let a = slot.data("a").unwrap();
    let b = slot.data("b").unwrap();
    assert_ne!(a.id(), b.id());

    a.set("selection", json!("act_1")).unwrap();
    assert_eq!(b.get("selection").unwrap(), Datum::Undefined);
    assert_eq!(page.get("selection").unwrap(), Datum::Undefined);
    assert_eq!(
        b.get("processDefinition").unwrap(),
        Datum::Resolved(json!({"key": "invoice"}))
    );
}

#[test]
fn test_shared_regions_use_one_node() {
    let page = DataNode::root();
    let mut renderer = RecordingRenderer::new();

    let slot = ExtensionSlot::mount(
        two_views(),
        EP,
        &page,
        ViewContext::new(),
        DataSharing::Shared,
        &mut renderer,
    )
    .unwrap();

    let a = slot.data("a").unwrap();
    let b = slot.data("b").unwrap();
    assert_eq!(a.id(), b.id());
    assert_eq!(a.id(), slot.node().id());

    a.set("filter", json!({"active": true})).unwrap();
    assert_eq!(
        b.get("filter").unwrap(),
        Datum::Resolved(json!({"active": true}))
    );
}

#[test]
fn test_refresh_mounts_and_unmounts_on_predicate_change() {
    let page = DataNode::root();
    let mut renderer = RecordingRenderer::new();

    let mut slot = ExtensionSlot::mount(
        admin_registry(),
        EP,
        &page,
        admin(false),
        DataSharing::Isolated,
        &mut renderer,
    )
    .unwrap();
    assert_eq!(renderer.displayed(), vec!["public"]);
    let public = slot.handle("public").unwrap();

    slot.refresh(admin(true), &mut renderer).unwrap();
    assert_eq!(renderer.displayed(), vec!["admin", "public"]);
    assert_eq!(slot.views().map(|v| v.id()).collect::<Vec<_>>(), vec!["admin", "public"]);
    // untouched regions keep their output
    assert_eq!(slot.handle("public"), Some(public));

    renderer.take_events();
    slot.refresh(admin(false), &mut renderer).unwrap();
    assert_eq!(renderer.displayed(), vec!["public"]);
    assert!(matches!(
        renderer.events(),
        [RenderEvent::Unmounted { view, data_disposed: true, .. }] if view == "admin"
    ));
    assert!(slot.data("admin").is_none());
}

#[test]
fn test_unmount_disposes_data_before_output_in_order() {
    let page = DataNode::root();
    let mut renderer = RecordingRenderer::new();
    let slot = ExtensionSlot::mount(
        two_views(),
        EP,
        &page,
        ViewContext::new(),
        DataSharing::Isolated,
        &mut renderer,
    )
    .unwrap();

    renderer.take_events();
    slot.unmount(&mut renderer);

    assert_eq!(renderer.unmounted(), vec!["b", "a"]);
    assert!(renderer.events().iter().all(|e| matches!(
        e,
        RenderEvent::Unmounted { data_disposed: true, .. }
    )));
    assert!(renderer.displayed().is_empty());
    assert!(!page.is_disposed());
}

#[test]
fn test_shared_unmount_disposes_node_first() {
    let page = DataNode::root();
    let mut renderer = RecordingRenderer::new();
    let slot = ExtensionSlot::mount(
        two_views(),
        EP,
        &page,
        ViewContext::new(),
        DataSharing::Shared,
        &mut renderer,
    )
    .unwrap();

    renderer.take_events();
    slot.unmount(&mut renderer);

    assert_eq!(renderer.unmounted(), vec!["b", "a"]);
    assert!(renderer.events().iter().all(|e| matches!(
        e,
        RenderEvent::Unmounted { data_disposed: true, .. }
    )));
}

#[test]
fn test_unmounted_region_stops_receiving_values() {
    let page = DataNode::root();
    page.set("count", json!(1)).unwrap();
    let mut renderer = RecordingRenderer::new();
    let slot = ExtensionSlot::mount(
        two_views(),
        EP,
        &page,
        ViewContext::new(),
        DataSharing::Isolated,
        &mut renderer,
    )
    .unwrap();

    let log = DatumLog::new();
    let _sub = slot.data("a").unwrap().observe("count", log.observer()).unwrap();
    assert_eq!(log.values(), vec![json!(1)]);

    slot.unmount(&mut renderer);
    page.set("count", json!(2)).unwrap();

    assert_eq!(log.values(), vec![json!(1)]);
}

#[test]
fn test_failed_mount_rolls_back() {
    let page = DataNode::root();
    let mut renderer = RecordingRenderer::new().fail_on("a");

    let err = ExtensionSlot::mount(
        two_views(),
        EP,
        &page,
        ViewContext::new(),
        DataSharing::Isolated,
        &mut renderer,
    )
    .unwrap_err();

    assert!(matches!(err, CompositionError::Render(ref e) if e.view == "a"));
    assert!(renderer.displayed().is_empty());
    assert_eq!(renderer.unmounted(), vec!["b"]);
    assert!(!page.is_disposed());
}

#[test]
fn test_refresh_skips_failing_view_and_retries() {
    let page = DataNode::root();
    let mut renderer = RecordingRenderer::new().fail_on("admin");
    let mut slot = ExtensionSlot::mount(
        admin_registry(),
        EP,
        &page,
        admin(false),
        DataSharing::Isolated,
        &mut renderer,
    )
    .unwrap();

    let err = slot.refresh(admin(true), &mut renderer).unwrap_err();
    assert!(matches!(err, CompositionError::Render(_)));
    assert_eq!(renderer.displayed(), vec!["public"]);
    assert_eq!(slot.len(), 1);

    renderer.accept("admin");
    slot.refresh(admin(true), &mut renderer).unwrap();
    assert_eq!(renderer.displayed(), vec!["admin", "public"]);
}

#[test]
fn test_mount_on_disposed_parent_fails() {
    let page = DataNode::root();
    let region = page.create_child().unwrap();
    let id = region.id();
    drop(page);

    let mut renderer = RecordingRenderer::new();
    let err = ExtensionSlot::mount(
        two_views(),
        EP,
        &region,
        ViewContext::new(),
        DataSharing::Isolated,
        &mut renderer,
    )
    .unwrap_err();

    assert_eq!(err, CompositionError::Data(DataDependError::Disposed { node: id }));
    assert!(renderer.events().is_empty());
}

#[test]
fn test_empty_extension_point_mounts_nothing() {
    let page = DataNode::root();
    let mut renderer = RecordingRenderer::new();
    let slot = ExtensionSlot::mount(
        Arc::new(ViewRegistry::new()),
        "cockpit.nothing",
        &page,
        ViewContext::new(),
        DataSharing::default(),
        &mut renderer,
    )
    .unwrap();

    assert!(slot.is_empty());
    assert_eq!(slot.sharing(), DataSharing::Isolated);
    slot.unmount(&mut renderer);
    assert!(renderer.events().is_empty());
}
