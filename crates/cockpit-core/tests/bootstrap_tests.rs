//! Bootstrap tests: configuration files, plugin modules and pages

use cockpit_core::prelude::*;
use cockpit_core::{logging, CockpitError, LogConfig, ManifestPlugin, ViewManifest};
use cockpit_test_utils::RecordingRenderer;
use cockpit_views::{Origin, ViewError};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

const RUNTIME_TAB: &str = "cockpit.processInstance.runtime.tab";
const INSTANCE_PAGE: &str = "cockpit.processInstance.data";

struct ProcessInstancePlugin;

impl PluginModule for ProcessInstancePlugin {
    fn name(&self) -> &str {
        "process-instance"
    }

    fn configure(&self, config: &mut PluginConfigurator) -> Result<(), ViewError> {
        config.register_default_view(
            ViewDescriptor::builder(RUNTIME_TAB, "variables")
                .label("Variables")
                .priority(20)
                .build(),
        )?;
        config.register_default_view(
            ViewDescriptor::builder(RUNTIME_TAB, "incidents")
                .label("Incidents")
                .priority(10)
                .build(),
        )?;
        config.register_data(INSTANCE_PAGE, "instance", |node, ctx| {
            let id = ctx.get("id").cloned().unwrap_or_default();
            node.set("processInstance", json!({ "id": id }))?;
            node.provide("processInstanceId", &["processInstance"], |args| {
                Ok(args.require(0)?["id"].clone())
            })
        });
        Ok(())
    }
}

struct BrokenPlugin;

impl PluginModule for BrokenPlugin {
    fn name(&self) -> &str {
        "broken"
    }

    fn configure(&self, config: &mut PluginConfigurator) -> Result<(), ViewError> {
        config.register_view(ViewDescriptor::builder(RUNTIME_TAB, " ").build())?;
        Ok(())
    }
}

fn write_config(dir: &TempDir, config: &str, manifest: &str) -> std::path::PathBuf {
    fs::create_dir_all(dir.path().join("plugins")).unwrap();
    fs::write(dir.path().join("plugins/extra.toml"), manifest).unwrap();
    let path = dir.path().join("cockpit.toml");
    fs::write(&path, config).unwrap();
    path
}

#[test]
fn test_bootstrap_from_config_file() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
        manifests = ["plugins/extra.toml"]

        [log]
        filter = "debug"

        [[views]]
        extension_point = "cockpit.processInstance.runtime.tab"
        id = "audit"
        label = "Audit (inline)"
        priority = 5
        "#,
        r#"
        name = "extra"

        [[view]]
        extension_point = "cockpit.processInstance.runtime.tab"
        id = "audit"
        label = "Audit"
        priority = 30

        [[view]]
        extension_point = "cockpit.processInstance.runtime.tab"
        id = "incidents"
        label = "Incidents (plugin)"
        priority = 10
        "#,
    );

    let config = CockpitConfig::load(&path).unwrap();
    assert_eq!(config.manifests, vec![dir.path().join("plugins/extra.toml")]);
    assert_eq!(config.log, LogConfig::default().with_filter("debug"));

    let cockpit = Cockpit::bootstrap(config, vec![Box::new(ProcessInstancePlugin)]).unwrap();
    let views = cockpit.describe(RUNTIME_TAB, None);

    // inline views come last and replace the manifest entry
    assert_eq!(
        views.iter().map(|v| v.id.as_str()).collect::<Vec<_>>(),
        vec!["variables", "incidents", "audit"]
    );
    assert_eq!(views[2].label.as_deref(), Some("Audit (inline)"));
    // plugin manifest overrides the default view
    assert_eq!(views[1].label.as_deref(), Some("Incidents (plugin)"));
    assert!(!views[1].default);
    assert!(views[0].default);
}

#[test]
fn test_default_registered_later_keeps_plugin_view() {
    let manifest = ViewManifest::parse(
        r#"
        name = "override"
        [[view]]
        extension_point = "cockpit.processInstance.runtime.tab"
        id = "variables"
        label = "Variables (plugin)"
        "#,
    )
    .unwrap();

    let cockpit = Cockpit::bootstrap(
        CockpitConfig::new(),
        vec![
            Box::new(ManifestPlugin::new(manifest)),
            Box::new(ProcessInstancePlugin),
        ],
    )
    .unwrap();

    let variables = cockpit.views().query_by_id(RUNTIME_TAB, "variables").unwrap();
    assert_eq!(variables.origin(), Origin::Plugin);
    assert_eq!(variables.label(), Some("Variables (plugin)"));
}

#[test]
fn test_invalid_plugin_view_fails_startup() {
    let err = Cockpit::bootstrap(
        CockpitConfig::new(),
        vec![Box::new(ProcessInstancePlugin), Box::new(BrokenPlugin)],
    )
    .unwrap_err();

    match err {
        CockpitError::Plugin { plugin, source } => {
            assert_eq!(plugin, "broken");
            assert!(matches!(source, ViewError::InvalidDescriptor { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_manifest_is_io_error() {
    let dir = TempDir::new().unwrap();
    let config = CockpitConfig::new().with_manifest(dir.path().join("absent.toml"));

    let err = Cockpit::bootstrap(config, Vec::new()).unwrap_err();
    assert!(matches!(err, CockpitError::Io { ref path, .. } if path.ends_with("absent.toml")));
}

#[test]
fn test_malformed_config_file_is_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cockpit.toml");
    fs::write(&path, "manifests = 3").unwrap();

    assert!(matches!(
        CockpitConfig::load(&path),
        Err(CockpitError::Parse { .. })
    ));
}

#[test]
fn test_page_installs_data_plugins_for_regions() {
    let cockpit = Cockpit::bootstrap(CockpitConfig::new(), vec![Box::new(ProcessInstancePlugin)]).unwrap();
    let context = ViewContext::new().with("id", "pi_42");

    let page = cockpit.page(INSTANCE_PAGE, &context).unwrap();
    let mut renderer = RecordingRenderer::new();
    let slot = cockpit
        .mount(RUNTIME_TAB, &page, context, DataSharing::Isolated, &mut renderer)
        .unwrap();

    assert_eq!(renderer.displayed(), vec!["variables", "incidents"]);
    let incidents = slot.data("incidents").unwrap();
    assert_eq!(
        incidents.get("processInstanceId").unwrap(),
        Datum::Resolved(json!("pi_42"))
    );

    slot.unmount(&mut renderer);
    assert!(renderer.displayed().is_empty());
}

#[test]
fn test_page_without_data_plugins_is_empty_root() {
    let cockpit = Cockpit::bootstrap(CockpitConfig::new(), Vec::new()).unwrap();
    let page = cockpit.page("cockpit.unknown", &ViewContext::new()).unwrap();
    assert_eq!(page.get("anything").unwrap(), Datum::Undefined);
}

#[test]
fn test_view_summary_serializes() {
    let cockpit = Cockpit::bootstrap(
        CockpitConfig::new().with_view(
            ViewEntry::new("cockpit.dashboard", "admin").with_condition("admin", true),
        ),
        Vec::new(),
    )
    .unwrap();

    let admin = ViewContext::new().with("admin", true);
    let summary = cockpit.describe("cockpit.dashboard", Some(&admin));
    assert_eq!(
        serde_json::to_value(&summary).unwrap(),
        json!([{
            "id": "admin",
            "extension_point": "cockpit.dashboard",
            "priority": 0,
            "conditional": true,
            "default": false
        }])
    );
    assert!(cockpit.describe("cockpit.dashboard", None).is_empty());
}

#[test]
fn test_logging_installs_once() {
    logging::init(&LogConfig::default()).unwrap();
    assert!(matches!(
        logging::init(&LogConfig::default().with_json(true)),
        Err(CockpitError::Logging(_))
    ));
}
