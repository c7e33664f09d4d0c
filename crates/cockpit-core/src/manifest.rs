//! TOML view manifests
//!
//! A manifest declares static views for a plugin:
//!
//! ```toml
//! name = "process-instance"
//!
//! [[view]]
//! extension_point = "cockpit.processInstance.runtime.tab"
//! id = "incidents"
//! label = "Incidents"
//! priority = 15
//! template = "incidents-tab.html"
//! keep_search_params = ["viewbox"]
//!
//! [view.when]
//! admin = true
//! ```
//!
//! `when` entries must all equal the context's values for the view to show.

use crate::error::{CockpitError, CockpitResult};
use crate::plugin::{PluginConfigurator, PluginModule};
use cockpit_views::{ViewDescriptor, ViewError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// One statically declared view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewEntry {
    /// Extension point
    pub extension_point: String,
    /// View id
    pub id: String,
    /// Priority; higher renders first
    #[serde(default)]
    pub priority: i32,
    /// Display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Template reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Controller reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    /// Search parameters kept on navigation
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keep_search_params: Vec<String>,
    /// Context entries required for the view to show
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub when: BTreeMap<String, Value>,
    /// Register as a built-in default instead of a plugin view
    #[serde(default)]
    pub default: bool,
}

impl ViewEntry {
    /// Create entry with required fields
    #[must_use]
    pub fn new(extension_point: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            extension_point: extension_point.into(),
            id: id.into(),
            priority: 0,
            label: None,
            template: None,
            controller: None,
            keep_search_params: Vec::new(),
            when: BTreeMap::new(),
            default: false,
        }
    }

    /// With priority
    #[inline]
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// With a required context entry
    #[must_use]
    pub fn with_condition(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.when.insert(key.into(), value.into());
        self
    }

    /// Build the registry descriptor
    #[must_use]
    pub fn to_descriptor(&self) -> ViewDescriptor {
        let mut builder = ViewDescriptor::builder(&self.extension_point, &self.id)
            .priority(self.priority)
            .keep_search_params(self.keep_search_params.iter().cloned());
        if let Some(label) = &self.label {
            builder = builder.label(label);
        }
        if let Some(template) = &self.template {
            builder = builder.template(template);
        }
        if let Some(controller) = &self.controller {
            builder = builder.controller(controller);
        }
        if !self.when.is_empty() {
            let when = self.when.clone();
            builder = builder.predicate(move |ctx| when.iter().all(|(k, v)| ctx.get(k) == Some(v)));
        }
        builder.build()
    }

    /// Register into `config` with the entry's origin
    ///
    /// # Errors
    /// - `ViewError::InvalidDescriptor` if a required field is blank
    pub fn register(&self, config: &mut PluginConfigurator) -> Result<(), ViewError> {
        let descriptor = self.to_descriptor();
        if self.default {
            config.register_default_view(descriptor)?;
        } else {
            config.register_view(descriptor)?;
        }
        Ok(())
    }
}

/// Views declared by one plugin
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewManifest {
    /// Plugin name
    pub name: String,
    /// Declared views
    #[serde(default, rename = "view")]
    pub views: Vec<ViewEntry>,
}

impl ViewManifest {
    /// Parse manifest TOML
    ///
    /// # Errors
    /// - `CockpitError::Parse` on malformed TOML or unknown fields
    pub fn parse(input: &str) -> CockpitResult<Self> {
        toml::from_str(input).map_err(|source| CockpitError::Parse {
            path: "<inline>".into(),
            source,
        })
    }

    /// Read and parse a manifest file
    ///
    /// # Errors
    /// - `CockpitError::Io` if the file cannot be read
    /// - `CockpitError::Parse` on malformed TOML
    pub fn load(path: impl AsRef<Path>) -> CockpitResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| CockpitError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&input).map_err(|source| CockpitError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Plugin module registering a manifest's views
#[derive(Debug, Clone)]
pub struct ManifestPlugin {
    manifest: ViewManifest,
}

impl ManifestPlugin {
    /// Wrap a parsed manifest
    #[must_use]
    pub fn new(manifest: ViewManifest) -> Self {
        Self { manifest }
    }

    /// Underlying manifest
    #[must_use]
    pub fn manifest(&self) -> &ViewManifest {
        &self.manifest
    }
}

impl PluginModule for ManifestPlugin {
    fn name(&self) -> &str {
        &self.manifest.name
    }

    fn configure(&self, config: &mut PluginConfigurator) -> Result<(), ViewError> {
        for entry in &self.manifest.views {
            entry.register(config)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cockpit_views::{Origin, ViewContext};
    use pretty_assertions::assert_eq;

    const MANIFEST: &str = r#"
        name = "process-instance"

        [[view]]
        extension_point = "cockpit.processInstance.runtime.tab"
        id = "incidents"
        label = "Incidents"
        priority = 15
        template = "incidents-tab.html"
        keep_search_params = ["viewbox"]

        [view.when]
        admin = true

        [[view]]
        extension_point = "cockpit.processInstance.runtime.tab"
        id = "variables"
        default = true
    "#;

    #[test]
    fn test_parse_manifest() {
        let manifest = ViewManifest::parse(MANIFEST).unwrap();
        assert_eq!(manifest.name, "process-instance");
        assert_eq!(manifest.views.len(), 2);

        let incidents = &manifest.views[0];
        assert_eq!(incidents.priority, 15);
        assert_eq!(incidents.label.as_deref(), Some("Incidents"));
        assert_eq!(incidents.when.get("admin"), Some(&Value::Bool(true)));
        assert!(!incidents.default);
        assert!(manifest.views[1].default);
        assert_eq!(manifest.views[1].priority, 0);
    }

    #[test]
    fn test_when_table_becomes_equality_predicate() {
        let manifest = ViewManifest::parse(MANIFEST).unwrap();
        let descriptor = manifest.views[0].to_descriptor();

        assert!(descriptor.is_conditional());
        assert!(descriptor.accepts(&ViewContext::new().with("admin", true)));
        assert!(!descriptor.accepts(&ViewContext::new().with("admin", "true")));
        assert!(!descriptor.accepts(&ViewContext::new()));
        assert_eq!(descriptor.keep_search_params(), ["viewbox".to_string()]);
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = ViewManifest::parse(
            r#"
            name = "x"
            [[view]]
            extension_point = "a"
            id = "b"
            colour = "red"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, CockpitError::Parse { .. }));
    }

    #[test]
    fn test_manifest_plugin_registers_with_origin() {
        let plugin = ManifestPlugin::new(ViewManifest::parse(MANIFEST).unwrap());
        let mut config = PluginConfigurator::new();
        plugin.configure(&mut config).unwrap();

        let (views, _) = config.finish();
        let ep = "cockpit.processInstance.runtime.tab";
        assert_eq!(
            views.query_by_id(ep, "incidents").unwrap().origin(),
            Origin::Plugin
        );
        assert_eq!(
            views.query_by_id(ep, "variables").unwrap().origin(),
            Origin::Default
        );
    }

    #[test]
    fn test_entry_builder_conditions() {
        let descriptor = ViewEntry::new("dash", "a")
            .with_priority(3)
            .with_condition("tenant", "acme")
            .with_condition("admin", true)
            .to_descriptor();

        assert_eq!(descriptor.priority(), 3);
        assert!(descriptor.accepts(
            &ViewContext::new().with("tenant", "acme").with("admin", true)
        ));
        assert!(!descriptor.accepts(&ViewContext::new().with("tenant", "acme")));
    }
}
