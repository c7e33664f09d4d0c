//! Application context
//!
//! [`Cockpit`] owns the frozen registries built at startup and is the entry
//! point pages use to get their data node and mount extension slots.

use crate::config::CockpitConfig;
use crate::error::{CockpitError, CockpitResult};
use crate::manifest::{ManifestPlugin, ViewManifest};
use crate::plugin::{PluginConfigurator, PluginModule};
use cockpit_compose::{DataPlugins, DataSharing, ExtensionSlot, Renderer};
use cockpit_datadepend::DataNode;
use cockpit_views::{ViewContext, ViewRegistry};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Bootstrapped cockpit
#[derive(Debug, Clone)]
pub struct Cockpit {
    config: CockpitConfig,
    views: Arc<ViewRegistry>,
    data_plugins: Arc<DataPlugins>,
}

impl Cockpit {
    /// Configure all plugins and freeze the registries
    ///
    /// Order: `modules` as given, then manifest files, then inline views
    /// from `config`. Later registrations replace earlier ones with the same
    /// id; plugin views always win over defaults.
    ///
    /// # Errors
    /// - `CockpitError::Plugin` if a module registers an invalid view
    /// - `CockpitError::Io` / `CockpitError::Parse` for unreadable manifests
    /// - `CockpitError::View` for an invalid inline view
    pub fn bootstrap(
        config: CockpitConfig,
        modules: Vec<Box<dyn PluginModule>>,
    ) -> CockpitResult<Self> {
        let mut configurator = PluginConfigurator::new();

        for module in &modules {
            configurator
                .apply(module.as_ref())
                .map_err(|source| CockpitError::Plugin {
                    plugin: module.name().to_owned(),
                    source,
                })?;
        }

        for path in &config.manifests {
            let plugin = ManifestPlugin::new(ViewManifest::load(path)?);
            debug!(path = %path.display(), plugin = plugin.name(), "Loaded view manifest");
            configurator
                .apply(&plugin)
                .map_err(|source| CockpitError::Plugin {
                    plugin: plugin.name().to_owned(),
                    source,
                })?;
        }

        for entry in &config.views {
            entry.register(&mut configurator)?;
        }

        let (views, data_plugins) = configurator.finish();
        info!(
            plugins = modules.len() + config.manifests.len(),
            views = views.len(),
            extension_points = views.extension_points().count(),
            data_plugins = data_plugins.len(),
            "Cockpit bootstrapped"
        );

        Ok(Self {
            config,
            views: Arc::new(views),
            data_plugins: Arc::new(data_plugins),
        })
    }

    /// Configuration the cockpit was built from
    #[must_use]
    pub fn config(&self) -> &CockpitConfig {
        &self.config
    }

    /// Frozen view registry
    #[must_use]
    pub fn views(&self) -> &Arc<ViewRegistry> {
        &self.views
    }

    /// Frozen data plugin registry
    #[must_use]
    pub fn data_plugins(&self) -> &Arc<DataPlugins> {
        &self.data_plugins
    }

    /// Root data node for a page, with the page's data plugins installed
    ///
    /// # Errors
    /// - `CockpitError::Composition` if a data plugin fails
    pub fn page(&self, extension_point: &str, context: &ViewContext) -> CockpitResult<DataNode> {
        let node = DataNode::root();
        self.data_plugins
            .instantiate(extension_point, &node, context)?;
        Ok(node)
    }

    /// Mount the views of `extension_point` below `parent`
    ///
    /// # Errors
    /// - `CockpitError::Composition` if the parent is disposed or a view
    ///   fails to render
    pub fn mount<R: Renderer + ?Sized>(
        &self,
        extension_point: &str,
        parent: &DataNode,
        context: ViewContext,
        sharing: DataSharing,
        renderer: &mut R,
    ) -> CockpitResult<ExtensionSlot> {
        Ok(ExtensionSlot::mount(
            self.views.clone(),
            extension_point,
            parent,
            context,
            sharing,
            renderer,
        )?)
    }

    /// Summaries of the views `extension_point` shows for `context`
    #[must_use]
    pub fn describe(&self, extension_point: &str, context: Option<&ViewContext>) -> Vec<ViewSummary> {
        self.views
            .query(extension_point, context)
            .iter()
            .map(|d| ViewSummary {
                id: d.id().to_owned(),
                extension_point: d.extension_point().to_owned(),
                priority: d.priority(),
                label: d.label().map(str::to_owned),
                template: d.template().map(|t| t.0.clone()),
                controller: d.controller().map(|c| c.0.clone()),
                keep_search_params: d.keep_search_params().to_vec(),
                conditional: d.is_conditional(),
                default: d.origin() == cockpit_views::Origin::Default,
            })
            .collect()
    }
}

/// Serializable view listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewSummary {
    /// View id
    pub id: String,
    /// Extension point
    pub extension_point: String,
    /// Priority
    pub priority: i32,
    /// Display label
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Template reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Controller reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub controller: Option<String>,
    /// Search parameters kept on navigation
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub keep_search_params: Vec<String>,
    /// Whether a predicate decides visibility
    pub conditional: bool,
    /// Whether the view is a built-in default
    pub default: bool,
}
