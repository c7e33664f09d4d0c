//! Plugin modules
//!
//! Plugins are configured once at startup. Each gets the same
//! [`PluginConfigurator`] to register views and data plugins; afterwards
//! both registries are frozen.

use cockpit_compose::DataPlugins;
use cockpit_datadepend::{DataDependResult, DataNode};
use cockpit_views::{Registration, ViewContext, ViewDescriptor, ViewError, ViewRegistry};
use tracing::debug;

/// A plugin contributing views and data providers
pub trait PluginModule {
    /// Plugin name, used in logs and errors
    fn name(&self) -> &str;

    /// Register the plugin's contributions
    ///
    /// # Errors
    /// - `ViewError::InvalidDescriptor` if a registered view is invalid
    fn configure(&self, config: &mut PluginConfigurator) -> Result<(), ViewError>;
}

/// Registration surface handed to plugin modules
#[derive(Debug, Default)]
pub struct PluginConfigurator {
    views: ViewRegistry,
    data: DataPlugins,
}

impl PluginConfigurator {
    /// Create empty configurator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin view
    ///
    /// # Errors
    /// - `ViewError::InvalidDescriptor` if a required field is blank
    pub fn register_view(&mut self, descriptor: ViewDescriptor) -> Result<Registration, ViewError> {
        self.views.register(descriptor)
    }

    /// Register a built-in default view
    ///
    /// # Errors
    /// - `ViewError::InvalidDescriptor` if a required field is blank
    pub fn register_default_view(
        &mut self,
        descriptor: ViewDescriptor,
    ) -> Result<Registration, ViewError> {
        self.views.register_default(descriptor)
    }

    /// Register a data plugin for pages of `extension_point`
    pub fn register_data<F>(&mut self, extension_point: &str, id: &str, install: F)
    where
        F: Fn(&DataNode, &ViewContext) -> DataDependResult<()> + Send + Sync + 'static,
    {
        self.data.register(extension_point, id, install);
    }

    /// Views registered so far
    #[must_use]
    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// Configure `module` against this configurator
    pub(crate) fn apply(&mut self, module: &dyn PluginModule) -> Result<(), ViewError> {
        let before = self.views.len();
        module.configure(self)?;
        debug!(
            plugin = module.name(),
            views = self.views.len().saturating_sub(before),
            "Plugin configured"
        );
        Ok(())
    }

    /// Finish configuration
    #[must_use]
    pub fn finish(self) -> (ViewRegistry, DataPlugins) {
        (self.views, self.data)
    }
}
