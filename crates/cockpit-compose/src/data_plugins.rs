//! Data plugins
//!
//! Plugins contribute providers to a page's data node the same way they
//! contribute views: per extension point, instantiated in registration order.

use crate::error::{CompositionError, CompositionResult};
use cockpit_datadepend::{DataDependResult, DataNode};
use cockpit_views::ViewContext;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Installs providers on a page node
pub type InstallFn = Arc<dyn Fn(&DataNode, &ViewContext) -> DataDependResult<()> + Send + Sync>;

/// Data plugins grouped by extension point
#[derive(Default, Clone)]
pub struct DataPlugins {
    points: IndexMap<String, IndexMap<String, InstallFn>>,
}

impl DataPlugins {
    /// Create empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a data plugin
    ///
    /// A plugin with the same id is replaced and moves to the end of the
    /// instantiation order. Returns whether one was replaced.
    pub fn register<F>(&mut self, extension_point: &str, id: &str, install: F) -> bool
    where
        F: Fn(&DataNode, &ViewContext) -> DataDependResult<()> + Send + Sync + 'static,
    {
        let plugins = self.points.entry(extension_point.to_owned()).or_default();
        let replaced = plugins.shift_remove(id).is_some();
        plugins.insert(id.to_owned(), Arc::new(install));
        debug!(extension_point, plugin = id, replaced, "Data plugin registered");
        replaced
    }

    /// Install every plugin of `extension_point` on `node`
    ///
    /// Returns the number of plugins installed. Stops at the first failure.
    ///
    /// # Errors
    /// - `CompositionError::DataPlugin` naming the failing plugin
    pub fn instantiate(
        &self,
        extension_point: &str,
        node: &DataNode,
        context: &ViewContext,
    ) -> CompositionResult<usize> {
        let Some(plugins) = self.points.get(extension_point) else {
            return Ok(0);
        };

        for (id, install) in plugins {
            install(node, context).map_err(|source| CompositionError::DataPlugin {
                extension_point: extension_point.to_owned(),
                plugin: id.clone(),
                source,
            })?;
        }

        debug!(
            extension_point,
            node = %node.id(),
            plugins = plugins.len(),
            "Data plugins instantiated"
        );
        Ok(plugins.len())
    }

    /// Plugin ids of `extension_point` in instantiation order
    pub fn plugins<'a>(&'a self, extension_point: &str) -> impl Iterator<Item = &'a str> {
        self.points
            .get(extension_point)
            .into_iter()
            .flat_map(|plugins| plugins.keys().map(String::as_str))
    }

    /// Total number of registered plugins
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.values().map(IndexMap::len).sum()
    }

    /// Whether nothing is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for DataPlugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.points
                    .iter()
                    .map(|(ep, plugins)| (ep, plugins.keys().collect::<Vec<_>>())),
            )
            .finish()
    }
}
