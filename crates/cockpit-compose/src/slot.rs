//! Extension slots
//!
//! An [`ExtensionSlot`] is the live rendering of one extension point inside
//! a page. It owns a data node below the page node; every region gets its
//! own child of that node, or all regions share it.

use crate::error::CompositionResult;
use crate::renderer::{RegionScope, Renderer, ViewHandle};
use cockpit_datadepend::DataNode;
use cockpit_views::{ViewContext, ViewDescriptor, ViewRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// How regions of a slot get their data node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSharing {
    /// One child node per region; values provided by a view stay local to it
    #[default]
    Isolated,
    /// All regions read from and provide into one node
    Shared,
}

#[derive(Debug)]
struct Region {
    descriptor: Arc<ViewDescriptor>,
    /// `None` when the slot shares its node
    data: Option<DataNode>,
    handle: ViewHandle,
}

/// Mounted views of one extension point
#[derive(Debug)]
pub struct ExtensionSlot {
    registry: Arc<ViewRegistry>,
    extension_point: String,
    sharing: DataSharing,
    context: ViewContext,
    node: DataNode,
    regions: Vec<Region>,
}

impl ExtensionSlot {
    /// Query `extension_point` and mount every matching view
    ///
    /// Regions are mounted in query order. If a view fails to mount, the
    /// regions mounted so far are unmounted again.
    ///
    /// # Errors
    /// - `CompositionError::Data` if `parent` was disposed
    /// - `CompositionError::Render` if the renderer rejects a view
    pub fn mount<R: Renderer + ?Sized>(
        registry: Arc<ViewRegistry>,
        extension_point: &str,
        parent: &DataNode,
        context: ViewContext,
        sharing: DataSharing,
        renderer: &mut R,
    ) -> CompositionResult<Self> {
        let mut slot = Self {
            registry,
            extension_point: extension_point.to_owned(),
            sharing,
            context,
            node: parent.create_child()?,
            regions: Vec::new(),
        };

        if let Err(err) = slot.sync(renderer) {
            slot.unmount(renderer);
            return Err(err);
        }

        debug!(
            extension_point,
            node = %slot.node.id(),
            regions = slot.regions.len(),
            ?sharing,
            "Extension slot mounted"
        );
        Ok(slot)
    }

    /// Re-query with a new context
    ///
    /// Views that no longer match are unmounted, newly matching views are
    /// mounted at their query position, and the rest stay untouched. A view
    /// that fails to mount is skipped; the first such error is returned once
    /// the slot is back in query order.
    ///
    /// # Errors
    /// - `CompositionError::Render` if the renderer rejects a new view
    /// - `CompositionError::Data` if the slot's node was disposed
    pub fn refresh<R: Renderer + ?Sized>(
        &mut self,
        context: ViewContext,
        renderer: &mut R,
    ) -> CompositionResult<()> {
        self.context = context;
        self.sync(renderer)
    }

    /// Unmount every region in order, then release the slot's node
    ///
    /// Each region's data node is disposed before its output is removed.
    pub fn unmount<R: Renderer + ?Sized>(self, renderer: &mut R) {
        let Self {
            extension_point,
            node,
            regions,
            sharing,
            ..
        } = self;

        debug!(
            extension_point = extension_point.as_str(),
            regions = regions.len(),
            "Extension slot unmounting"
        );

        if sharing == DataSharing::Shared {
            node.dispose();
            for region in regions {
                Self::remove(region, renderer);
            }
        } else {
            for region in regions {
                Self::remove(region, renderer);
            }
            node.dispose();
        }
    }

    fn sync<R: Renderer + ?Sized>(&mut self, renderer: &mut R) -> CompositionResult<()> {
        let wanted = self
            .registry
            .query(&self.extension_point, Some(&self.context));
        let wanted_ids: HashSet<&str> = wanted.iter().map(|d| d.id()).collect();

        let mut current: IndexMap<String, Region> = self
            .regions
            .drain(..)
            .map(|r| (r.descriptor.id().to_owned(), r))
            .collect();

        let stale: Vec<String> = current
            .keys()
            .filter(|id| !wanted_ids.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            if let Some(region) = current.shift_remove(&id) {
                debug!(
                    extension_point = self.extension_point.as_str(),
                    view = id.as_str(),
                    "Region no longer matches"
                );
                Self::remove(region, renderer);
            }
        }

        let mut first_error = None;
        for descriptor in &wanted {
            if let Some(region) = current.shift_remove(descriptor.id()) {
                self.regions.push(region);
                continue;
            }
            match self.mount_region(descriptor.clone(), renderer) {
                Ok(region) => self.regions.push(region),
                Err(err) => {
                    warn!(
                        extension_point = self.extension_point.as_str(),
                        view = descriptor.id(),
                        error = %err,
                        "Failed to mount region"
                    );
                    first_error.get_or_insert(err);
                }
            }
        }

        first_error.map_or(Ok(()), Err)
    }

    fn mount_region<R: Renderer + ?Sized>(
        &self,
        descriptor: Arc<ViewDescriptor>,
        renderer: &mut R,
    ) -> CompositionResult<Region> {
        let data = match self.sharing {
            DataSharing::Isolated => Some(self.node.create_child()?),
            DataSharing::Shared => None,
        };
        let scope = RegionScope {
            descriptor: &descriptor,
            data: data.as_ref().unwrap_or(&self.node),
            context: &self.context,
            position: self.regions.len(),
        };
        // a rejected view drops its fresh node with the error
        let handle = renderer.mount(&scope)?;

        debug!(
            extension_point = self.extension_point.as_str(),
            view = descriptor.id(),
            position = scope.position,
            %handle,
            "Region mounted"
        );
        Ok(Region {
            descriptor,
            data,
            handle,
        })
    }

    fn remove<R: Renderer + ?Sized>(region: Region, renderer: &mut R) {
        if let Some(data) = region.data {
            data.dispose();
        }
        renderer.unmount(region.handle);
    }

    /// Extension point this slot renders
    #[inline]
    #[must_use]
    pub fn extension_point(&self) -> &str {
        &self.extension_point
    }

    /// Data sharing mode
    #[inline]
    #[must_use]
    pub fn sharing(&self) -> DataSharing {
        self.sharing
    }

    /// Context of the last mount or refresh
    #[inline]
    #[must_use]
    pub fn context(&self) -> &ViewContext {
        &self.context
    }

    /// Node shared by the slot's regions; parent of isolated region nodes
    #[inline]
    #[must_use]
    pub fn node(&self) -> &DataNode {
        &self.node
    }

    /// Mounted views in render order
    pub fn views(&self) -> impl Iterator<Item = &Arc<ViewDescriptor>> {
        self.regions.iter().map(|r| &r.descriptor)
    }

    /// Data node of the region showing view `id`
    #[must_use]
    pub fn data(&self, id: &str) -> Option<&DataNode> {
        self.region(id).map(|r| r.data.as_ref().unwrap_or(&self.node))
    }

    /// Output handle of the region showing view `id`
    #[must_use]
    pub fn handle(&self, id: &str) -> Option<ViewHandle> {
        self.region(id).map(|r| r.handle)
    }

    fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.descriptor.id() == id)
    }

    /// Number of mounted regions
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether no region is mounted
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}
