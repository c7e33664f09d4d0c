//! Rendering seam
//!
//! Template resolution and markup are outside this crate. A [`Renderer`]
//! receives a [`RegionScope`] per view and hands back an opaque
//! [`ViewHandle`] used to remove the output later.

use crate::error::RenderError;
use cockpit_datadepend::DataNode;
use cockpit_views::{ViewContext, ViewDescriptor};
use std::fmt;
use std::sync::Arc;

/// Opaque handle to mounted view output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewHandle(u64);

impl ViewHandle {
    /// Create handle from a renderer-chosen id
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Renderer-chosen id
    #[inline]
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ViewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

/// Everything a renderer needs to mount one view
#[derive(Debug, Clone, Copy)]
pub struct RegionScope<'a> {
    /// Descriptor being mounted
    pub descriptor: &'a Arc<ViewDescriptor>,
    /// Data node the view reads from and provides into
    pub data: &'a DataNode,
    /// Context the slot was queried with
    pub context: &'a ViewContext,
    /// Index of the region within the slot's current order
    pub position: usize,
}

/// Renders view output for mounted regions
pub trait Renderer {
    /// Mount the view described by `scope`
    ///
    /// # Errors
    /// - `RenderError` if the view cannot be rendered
    fn mount(&mut self, scope: &RegionScope<'_>) -> Result<ViewHandle, RenderError>;

    /// Remove previously mounted output
    fn unmount(&mut self, handle: ViewHandle);
}

impl<R: Renderer + ?Sized> Renderer for &mut R {
    fn mount(&mut self, scope: &RegionScope<'_>) -> Result<ViewHandle, RenderError> {
        (**self).mount(scope)
    }

    fn unmount(&mut self, handle: ViewHandle) {
        (**self).unmount(handle);
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn mount(&mut self, scope: &RegionScope<'_>) -> Result<ViewHandle, RenderError> {
        (**self).mount(scope)
    }

    fn unmount(&mut self, handle: ViewHandle) {
        (**self).unmount(handle);
    }
}
