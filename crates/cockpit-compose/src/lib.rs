//! # Cockpit Compose
//!
//! Page and region composition over the view registry and the data graph.
//!
//! # Core Concepts
//!
//! - [`ExtensionSlot`]: the mounted views of one extension point, each with a
//!   scoped [`DataNode`](cockpit_datadepend::DataNode)
//! - [`Renderer`]: the seam to whatever produces view output
//! - [`DataPlugins`]: providers contributed to page nodes per extension point
//!
//! # Example
//!
//! ```rust
//! use cockpit_compose::{DataSharing, ExtensionSlot, RegionScope, RenderError, Renderer, ViewHandle};
//! use cockpit_datadepend::DataNode;
//! use cockpit_views::{ViewContext, ViewDescriptor, ViewRegistry};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Titles(Vec<String>);
//!
//! impl Renderer for Titles {
//!     fn mount(&mut self, scope: &RegionScope<'_>) -> Result<ViewHandle, RenderError> {
//!         self.0.push(scope.descriptor.id().to_owned());
//!         Ok(ViewHandle::new(self.0.len() as u64))
//!     }
//!     fn unmount(&mut self, _handle: ViewHandle) {}
//! }
//!
//! let mut registry = ViewRegistry::new();
//! registry.register(ViewDescriptor::builder("dashboard", "a").priority(5).build())?;
//! registry.register(ViewDescriptor::builder("dashboard", "b").priority(10).build())?;
//!
//! let page = DataNode::root();
//! let mut renderer = Titles::default();
//! let slot = ExtensionSlot::mount(
//!     Arc::new(registry),
//!     "dashboard",
//!     &page,
//!     ViewContext::new(),
//!     DataSharing::Isolated,
//!     &mut renderer,
//! )?;
//! assert_eq!(renderer.0, ["b", "a"]);
//! slot.unmount(&mut renderer);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod data_plugins;
mod error;
mod renderer;
mod slot;

pub use data_plugins::{DataPlugins, InstallFn};
pub use error::{CompositionError, CompositionResult, RenderError};
pub use renderer::{RegionScope, Renderer, ViewHandle};
pub use slot::{DataSharing, ExtensionSlot};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
