//! # Cockpit Views
//!
//! Registry of plugin view descriptors, keyed by extension point.
//!
//! Pages declare extension points such as `cockpit.processInstance.runtime.tab`.
//! Plugins contribute [`ViewDescriptor`]s to them, and pages query the
//! [`ViewRegistry`] for the ordered list of views to render.
//!
//! ```rust
//! use cockpit_views::{ViewContext, ViewDescriptor, ViewRegistry};
//!
//! let mut registry = ViewRegistry::new();
//! registry.register(ViewDescriptor::builder("cockpit.dashboard", "a").priority(5).build())?;
//! registry.register(ViewDescriptor::builder("cockpit.dashboard", "b").priority(10).build())?;
//!
//! let ids: Vec<_> = registry
//!     .query("cockpit.dashboard", Some(&ViewContext::new()))
//!     .iter()
//!     .map(|v| v.id().to_owned())
//!     .collect();
//! assert_eq!(ids, ["b", "a"]);
//! # Ok::<(), cockpit_views::ViewError>(())
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod context;
mod descriptor;
mod error;
mod registry;

pub use context::ViewContext;
pub use descriptor::{ControllerRef, Origin, Predicate, TemplateRef, ViewDescriptor, ViewDescriptorBuilder};
pub use error::ViewError;
pub use registry::{Registration, ViewRegistry};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
