//! Cockpit Core - application bootstrap
//!
//! Wires plugin modules, view manifests and configuration into the frozen
//! registries pages compose from:
//! - Loads [`CockpitConfig`] from TOML
//! - Configures each [`PluginModule`] once
//! - Exposes the resulting [`Cockpit`] context
//!
//! # Example
//!
//! ```rust
//! use cockpit_core::{Cockpit, CockpitConfig, ViewEntry};
//! use cockpit_views::ViewContext;
//!
//! let config = CockpitConfig::new()
//!     .with_view(ViewEntry::new("cockpit.dashboard", "processes").with_priority(10))
//!     .with_view(ViewEntry::new("cockpit.dashboard", "admin").with_condition("admin", true));
//! let cockpit = Cockpit::bootstrap(config, Vec::new())?;
//!
//! let shown = cockpit.describe("cockpit.dashboard", Some(&ViewContext::new()));
//! assert_eq!(shown.len(), 1);
//! assert_eq!(shown[0].id, "processes");
//! # Ok::<(), cockpit_core::CockpitError>(())
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod app;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod plugin;

pub use app::{Cockpit, ViewSummary};
pub use config::{CockpitConfig, LogConfig};
pub use error::{CockpitError, CockpitResult};
pub use manifest::{ManifestPlugin, ViewEntry, ViewManifest};
pub use plugin::{PluginConfigurator, PluginModule};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for building a cockpit
    pub use crate::{Cockpit, CockpitConfig, PluginConfigurator, PluginModule, ViewEntry};
    pub use cockpit_compose::{DataSharing, ExtensionSlot, RegionScope, Renderer, ViewHandle};
    pub use cockpit_datadepend::{DataNode, Datum};
    pub use cockpit_views::{ViewContext, ViewDescriptor};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
