//! Error types for cockpit bootstrap
//!
//! Everything here fails startup: unreadable configuration, malformed
//! manifests, or a plugin registering an invalid view.

use cockpit_compose::CompositionError;
use cockpit_views::ViewError;
use std::path::PathBuf;

/// Main cockpit error type
#[derive(Debug, thiserror::Error)]
pub enum CockpitError {
    /// File could not be read
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// TOML could not be parsed
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// File path, or `<inline>` for in-memory input
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: toml::de::Error,
    },

    /// Plugin module failed to configure
    #[error("plugin '{plugin}' failed to configure: {source}")]
    Plugin {
        /// Plugin name
        plugin: String,
        /// Registration failure
        #[source]
        source: ViewError,
    },

    /// Invalid view registration outside a plugin
    #[error("view registration failed: {0}")]
    View(#[from] ViewError),

    /// Page composition failed
    #[error("composition failed: {0}")]
    Composition(#[from] CompositionError),

    /// Tracing subscriber could not be installed
    #[error("logging initialisation failed: {0}")]
    Logging(String),
}

/// Result alias for cockpit operations
pub type CockpitResult<T> = Result<T, CockpitError>;
