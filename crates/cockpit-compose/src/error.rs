//! Composition error types

use cockpit_datadepend::DataDependError;

/// Failure reported by a [`Renderer`](crate::Renderer)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("rendering view '{view}' failed: {message}")]
pub struct RenderError {
    /// View id
    pub view: String,
    /// Renderer-specific message
    pub message: String,
}

impl RenderError {
    /// Create render error
    #[must_use]
    pub fn new(view: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            message: message.into(),
        }
    }
}

/// Composition errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
    /// Data node operation failed
    #[error(transparent)]
    Data(#[from] DataDependError),

    /// Renderer refused to mount a view
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Data plugin failed to install its providers
    #[error("data plugin '{plugin}' for extension point '{extension_point}' failed: {source}")]
    DataPlugin {
        /// Extension point being instantiated
        extension_point: String,
        /// Plugin id
        plugin: String,
        /// Underlying failure
        #[source]
        source: DataDependError,
    },
}

/// Result alias for composition operations
pub type CompositionResult<T> = Result<T, CompositionError>;
