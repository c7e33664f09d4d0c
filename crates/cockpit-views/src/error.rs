//! Error types for the view registry

use crate::descriptor::ViewDescriptor;

/// View registration errors
///
/// These indicate a misconfigured plugin and are meant to fail startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    /// Descriptor is missing a required field
    #[error("invalid view descriptor '{id}' for extension point '{extension_point}': {reason}")]
    InvalidDescriptor {
        /// Extension point as given
        extension_point: String,
        /// Id as given
        id: String,
        /// What is wrong
        reason: String,
    },
}

impl ViewError {
    /// Create invalid descriptor error
    pub(crate) fn invalid(descriptor: &ViewDescriptor, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            extension_point: descriptor.extension_point().to_owned(),
            id: descriptor.id().to_owned(),
            reason: reason.into(),
        }
    }
}
