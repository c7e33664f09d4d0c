//! Error types for the data-dependency graph
//!
//! Two kinds of failure exist and they travel differently:
//! - [`ComputationError`] is captured provider failure. It is a value: it is
//!   stored in the slot and delivered to observers like any other datum.
//! - [`DataDependError`] is a lifecycle error raised to the caller, e.g. using
//!   a node after it was disposed.

use crate::node::NodeId;
use std::fmt;

/// Captured failure of a provider computation
///
/// Cloned into every dependent that reads the failed key, so dependents
/// inherit the first cause instead of retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputationError {
    key: Option<String>,
    message: String,
}

impl ComputationError {
    /// Create error from message
    #[inline]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            key: None,
            message: message.into(),
        }
    }

    /// Error for a dependency that resolved to no value
    #[must_use]
    pub fn undefined(key: &str) -> Self {
        Self::new(format!("dependency '{key}' is undefined"))
    }

    /// Error for a provider that (transitively) depends on itself
    #[must_use]
    pub fn cycle(key: &str) -> Self {
        Self::new(format!("dependency cycle through '{key}'")).with_key(key)
    }

    /// Attach the failing key, keeping an existing one
    #[must_use]
    pub fn with_key(mut self, key: &str) -> Self {
        if self.key.is_none() {
            self.key = Some(key.to_owned());
        }
        self
    }

    /// Key whose provider failed first
    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Failure message
    #[inline]
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ComputationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "computing '{key}' failed: {}", self.message),
            None => write!(f, "computation failed: {}", self.message),
        }
    }
}

impl std::error::Error for ComputationError {}

impl From<anyhow::Error> for ComputationError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{err:#}"))
    }
}

impl From<serde_json::Error> for ComputationError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Errors raised by graph operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataDependError {
    /// Operation on a node that has been disposed
    #[error("data node {node} has been disposed")]
    Disposed {
        /// The disposed node
        node: NodeId,
    },

    /// A resolved key carried a captured computation failure
    #[error(transparent)]
    Computation(#[from] ComputationError),
}

impl From<DataDependError> for ComputationError {
    fn from(err: DataDependError) -> Self {
        match err {
            DataDependError::Computation(err) => err,
            other => ComputationError::new(other.to_string()),
        }
    }
}

/// Result alias for graph operations
pub type DataDependResult<T> = Result<T, DataDependError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computation_error_display_with_key() {
        let err = ComputationError::new("boom").with_key("total");
        assert_eq!(err.to_string(), "computing 'total' failed: boom");
    }

    #[test]
    fn computation_error_keeps_first_key() {
        let err = ComputationError::new("boom").with_key("a").with_key("b");
        assert_eq!(err.key(), Some("a"));
    }

    #[test]
    fn computation_error_from_anyhow() {
        let err: ComputationError = anyhow::anyhow!("404 not found").into();
        assert_eq!(err.message(), "404 not found");
        assert!(err.key().is_none());
    }

    #[test]
    fn disposed_error_display() {
        let err = DataDependError::Disposed { node: NodeId(7) };
        assert_eq!(err.to_string(), "data node #7 has been disposed");
    }
}
