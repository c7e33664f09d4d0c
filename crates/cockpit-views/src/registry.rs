//! View registry
//!
//! Holds every registered [`ViewDescriptor`] grouped by extension point and
//! answers ordered, context-filtered queries.
//!
//! ## Ordering
//!
//! Query results are sorted by descending priority. Ties keep registration
//! order; re-registering an id counts as a fresh registration.

use crate::context::ViewContext;
use crate::descriptor::{Origin, ViewDescriptor};
use crate::error::ViewError;
use indexmap::IndexMap;
use std::cmp::Reverse;
use std::sync::Arc;
use tracing::{debug, trace};

/// Outcome of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// New id for the extension point
    Added,
    /// Existing entry with the same id was replaced
    Replaced,
    /// Default skipped because a plugin already owns the id
    Skipped,
}

#[derive(Debug, Clone)]
struct Registered {
    descriptor: Arc<ViewDescriptor>,
    seq: u64,
}

/// Registry of view descriptors per extension point
#[derive(Debug, Default)]
pub struct ViewRegistry {
    points: IndexMap<String, IndexMap<String, Registered>>,
    next_seq: u64,
}

impl ViewRegistry {
    /// Create empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin view
    ///
    /// An existing entry with the same `(extension_point, id)` is replaced,
    /// whatever its origin.
    ///
    /// # Errors
    /// - `ViewError::InvalidDescriptor` if a required field is blank
    pub fn register(&mut self, descriptor: ViewDescriptor) -> Result<Registration, ViewError> {
        self.insert(descriptor.with_origin(Origin::Plugin))
    }

    /// Register a built-in view
    ///
    /// Defaults never displace a plugin view with the same id.
    ///
    /// # Errors
    /// - `ViewError::InvalidDescriptor` if a required field is blank
    pub fn register_default(
        &mut self,
        descriptor: ViewDescriptor,
    ) -> Result<Registration, ViewError> {
        descriptor.validate()?;
        let owned_by_plugin = self
            .points
            .get(descriptor.extension_point())
            .and_then(|entries| entries.get(descriptor.id()))
            .is_some_and(|e| e.descriptor.origin() == Origin::Plugin);
        if owned_by_plugin {
            debug!(
                extension_point = descriptor.extension_point(),
                id = descriptor.id(),
                "Default view skipped, plugin view registered"
            );
            return Ok(Registration::Skipped);
        }
        self.insert(descriptor.with_origin(Origin::Default))
    }

    fn insert(&mut self, descriptor: ViewDescriptor) -> Result<Registration, ViewError> {
        descriptor.validate()?;

        let seq = self.next_seq;
        self.next_seq += 1;

        let entries = self
            .points
            .entry(descriptor.extension_point().to_owned())
            .or_default();
        // shift_remove so the replacement also moves to the end
        let replaced = entries.shift_remove(descriptor.id()).is_some();

        debug!(
            extension_point = descriptor.extension_point(),
            id = descriptor.id(),
            priority = descriptor.priority(),
            origin = ?descriptor.origin(),
            replaced,
            "View registered"
        );

        entries.insert(
            descriptor.id().to_owned(),
            Registered {
                descriptor: Arc::new(descriptor),
                seq,
            },
        );

        Ok(if replaced {
            Registration::Replaced
        } else {
            Registration::Added
        })
    }

    /// Views for an extension point
    ///
    /// Descriptors whose predicate rejects `context` are left out. Without
    /// a context, predicates are evaluated against an empty one. Unknown
    /// extension points yield an empty list.
    #[must_use]
    pub fn query(
        &self,
        extension_point: &str,
        context: Option<&ViewContext>,
    ) -> Vec<Arc<ViewDescriptor>> {
        let Some(entries) = self.points.get(extension_point) else {
            trace!(extension_point, "Query for unknown extension point");
            return Vec::new();
        };

        let empty = ViewContext::new();
        let context = context.unwrap_or(&empty);

        let mut matched: Vec<&Registered> = entries
            .values()
            .filter(|e| e.descriptor.accepts(context))
            .collect();
        matched.sort_by_key(|e| (Reverse(e.descriptor.priority()), e.seq));

        trace!(
            extension_point,
            total = entries.len(),
            matched = matched.len(),
            "Views queried"
        );

        matched.into_iter().map(|e| e.descriptor.clone()).collect()
    }

    /// Views for several extension points concatenated in the order given
    ///
    /// Each extension point's views keep their own priority order.
    #[must_use]
    pub fn query_all(
        &self,
        extension_points: &[&str],
        context: Option<&ViewContext>,
    ) -> Vec<Arc<ViewDescriptor>> {
        extension_points
            .iter()
            .flat_map(|ep| self.query(ep, context))
            .collect()
    }

    /// Descriptor by id, ignoring predicates
    #[must_use]
    pub fn query_by_id(&self, extension_point: &str, id: &str) -> Option<Arc<ViewDescriptor>> {
        self.points
            .get(extension_point)?
            .get(id)
            .map(|e| e.descriptor.clone())
    }

    /// Known extension points, in first-registration order
    pub fn extension_points(&self) -> impl Iterator<Item = &str> {
        self.points.keys().map(String::as_str)
    }

    /// Number of registered descriptors across all extension points
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
