//! View descriptors
//!
//! A [`ViewDescriptor`] is the registered metadata of one contribution to an
//! extension point. Template and controller references are opaque to this
//! crate; the rendering layer resolves them.

use crate::context::ViewContext;
use crate::error::ViewError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque reference to a view template
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateRef(pub String);

/// Opaque reference to a view controller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ControllerRef(pub String);

/// Predicate deciding whether a descriptor applies to a context
pub type Predicate = Arc<dyn Fn(&ViewContext) -> bool + Send + Sync>;

/// Who registered a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Contributed by a plugin; always wins over defaults
    #[default]
    Plugin,
    /// Built-in view of the page owning the extension point
    Default,
}

/// Registered metadata of one view contribution
#[derive(Clone)]
pub struct ViewDescriptor {
    id: String,
    extension_point: String,
    priority: i32,
    label: Option<String>,
    template: Option<TemplateRef>,
    controller: Option<ControllerRef>,
    keep_search_params: Vec<String>,
    predicate: Option<Predicate>,
    origin: Origin,
}

impl ViewDescriptor {
    /// Start building a descriptor for `id` in `extension_point`
    #[must_use]
    pub fn builder(extension_point: impl Into<String>, id: impl Into<String>) -> ViewDescriptorBuilder {
        ViewDescriptorBuilder {
            descriptor: ViewDescriptor {
                id: id.into(),
                extension_point: extension_point.into(),
                priority: 0,
                label: None,
                template: None,
                controller: None,
                keep_search_params: Vec::new(),
                predicate: None,
                origin: Origin::Plugin,
            },
        }
    }

    /// Identifier, unique within the extension point
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Extension point the view contributes to
    #[inline]
    #[must_use]
    pub fn extension_point(&self) -> &str {
        &self.extension_point
    }

    /// Priority; higher renders first
    #[inline]
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Display label
    #[inline]
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Template reference
    #[inline]
    #[must_use]
    pub fn template(&self) -> Option<&TemplateRef> {
        self.template.as_ref()
    }

    /// Controller reference
    #[inline]
    #[must_use]
    pub fn controller(&self) -> Option<&ControllerRef> {
        self.controller.as_ref()
    }

    /// Search parameters preserved when navigating to the view
    #[inline]
    #[must_use]
    pub fn keep_search_params(&self) -> &[String] {
        &self.keep_search_params
    }

    /// Registration origin
    #[inline]
    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Whether the descriptor has a predicate
    #[inline]
    #[must_use]
    pub fn is_conditional(&self) -> bool {
        self.predicate.is_some()
    }

    /// Whether the descriptor applies to `context`
    #[must_use]
    pub fn accepts(&self, context: &ViewContext) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(context))
    }

    pub(crate) fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Check required fields
    ///
    /// # Errors
    /// - `ViewError::InvalidDescriptor` if `id` or `extension_point` is blank
    pub fn validate(&self) -> Result<(), ViewError> {
        if self.extension_point.trim().is_empty() {
            return Err(ViewError::invalid(self, "missing extension point"));
        }
        if self.id.trim().is_empty() {
            return Err(ViewError::invalid(self, "missing id"));
        }
        Ok(())
    }
}

impl fmt::Debug for ViewDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewDescriptor")
            .field("id", &self.id)
            .field("extension_point", &self.extension_point)
            .field("priority", &self.priority)
            .field("label", &self.label)
            .field("template", &self.template)
            .field("controller", &self.controller)
            .field("keep_search_params", &self.keep_search_params)
            .field("conditional", &self.predicate.is_some())
            .field("origin", &self.origin)
            .finish()
    }
}

/// Builder for [`ViewDescriptor`]
///
/// Required fields are checked when the descriptor is registered.
#[derive(Debug, Clone)]
#[must_use]
pub struct ViewDescriptorBuilder {
    descriptor: ViewDescriptor,
}

impl ViewDescriptorBuilder {
    /// With priority
    #[inline]
    pub fn priority(mut self, priority: i32) -> Self {
        self.descriptor.priority = priority;
        self
    }

    /// With display label
    #[inline]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.descriptor.label = Some(label.into());
        self
    }

    /// With template reference
    #[inline]
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.descriptor.template = Some(TemplateRef(template.into()));
        self
    }

    /// With controller reference
    #[inline]
    pub fn controller(mut self, controller: impl Into<String>) -> Self {
        self.descriptor.controller = Some(ControllerRef(controller.into()));
        self
    }

    /// With search parameters kept on navigation
    pub fn keep_search_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor.keep_search_params = params.into_iter().map(Into::into).collect();
        self
    }

    /// With predicate over the runtime context
    pub fn predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ViewContext) -> bool + Send + Sync + 'static,
    {
        self.descriptor.predicate = Some(Arc::new(predicate));
        self
    }

    /// Finish the descriptor
    #[must_use]
    pub fn build(self) -> ViewDescriptor {
        self.descriptor
    }
}
