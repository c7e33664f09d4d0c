//! Testing utilities for the cockpit workspace
//!
//! Shared test helpers, fixtures, and assertions.

#![allow(missing_docs)]

use cockpit_compose::{RegionScope, RenderError, Renderer, ViewHandle};
use cockpit_datadepend::{Args, ComputationError, DataNode, Datum, Subscription};
use cockpit_views::{ViewDescriptor, ViewRegistry};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

/// Key the recording renderer observes to tell whether a region's node is alive
pub const PROBE_KEY: &str = "__render_probe";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderEvent {
    Mounted {
        view: String,
        position: usize,
        handle: ViewHandle,
    },
    Unmounted {
        view: String,
        handle: ViewHandle,
        /// Whether the region's data node was already disposed
        data_disposed: bool,
    },
}

#[derive(Debug)]
struct Output {
    handle: ViewHandle,
    view: String,
    probe: Subscription,
}

/// Renderer that records every mount and unmount
///
/// Keeps its outputs in display order, inserting at the mount position.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    events: Vec<RenderEvent>,
    outputs: Vec<Output>,
    failing: HashSet<String>,
    next_handle: u64,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject mounts of view `id`
    pub fn fail_on(mut self, id: &str) -> Self {
        self.failing.insert(id.to_owned());
        self
    }

    /// Stop rejecting view `id`
    pub fn accept(&mut self, id: &str) {
        self.failing.remove(id);
    }

    pub fn events(&self) -> &[RenderEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<RenderEvent> {
        std::mem::take(&mut self.events)
    }

    /// Views currently displayed, in display order
    pub fn displayed(&self) -> Vec<&str> {
        self.outputs.iter().map(|o| o.view.as_str()).collect()
    }

    /// Ids of unmounted views, in unmount order
    pub fn unmounted(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                RenderEvent::Unmounted { view, .. } => Some(view.as_str()),
                RenderEvent::Mounted { .. } => None,
            })
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn mount(&mut self, scope: &RegionScope<'_>) -> Result<ViewHandle, RenderError> {
        let view = scope.descriptor.id().to_owned();
        if self.failing.contains(&view) {
            return Err(RenderError::new(view, "rejected by test renderer"));
        }

        let probe = scope
            .data
            .observe(PROBE_KEY, |_| {})
            .map_err(|e| RenderError::new(view.clone(), e.to_string()))?;

        self.next_handle += 1;
        let handle = ViewHandle::new(self.next_handle);
        let position = scope.position.min(self.outputs.len());
        self.outputs.insert(
            position,
            Output {
                handle,
                view: view.clone(),
                probe,
            },
        );
        self.events.push(RenderEvent::Mounted {
            view,
            position: scope.position,
            handle,
        });
        Ok(handle)
    }

    fn unmount(&mut self, handle: ViewHandle) {
        let Some(idx) = self.outputs.iter().position(|o| o.handle == handle) else {
            panic!("unmount of unknown handle {handle}");
        };
        let output = self.outputs.remove(idx);
        let data_disposed = !output.probe.is_active();
        output.probe.cancel();
        self.events.push(RenderEvent::Unmounted {
            view: output.view,
            handle,
            data_disposed,
        });
    }
}

/// Records every datum delivered to an observer
#[derive(Debug, Clone, Default)]
pub struct DatumLog(Rc<RefCell<Vec<Datum>>>);

impl DatumLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback appending to this log
    pub fn observer(&self) -> impl Fn(&Datum) + 'static {
        let entries = self.0.clone();
        move |datum| entries.borrow_mut().push(datum.clone())
    }

    pub fn entries(&self) -> Vec<Datum> {
        self.0.borrow().clone()
    }

    /// Resolved values only
    pub fn values(&self) -> Vec<Value> {
        self.0
            .borrow()
            .iter()
            .filter_map(|d| d.value().cloned())
            .collect()
    }

    pub fn last(&self) -> Option<Datum> {
        self.0.borrow().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

/// Synchronous provider that counts its computations
pub fn counting_provider<F>(node: &DataNode, key: &str, deps: &[&str], compute: F) -> Rc<Cell<usize>>
where
    F: Fn(&Args) -> Result<Value, ComputationError> + 'static,
{
    let calls = Rc::new(Cell::new(0));
    let counter = calls.clone();
    node.provide(key, deps, move |args| {
        counter.set(counter.get() + 1);
        compute(args)
    })
    .unwrap();
    calls
}

pub fn view(extension_point: &str, id: &str, priority: i32) -> ViewDescriptor {
    ViewDescriptor::builder(extension_point, id)
        .priority(priority)
        .build()
}

/// View shown only when the context flag `flag` is set
pub fn flagged_view(extension_point: &str, id: &str, priority: i32, flag: &'static str) -> ViewDescriptor {
    ViewDescriptor::builder(extension_point, id)
        .priority(priority)
        .predicate(move |ctx| ctx.flag(flag))
        .build()
}

pub fn registry_with(views: impl IntoIterator<Item = ViewDescriptor>) -> ViewRegistry {
    let mut registry = ViewRegistry::new();
    for descriptor in views {
        registry.register(descriptor).unwrap();
    }
    registry
}
