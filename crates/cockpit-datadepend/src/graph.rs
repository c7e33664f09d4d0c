//! Graph state and evaluation
//!
//! All nodes of one tree live in a single arena behind `Rc<RefCell<_>>`.
//! Parents are referenced by id only; a node owns its children through the
//! `children` set and disposes them before itself.
//!
//! # Slots
//!
//! Each `(node, key)` pair that was ever requested has a slot holding its
//! state, generation and dependency edges. A provider inherited from an
//! ancestor is evaluated in the *requesting* node's slot with dependencies
//! resolved from that node, which is what gives per-child answers. Because of
//! that, dependency edges always connect slots of the same node; changes
//! crossing node boundaries are handled by [`GraphState::invalidate_scope`].
//!
//! # Notifications
//!
//! Callbacks never run while the arena is borrowed. State transitions push
//! deliveries onto a queue which [`Graph::flush`] drains once the operation
//! finished; re-entrant operations from inside a callback enqueue onto the
//! same queue and are delivered by the outer drain.
//!
//! Removed sources, nodes and subscriptions are moved out of the arena and
//! dropped after the borrow ends, since user closures may own node handles.
//! A handle dropped while the arena is borrowed anyway is queued on
//! [`Shared::deferred`] and released by the next operation.

use crate::datum::{Args, Datum};
use crate::error::{ComputationError, DataDependError, DataDependResult};
use crate::node::NodeId;
use futures::future::LocalBoxFuture;
use futures::FutureExt;
use indexmap::IndexSet;
use serde_json::Value;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::{Rc, Weak};

/// Boxed provider computation
pub(crate) type ComputeFn = Rc<dyn Fn(Args) -> LocalBoxFuture<'static, Result<Value, ComputationError>>>;

/// Provider declared on a node
pub(crate) struct Provider {
    pub(crate) deps: SmallVec<[String; 4]>,
    pub(crate) compute: ComputeFn,
}

/// Source declared on a node for one key
#[derive(Clone)]
pub(crate) enum Entry {
    Value(Value),
    Provider(Rc<Provider>),
}

/// Subscription identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct SubscriptionId(u64);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct SlotKey {
    node: NodeId,
    key: String,
}

impl SlotKey {
    fn new(node: NodeId, key: impl Into<String>) -> Self {
        Self {
            node,
            key: key.into(),
        }
    }
}

enum SlotState {
    /// Never computed, or invalidated
    Unresolved,
    /// Provider selected, waiting on dependencies
    Waiting,
    /// Provider future in flight
    Computing,
    Undefined,
    Resolved(Value),
    Failed(ComputationError),
}

impl SlotState {
    fn datum(&self) -> Datum {
        match self {
            Self::Unresolved | Self::Waiting | Self::Computing => Datum::Pending,
            Self::Undefined => Datum::Undefined,
            Self::Resolved(value) => Datum::Resolved(value.clone()),
            Self::Failed(err) => Datum::Failed(err.clone()),
        }
    }
}

struct Slot {
    state: SlotState,
    generation: u64,
    provider: Option<Rc<Provider>>,
    deps: SmallVec<[String; 4]>,
    dependents: IndexSet<String>,
    observers: IndexSet<SubscriptionId>,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: SlotState::Unresolved,
            generation: 0,
            provider: None,
            deps: SmallVec::new(),
            dependents: IndexSet::new(),
            observers: IndexSet::new(),
        }
    }
}

struct NodeEntry {
    parent: Option<NodeId>,
    children: IndexSet<NodeId>,
    entries: HashMap<String, Entry>,
    slots: HashMap<String, Slot>,
}

impl NodeEntry {
    fn new(parent: Option<NodeId>) -> Self {
        Self {
            parent,
            children: IndexSet::new(),
            entries: HashMap::new(),
            slots: HashMap::new(),
        }
    }
}

/// Observer callback
#[derive(Clone)]
pub(crate) enum Callback {
    Single(Rc<dyn Fn(&Datum)>),
    Joint(Rc<dyn Fn(&[Datum])>),
}

struct Subscription {
    node: NodeId,
    keys: SmallVec<[String; 2]>,
    callback: Callback,
}

/// Queued notification, paired with the callback it is for
enum Delivery {
    Single {
        subscription: SubscriptionId,
        callback: Rc<dyn Fn(&Datum)>,
        datum: Datum,
    },
    Joint {
        subscription: SubscriptionId,
        callback: Rc<dyn Fn(&[Datum])>,
        data: Vec<Datum>,
    },
}

impl Delivery {
    fn subscription(&self) -> SubscriptionId {
        match self {
            Self::Single { subscription, .. } | Self::Joint { subscription, .. } => *subscription,
        }
    }

    fn deliver(self) {
        match self {
            Self::Single { callback, datum, .. } => callback(&datum),
            Self::Joint { callback, data, .. } => callback(&data),
        }
    }
}

/// Arena values removed by an operation, dropped once the borrow is released
#[derive(Default)]
struct Released {
    nodes: Vec<NodeEntry>,
    subscriptions: Vec<Subscription>,
}

/// Release requested while the arena was borrowed
#[derive(Debug, Clone, Copy)]
enum Deferred {
    Dispose(NodeId),
    Cancel(SubscriptionId),
}

#[derive(Default)]
pub(crate) struct GraphState {
    nodes: HashMap<NodeId, NodeEntry>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    queue: VecDeque<Delivery>,
    visiting: HashSet<SlotKey>,
    draining: bool,
    next_node: u64,
    next_subscription: u64,
}

impl GraphState {
    fn alloc_node(&mut self, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.nodes.insert(id, NodeEntry::new(parent));
        id
    }

    /// Walk from `node` towards the root until some node declares `key`
    fn lookup(&self, node: NodeId, key: &str) -> Option<&Entry> {
        let mut current = Some(node);
        while let Some(id) = current {
            let entry = self.nodes.get(&id)?;
            if let Some(found) = entry.entries.get(key) {
                return Some(found);
            }
            current = entry.parent;
        }
        None
    }

    fn slot(&self, slot: &SlotKey) -> Option<&Slot> {
        self.nodes.get(&slot.node)?.slots.get(&slot.key)
    }

    fn slot_mut(&mut self, slot: &SlotKey) -> Option<&mut Slot> {
        self.nodes.get_mut(&slot.node)?.slots.get_mut(&slot.key)
    }

    fn slot_or_insert(&mut self, slot: &SlotKey) -> Option<&mut Slot> {
        let node = self.nodes.get_mut(&slot.node)?;
        Some(node.slots.entry(slot.key.clone()).or_insert_with(Slot::new))
    }

    fn datum(&self, slot: &SlotKey) -> Datum {
        self.slot(slot).map_or(Datum::Pending, |s| s.state.datum())
    }

    /// Replace the dependency edges of `slot`
    fn rewire(&mut self, slot: &SlotKey, deps: &SmallVec<[String; 4]>) {
        let Some(node) = self.nodes.get_mut(&slot.node) else {
            return;
        };
        let old = node
            .slots
            .get(&slot.key)
            .map(|s| s.deps.clone())
            .unwrap_or_default();
        for dep in &old {
            if let Some(dep_slot) = node.slots.get_mut(dep) {
                dep_slot.dependents.shift_remove(&slot.key);
            }
        }
        for dep in deps {
            node.slots
                .entry(dep.clone())
                .or_insert_with(Slot::new)
                .dependents
                .insert(slot.key.clone());
        }
        if let Some(s) = node.slots.get_mut(&slot.key) {
            s.deps.clone_from(deps);
        }
    }

    /// Mark `slot` and its transitive dependents stale
    fn invalidate_slot(&mut self, slot: &SlotKey, stale: &mut Vec<SlotKey>) {
        let Some(node) = self.nodes.get_mut(&slot.node) else {
            return;
        };
        let mut work = vec![slot.key.clone()];
        while let Some(key) = work.pop() {
            let Some(s) = node.slots.get_mut(&key) else {
                continue;
            };
            if matches!(s.state, SlotState::Unresolved) {
                continue;
            }
            s.state = SlotState::Unresolved;
            s.generation += 1;
            s.provider = None;
            work.extend(s.dependents.iter().rev().cloned());
            stale.push(SlotKey::new(slot.node, key));
        }
    }

    /// Invalidate `key` at `node` and in every descendant that resolves it
    /// through `node` (descendants declaring their own `key` are skipped).
    fn invalidate_scope(&mut self, node: NodeId, key: &str) -> Vec<SlotKey> {
        let mut stale = Vec::new();
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            self.invalidate_slot(&SlotKey::new(id, key), &mut stale);
            if let Some(entry) = self.nodes.get(&id) {
                for child in entry.children.iter().rev() {
                    let shadowed = self
                        .nodes
                        .get(child)
                        .is_some_and(|c| c.entries.contains_key(key));
                    if !shadowed {
                        stack.push(*child);
                    }
                }
            }
        }
        stale
    }

    fn delivery_for(&self, id: SubscriptionId) -> Option<Delivery> {
        let sub = self.subscriptions.get(&id)?;
        match &sub.callback {
            Callback::Single(callback) => {
                let key = sub.keys.first()?;
                Some(Delivery::Single {
                    subscription: id,
                    callback: callback.clone(),
                    datum: self.datum(&SlotKey::new(sub.node, key.as_str())),
                })
            }
            Callback::Joint(callback) => {
                let data: Vec<Datum> = sub
                    .keys
                    .iter()
                    .map(|k| self.datum(&SlotKey::new(sub.node, k.as_str())))
                    .collect();
                data.iter().all(Datum::is_settled).then(|| Delivery::Joint {
                    subscription: id,
                    callback: callback.clone(),
                    data,
                })
            }
        }
    }

    fn enqueue(&mut self, id: SubscriptionId) {
        if let Some(delivery) = self.delivery_for(id) {
            self.queue.push_back(delivery);
        }
    }

    fn enqueue_observers(&mut self, slot: &SlotKey) {
        let observers: Vec<SubscriptionId> = self
            .slot(slot)
            .map(|s| s.observers.iter().copied().collect())
            .unwrap_or_default();
        for id in observers {
            self.enqueue(id);
        }
    }

    fn remove_subscription(&mut self, id: SubscriptionId) -> Option<Subscription> {
        let sub = self.subscriptions.remove(&id)?;
        if let Some(node) = self.nodes.get_mut(&sub.node) {
            for key in &sub.keys {
                if let Some(slot) = node.slots.get_mut(key) {
                    slot.observers.shift_remove(&id);
                }
            }
        }
        Some(sub)
    }

    /// Dispose `id` and its subtree, children first
    fn dispose(&mut self, id: NodeId, released: &mut Released) -> bool {
        let Some(entry) = self.nodes.get(&id) else {
            return false;
        };
        let children: Vec<NodeId> = entry.children.iter().copied().collect();
        for child in children {
            self.dispose(child, released);
        }

        let Some(entry) = self.nodes.remove(&id) else {
            return false;
        };
        for slot in entry.slots.values() {
            released
                .subscriptions
                .extend(slot.observers.iter().filter_map(|sub| self.subscriptions.remove(sub)));
        }
        if let Some(parent) = entry.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.shift_remove(&id);
        }
        self.visiting.retain(|s| s.node != id);
        released.nodes.push(entry);
        tracing::debug!(node = %id, "disposed data node");
        true
    }
}

/// Arena plus the releases waiting for it to become free
pub(crate) struct Shared {
    state: RefCell<GraphState>,
    deferred: RefCell<VecDeque<Deferred>>,
}

/// Weak reference held by subscriptions and in-flight tasks
pub(crate) type WeakGraph = Weak<Shared>;

/// Shared handle to a graph arena
#[derive(Clone)]
pub(crate) struct Graph {
    inner: Rc<Shared>,
}

struct DrainGuard<'a>(&'a RefCell<GraphState>);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.borrow_mut().draining = false;
    }
}

impl Graph {
    /// Create a graph with its root node
    pub(crate) fn new() -> (Self, NodeId) {
        let mut state = GraphState::default();
        let root = state.alloc_node(None);
        (
            Self {
                inner: Rc::new(Shared {
                    state: RefCell::new(state),
                    deferred: RefCell::default(),
                }),
            },
            root,
        )
    }

    pub(crate) fn downgrade(&self) -> WeakGraph {
        Rc::downgrade(&self.inner)
    }

    /// Rebuild a handle from a weak reference, if the graph is still alive
    pub(crate) fn upgrade(weak: &WeakGraph) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub(crate) fn is_live(&self, node: NodeId) -> bool {
        self.inner.state.borrow().nodes.contains_key(&node)
    }

    fn ensure_live(&self, node: NodeId) -> DataDependResult<()> {
        if self.is_live(node) {
            Ok(())
        } else {
            Err(DataDependError::Disposed { node })
        }
    }

    pub(crate) fn create_child(&self, parent: NodeId) -> DataDependResult<NodeId> {
        self.ensure_live(parent)?;
        let mut st = self.inner.state.borrow_mut();
        let child = st.alloc_node(Some(parent));
        if let Some(entry) = st.nodes.get_mut(&parent) {
            entry.children.insert(child);
        }
        tracing::debug!(node = %child, parent = %parent, "created data node");
        Ok(child)
    }

    /// Declare `entry` for `key` on `node`, replacing any previous one
    pub(crate) fn declare(&self, node: NodeId, key: &str, entry: Entry) -> DataDependResult<()> {
        self.ensure_live(node)?;
        // the replaced source is dropped after the borrow ends
        let (replaced, stale) = {
            let mut st = self.inner.state.borrow_mut();
            let replaced = st
                .nodes
                .get_mut(&node)
                .and_then(|n| n.entries.insert(key.to_owned(), entry));
            tracing::debug!(node = %node, key, replaced = replaced.is_some(), "declared data source");
            let stale = st.invalidate_scope(node, key);
            (replaced, stale)
        };
        drop(replaced);
        self.refresh(stale);
        self.flush();
        Ok(())
    }

    pub(crate) fn changed(&self, node: NodeId, key: &str) -> DataDependResult<()> {
        self.ensure_live(node)?;
        let stale = self.inner.state.borrow_mut().invalidate_scope(node, key);
        tracing::debug!(node = %node, key, invalidated = stale.len(), "source changed");
        self.refresh(stale);
        self.flush();
        Ok(())
    }

    pub(crate) fn get(&self, node: NodeId, key: &str) -> DataDependResult<Datum> {
        self.ensure_live(node)?;
        let slot = SlotKey::new(node, key);
        self.demand(&slot);
        self.flush();
        Ok(self.inner.state.borrow().datum(&slot))
    }

    pub(crate) fn observe(
        &self,
        node: NodeId,
        keys: SmallVec<[String; 2]>,
        callback: Callback,
    ) -> DataDependResult<SubscriptionId> {
        self.ensure_live(node)?;
        for key in &keys {
            self.demand(&SlotKey::new(node, key.as_str()));
        }
        let id = {
            let mut st = self.inner.state.borrow_mut();
            let id = SubscriptionId(st.next_subscription);
            st.next_subscription += 1;
            for key in &keys {
                if let Some(slot) = st.slot_or_insert(&SlotKey::new(node, key.as_str())) {
                    slot.observers.insert(id);
                }
            }
            st.subscriptions.insert(
                id,
                Subscription {
                    node,
                    keys,
                    callback,
                },
            );
            st.enqueue(id);
            id
        };
        self.flush();
        Ok(id)
    }

    /// Remove a subscription; `false` if it was already gone
    pub(crate) fn cancel(&self, id: SubscriptionId) -> bool {
        let Ok(mut st) = self.inner.state.try_borrow_mut() else {
            self.defer(Deferred::Cancel(id));
            return true;
        };
        let removed = st.remove_subscription(id);
        drop(st);
        let cancelled = removed.is_some();
        drop(removed);
        self.release_deferred();
        cancelled
    }

    pub(crate) fn is_subscribed(&self, id: SubscriptionId) -> bool {
        self.inner.state.borrow().subscriptions.contains_key(&id)
    }

    /// Dispose `node` and its subtree; `false` if it was already gone
    pub(crate) fn dispose(&self, node: NodeId) -> bool {
        let Ok(mut st) = self.inner.state.try_borrow_mut() else {
            self.defer(Deferred::Dispose(node));
            return true;
        };
        let mut released = Released::default();
        let disposed = st.dispose(node, &mut released);
        drop(st);
        drop(released);
        self.release_deferred();
        disposed
    }

    fn defer(&self, release: Deferred) {
        tracing::trace!(?release, "arena busy, deferring release");
        self.inner.deferred.borrow_mut().push_back(release);
    }

    /// Run releases requested while the arena was borrowed
    fn release_deferred(&self) {
        loop {
            if self.inner.state.try_borrow_mut().is_err() {
                return;
            }
            let next = self.inner.deferred.borrow_mut().pop_front();
            match next {
                Some(Deferred::Dispose(node)) => {
                    self.dispose(node);
                }
                Some(Deferred::Cancel(id)) => {
                    self.cancel(id);
                }
                None => return,
            }
        }
    }

    /// Recompute stale slots that somebody still observes
    fn refresh(&self, stale: Vec<SlotKey>) {
        for slot in stale {
            let observed = self
                .inner
                .state
                .borrow()
                .slot(&slot)
                .is_some_and(|s| !s.observers.is_empty());
            if observed {
                self.demand(&slot);
            }
        }
    }

    /// Bring `slot` towards a settled state, computing dependencies first
    fn demand(&self, slot: &SlotKey) {
        enum Source {
            Settled(SlotState),
            Cycle,
            Provider(SmallVec<[String; 4]>),
        }

        let source = {
            let mut st = self.inner.state.borrow_mut();
            let in_cycle = st.visiting.contains(slot);
            let waiting = match st.slot_or_insert(slot).map(|s| &s.state) {
                Some(SlotState::Unresolved) => false,
                Some(SlotState::Waiting) => true,
                _ => return,
            };
            if waiting {
                if !in_cycle {
                    return;
                }
                Source::Cycle
            } else {
                match st.lookup(slot.node, &slot.key).cloned() {
                    None => Source::Settled(SlotState::Undefined),
                    Some(Entry::Value(value)) => Source::Settled(SlotState::Resolved(value)),
                    Some(Entry::Provider(provider)) => {
                        let deps = provider.deps.clone();
                        st.rewire(slot, &deps);
                        if let Some(s) = st.slot_mut(slot) {
                            s.state = SlotState::Waiting;
                            s.provider = Some(provider);
                        }
                        st.visiting.insert(slot.clone());
                        Source::Provider(deps)
                    }
                }
            }
        };

        match source {
            Source::Settled(state) => self.complete(slot, state),
            Source::Cycle => {
                tracing::warn!(node = %slot.node, key = %slot.key, "dependency cycle detected");
                self.complete(slot, SlotState::Failed(ComputationError::cycle(&slot.key)));
            }
            Source::Provider(deps) => {
                for dep in deps {
                    self.demand(&SlotKey::new(slot.node, dep));
                }
                self.inner.state.borrow_mut().visiting.remove(slot);
                self.resume(slot);
            }
        }
    }

    /// Run the provider of a waiting slot once all its dependencies settled
    fn resume(&self, slot: &SlotKey) {
        enum Step {
            Wait(Vec<SlotKey>),
            Inherit(ComputationError),
            Run(Rc<Provider>, Args, u64),
        }

        let step = {
            let mut st = self.inner.state.borrow_mut();
            let Some(s) = st.slot(slot) else {
                return;
            };
            if !matches!(s.state, SlotState::Waiting) {
                return;
            }
            let Some(provider) = s.provider.clone() else {
                return;
            };

            let mut values = Vec::with_capacity(provider.deps.len());
            let mut unresolved = Vec::new();
            let mut pending = false;
            let mut failure = None;
            for dep in &provider.deps {
                let dep_key = SlotKey::new(slot.node, dep.as_str());
                match st.slot(&dep_key).map(|d| &d.state) {
                    Some(SlotState::Resolved(value)) => values.push(Some(value.clone())),
                    Some(SlotState::Undefined) => values.push(None),
                    Some(SlotState::Failed(err)) => {
                        failure.get_or_insert_with(|| err.clone());
                    }
                    Some(SlotState::Waiting | SlotState::Computing) => pending = true,
                    Some(SlotState::Unresolved) | None => unresolved.push(dep_key),
                }
            }

            if pending || !unresolved.is_empty() {
                Step::Wait(unresolved)
            } else if let Some(err) = failure {
                Step::Inherit(err)
            } else {
                let Some(s) = st.slot_mut(slot) else {
                    return;
                };
                s.state = SlotState::Computing;
                let generation = s.generation;
                let args = Args::new(provider.deps.clone(), values);
                Step::Run(provider, args, generation)
            }
        };

        match step {
            Step::Wait(unresolved) => {
                for dep in unresolved {
                    self.demand(&dep);
                }
            }
            Step::Inherit(err) => self.complete(slot, SlotState::Failed(err)),
            Step::Run(provider, args, generation) => {
                tracing::trace!(node = %slot.node, key = %slot.key, generation, "computing");
                let future = (provider.compute)(args);
                self.run(slot.clone(), generation, future);
            }
        }
    }

    /// Settle synchronously when the future is ready, otherwise on a local task
    fn run(
        &self,
        slot: SlotKey,
        generation: u64,
        mut future: LocalBoxFuture<'static, Result<Value, ComputationError>>,
    ) {
        if let Some(result) = future.as_mut().now_or_never() {
            self.settle(&slot, generation, result);
            return;
        }

        if tokio::runtime::Handle::try_current().is_err() {
            tracing::warn!(node = %slot.node, key = %slot.key, "provider suspended without a runtime");
            self.settle(
                &slot,
                generation,
                Err(ComputationError::new("provider suspended outside of a tokio runtime")),
            );
            return;
        }

        tracing::trace!(node = %slot.node, key = %slot.key, "provider suspended");
        let weak = self.downgrade();
        tokio::task::spawn_local(async move {
            let result = future.await;
            if let Some(inner) = weak.upgrade() {
                let graph = Graph { inner };
                graph.settle(&slot, generation, result);
                graph.flush();
            }
        });
    }

    fn settle(&self, slot: &SlotKey, generation: u64, result: Result<Value, ComputationError>) {
        let current = self.inner.state.borrow().slot(slot).is_some_and(|s| {
            s.generation == generation && matches!(s.state, SlotState::Computing)
        });
        if !current {
            tracing::trace!(node = %slot.node, key = %slot.key, generation, "discarding superseded result");
            return;
        }
        let state = match result {
            Ok(value) => SlotState::Resolved(value),
            Err(err) => {
                let err = err.with_key(&slot.key);
                tracing::debug!(node = %slot.node, key = %slot.key, error = %err, "provider failed");
                SlotState::Failed(err)
            }
        };
        self.complete(slot, state);
    }

    /// Store a settled state, notify observers, and resume waiting dependents
    fn complete(&self, slot: &SlotKey, state: SlotState) {
        let waiting: Vec<SlotKey> = {
            let mut st = self.inner.state.borrow_mut();
            let Some(s) = st.slot_mut(slot) else {
                return;
            };
            s.state = state;
            s.provider = None;
            let dependents: Vec<String> = s.dependents.iter().cloned().collect();
            st.enqueue_observers(slot);
            dependents
                .into_iter()
                .map(|key| SlotKey::new(slot.node, key))
                .filter(|dep| {
                    !st.visiting.contains(dep)
                        && st
                            .slot(dep)
                            .is_some_and(|d| matches!(d.state, SlotState::Waiting))
                })
                .collect()
        };
        for dependent in waiting {
            self.resume(&dependent);
        }
    }

    /// Deliver queued notifications, unless an outer call is already draining
    pub(crate) fn flush(&self) {
        {
            let mut st = self.inner.state.borrow_mut();
            if st.draining {
                return;
            }
            st.draining = true;
        }
        {
            let _guard = DrainGuard(&self.inner.state);
            loop {
                let (next, skipped) = {
                    let mut st = self.inner.state.borrow_mut();
                    let mut skipped = Vec::new();
                    let mut next = None;
                    while let Some(delivery) = st.queue.pop_front() {
                        // cancelled or disposed subscriptions are skipped
                        if st.subscriptions.contains_key(&delivery.subscription()) {
                            next = Some(delivery);
                            break;
                        }
                        skipped.push(delivery);
                    }
                    (next, skipped)
                };
                drop(skipped);
                let Some(delivery) = next else {
                    break;
                };
                delivery.deliver();
            }
        }
        self.release_deferred();
    }
}
