//! Data node handles
//!
//! A [`DataNode`] is the owning handle of one node in a data graph. Dropping
//! it (or calling [`DataNode::dispose`]) disposes the node and its subtree.

use crate::datum::{Args, Datum};
use crate::error::{ComputationError, DataDependError, DataDependResult};
use crate::graph::{Callback, Entry, Graph, Provider, SubscriptionId, WeakGraph};
use futures::FutureExt;
use serde_json::Value;
use smallvec::SmallVec;
use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::rc::Rc;
use tokio::sync::oneshot;

/// Unique node identifier within a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Owning handle to a node of a data-dependency graph
///
/// Lookups walk from this node towards the root; a key declared here shadows
/// the same key declared by any ancestor, for this node and its descendants.
///
/// # Example
///
/// ```rust
/// use cockpit_datadepend::{DataNode, Datum};
/// use serde_json::json;
///
/// let page = DataNode::root();
/// page.set("a", json!(2)).unwrap();
/// page.set("b", json!(3)).unwrap();
/// page.provide("total", &["a", "b"], |args| {
///     Ok(json!(args.require_i64(0)? + args.require_i64(1)?))
/// })
/// .unwrap();
///
/// let region = page.create_child().unwrap();
/// region.set("a", json!(10)).unwrap();
///
/// assert_eq!(region.get("total").unwrap(), Datum::Resolved(json!(13)));
/// assert_eq!(page.get("total").unwrap(), Datum::Resolved(json!(5)));
/// ```
pub struct DataNode {
    graph: Graph,
    id: NodeId,
}

impl DataNode {
    /// Create a new graph and return its root node
    #[must_use]
    pub fn root() -> Self {
        let (graph, id) = Graph::new();
        tracing::debug!(node = %id, "created root data node");
        Self { graph, id }
    }

    /// Node identifier
    #[inline]
    #[must_use]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Whether the node (or one of its ancestors) has been disposed
    #[inline]
    #[must_use]
    pub fn is_disposed(&self) -> bool {
        !self.graph.is_live(self.id)
    }

    /// Create a child node inheriting this node's sources
    ///
    /// # Errors
    /// - `DataDependError::Disposed` if this node was disposed
    pub fn create_child(&self) -> DataDependResult<DataNode> {
        let id = self.graph.create_child(self.id)?;
        Ok(DataNode {
            graph: self.graph.clone(),
            id,
        })
    }

    /// Declare a synchronous provider for `key`
    ///
    /// `compute` receives the values of `deps` resolved from the node that
    /// requests `key`. Re-declaring a key on the same node replaces the
    /// provider and immediately recomputes observed dependents.
    ///
    /// # Errors
    /// - `DataDependError::Disposed` if this node was disposed
    pub fn provide<F>(&self, key: &str, deps: &[&str], compute: F) -> DataDependResult<()>
    where
        F: Fn(&Args) -> Result<Value, ComputationError> + 'static,
    {
        let provider = Provider {
            deps: deps.iter().map(|d| (*d).to_owned()).collect(),
            compute: Rc::new(move |args: Args| futures::future::ready(compute(&args)).boxed_local()),
        };
        self.graph
            .declare(self.id, key, Entry::Provider(Rc::new(provider)))
    }

    /// Declare an asynchronous provider for `key`
    ///
    /// The returned future runs on the current `tokio` local task set when it
    /// does not complete on its first poll; until then the key is pending.
    ///
    /// # Errors
    /// - `DataDependError::Disposed` if this node was disposed
    pub fn provide_async<F, Fut>(&self, key: &str, deps: &[&str], compute: F) -> DataDependResult<()>
    where
        F: Fn(Args) -> Fut + 'static,
        Fut: Future<Output = Result<Value, ComputationError>> + 'static,
    {
        let provider = Provider {
            deps: deps.iter().map(|d| (*d).to_owned()).collect(),
            compute: Rc::new(move |args: Args| compute(args).boxed_local()),
        };
        self.graph
            .declare(self.id, key, Entry::Provider(Rc::new(provider)))
    }

    /// Declare one computation producing several keys
    ///
    /// `compute` must return exactly one value per key, in order; a different
    /// count settles every key as failed.
    ///
    /// # Errors
    /// - `DataDependError::Disposed` if this node was disposed
    pub fn provide_many<F>(&self, keys: &[&str], deps: &[&str], compute: F) -> DataDependResult<()>
    where
        F: Fn(&Args) -> Result<Vec<Value>, ComputationError> + 'static,
    {
        let group = format!("\u{0}({})", keys.join(","));
        let expected = keys.len();
        self.provide(&group, deps, move |args| {
            let values = compute(args)?;
            if values.len() != expected {
                return Err(ComputationError::new(format!(
                    "expected {expected} values, provider returned {}",
                    values.len()
                )));
            }
            Ok(Value::Array(values))
        })?;

        for (idx, key) in keys.iter().enumerate() {
            self.provide(key, &[group.as_str()], move |args| {
                Ok(args.require(0)?.get(idx).cloned().unwrap_or(Value::Null))
            })?;
        }
        Ok(())
    }

    /// Declare a static value for `key` on this node
    ///
    /// Shadows ancestors without mutating them and recomputes observed
    /// dependents.
    ///
    /// # Errors
    /// - `DataDependError::Disposed` if this node was disposed
    pub fn set(&self, key: &str, value: Value) -> DataDependResult<()> {
        self.graph.declare(self.id, key, Entry::Value(value))
    }

    /// Signal that the external source behind `key` changed
    ///
    /// Invalidates `key` here and in descendants that inherit it, then every
    /// key depending on it. Only observed keys are recomputed right away.
    /// A key nobody requested is a no-op.
    ///
    /// # Errors
    /// - `DataDependError::Disposed` if this node was disposed
    pub fn changed(&self, key: &str) -> DataDependResult<()> {
        self.graph.changed(self.id, key)
    }

    /// Observe `key`
    ///
    /// `callback` runs once immediately with the current datum (possibly
    /// [`Datum::Pending`] or [`Datum::Undefined`]) and again after every
    /// settled change, until the subscription is cancelled or the node is
    /// disposed.
    ///
    /// # Errors
    /// - `DataDependError::Disposed` if this node was disposed
    pub fn observe<F>(&self, key: &str, callback: F) -> DataDependResult<Subscription>
    where
        F: Fn(&Datum) + 'static,
    {
        let keys: SmallVec<[String; 2]> = SmallVec::from_elem(key.to_owned(), 1);
        let id = self
            .graph
            .observe(self.id, keys, Callback::Single(Rc::new(callback)))?;
        Ok(Subscription {
            graph: self.graph.downgrade(),
            id,
        })
    }

    /// Observe several keys jointly
    ///
    /// `callback` receives one datum per key, and only once every key has
    /// settled. Keys invalidated by the same change are reported together.
    ///
    /// # Errors
    /// - `DataDependError::Disposed` if this node was disposed
    pub fn observe_all<F>(&self, keys: &[&str], callback: F) -> DataDependResult<Subscription>
    where
        F: Fn(&[Datum]) + 'static,
    {
        let keys = keys.iter().map(|k| (*k).to_owned()).collect();
        let id = self
            .graph
            .observe(self.id, keys, Callback::Joint(Rc::new(callback)))?;
        Ok(Subscription {
            graph: self.graph.downgrade(),
            id,
        })
    }

    /// Current datum of `key`, computing it if needed
    ///
    /// # Errors
    /// - `DataDependError::Disposed` if this node was disposed
    pub fn get(&self, key: &str) -> DataDependResult<Datum> {
        self.graph.get(self.id, key)
    }

    /// Wait until `key` settles
    ///
    /// # Errors
    /// - `DataDependError::Computation` if the key settled as failed
    /// - `DataDependError::Disposed` if the node is or becomes disposed
    pub async fn resolve(&self, key: &str) -> DataDependResult<Option<Value>> {
        let (tx, rx) = oneshot::channel();
        let tx = RefCell::new(Some(tx));
        let subscription = self.observe(key, move |datum| {
            if let Some(result) = datum.clone().into_result() {
                if let Some(tx) = tx.borrow_mut().take() {
                    let _ = tx.send(result);
                }
            }
        })?;

        let outcome = rx.await;
        drop(subscription);
        match outcome {
            Ok(result) => Ok(result?),
            Err(_) => Err(DataDependError::Disposed { node: self.id }),
        }
    }

    /// Dispose the node, its children first
    ///
    /// In-flight computations keep running but their results are never
    /// delivered to this subtree.
    pub fn dispose(self) {
        drop(self);
    }
}

// Safe while the arena is borrowed: disposal is then deferred to the end of
// the running operation.
impl Drop for DataNode {
    fn drop(&mut self) {
        self.graph.dispose(self.id);
    }
}

impl fmt::Debug for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataNode")
            .field("id", &self.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Handle to an observer registration
///
/// The observer stays registered while the handle lives. Dropping the handle
/// or calling [`Subscription::cancel`] removes it.
#[derive(Debug)]
#[must_use = "dropping the handle cancels the observer"]
pub struct Subscription {
    graph: WeakGraph,
    id: SubscriptionId,
}

impl Subscription {
    /// Remove the observer. Safe to call more than once.
    pub fn cancel(&self) {
        if let Some(graph) = Graph::upgrade(&self.graph) {
            if graph.cancel(self.id) {
                tracing::trace!(subscription = ?self.id, "cancelled subscription");
            }
        }
    }

    /// Whether the observer is still registered
    #[must_use]
    pub fn is_active(&self) -> bool {
        Graph::upgrade(&self.graph).is_some_and(|g| g.is_subscribed(self.id))
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
