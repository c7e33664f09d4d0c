//! Cockpit data dependencies
//!
//! Lazily evaluated, cached, hierarchical key/value graph shared by the views
//! of one page region.
//!
//! # Core Concepts
//!
//! - [`DataNode`]: owning handle to a node; children inherit their ancestors'
//!   sources and may shadow them
//! - Providers: functions computing a key from other keys, declared with
//!   [`DataNode::provide`] / [`DataNode::provide_async`]
//! - [`Datum`]: what observers see (`Undefined`, `Pending`, `Resolved`, `Failed`)
//! - [`Subscription`]: handle to an observer registration
//!
//! # Evaluation
//!
//! A value is computed at most once per invalidation generation, on demand.
//! An inherited provider runs with its dependencies resolved from the node
//! that asked for the key, so one provider declared on a page node yields
//! per-region answers in regions that shadow its inputs.
//!
//! Provider failures are captured as values: observers receive
//! [`Datum::Failed`] and dependents inherit the failure until the caller
//! invalidates the source again with [`DataNode::changed`].
//!
//! The graph is single-threaded (`!Send`). Asynchronous providers are driven
//! by `tokio::task::spawn_local`, so they need a `LocalSet` (or a current
//! thread runtime running one) when they do not complete immediately. With
//! no runtime at all, a suspended provider settles as [`Datum::Failed`].
//!
//! Dropping a [`Subscription`] cancels it; dropping a [`DataNode`] disposes
//! its subtree. Closures handed to the graph may own either.
//!
//! # Example
//!
//! ```rust
//! use cockpit_datadepend::{DataNode, Datum};
//! use serde_json::json;
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! let node = DataNode::root();
//! node.set("count", json!(1)).unwrap();
//! node.provide("double", &["count"], |args| Ok(json!(args.require_i64(0)? * 2)))
//!     .unwrap();
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let _sub = node
//!     .observe("double", move |datum| sink.borrow_mut().push(datum.clone()))
//!     .unwrap();
//!
//! node.set("count", json!(5)).unwrap();
//! assert_eq!(
//!     *seen.borrow(),
//!     vec![Datum::Resolved(json!(2)), Datum::Resolved(json!(10))]
//! );
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod datum;
mod error;
mod graph;
mod node;

// Re-exports
pub use datum::{Args, Datum};
pub use error::{ComputationError, DataDependError, DataDependResult};
pub use node::{DataNode, NodeId, Subscription};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
