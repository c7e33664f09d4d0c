//! DataNode graph tests (asynchronous providers)
//!
//! Async providers run on a `LocalSet`, mirroring a single-threaded UI loop.

use cockpit_datadepend::{ComputationError, DataDependError, DataNode, Datum};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tokio::sync::oneshot;
use tokio::task::LocalSet;

type Pending = Rc<RefCell<Vec<oneshot::Sender<Result<Value, ComputationError>>>>>;

/// Provider whose results are released by the test
fn gated_provider(node: &DataNode, key: &str, calls: Rc<Cell<usize>>) -> Pending {
    let gates: Pending = Rc::new(RefCell::new(Vec::new()));
    let registry = gates.clone();
    node.provide_async(key, &[], move |_| {
        calls.set(calls.get() + 1);
        let (tx, rx) = oneshot::channel();
        registry.borrow_mut().push(tx);
        async move {
            rx.await
                .unwrap_or_else(|_| Err(ComputationError::new("gate dropped")))
        }
    })
    .unwrap();
    gates
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_async_provider_reports_pending_then_value() {
    LocalSet::new()
        .run_until(async {
            let node = DataNode::root();
            let calls = Rc::new(Cell::new(0));
            let gates = gated_provider(&node, "processInstance", calls.clone());

            let log = Rc::new(RefCell::new(Vec::new()));
            let sink = log.clone();
            let _sub = node
                .observe("processInstance", move |d| sink.borrow_mut().push(d.clone()))
                .unwrap();
            assert_eq!(*log.borrow(), vec![Datum::Pending]);

            let gate = gates.borrow_mut().remove(0);
            gate.send(Ok(json!({"id": "pi_1"}))).unwrap();
            settle().await;

            assert_eq!(
                *log.borrow(),
                vec![Datum::Pending, Datum::Resolved(json!({"id": "pi_1"}))]
            );
        })
        .await;
}

#[tokio::test]
async fn test_concurrent_observers_share_one_computation() {
    LocalSet::new()
        .run_until(async {
            let node = DataNode::root();
            let calls = Rc::new(Cell::new(0));
            let gates = gated_provider(&node, "tasks", calls.clone());

            let _a = node.observe("tasks", |_| {}).unwrap();
            let _b = node.observe("tasks", |_| {}).unwrap();
            assert_eq!(node.get("tasks").unwrap(), Datum::Pending);
            assert_eq!(calls.get(), 1);

            let gate = gates.borrow_mut().remove(0);
            gate.send(Ok(json!([]))).unwrap();

            assert_eq!(node.resolve("tasks").await.unwrap(), Some(json!([])));
            assert_eq!(calls.get(), 1);
        })
        .await;
}

#[tokio::test]
async fn test_dependent_waits_for_async_dependency() {
    LocalSet::new()
        .run_until(async {
            let node = DataNode::root();
            let calls = Rc::new(Cell::new(0));
            let gates = gated_provider(&node, "definition", calls);
            node.provide("title", &["definition"], |args| {
                Ok(args.require(0)?["name"].clone())
            })
            .unwrap();

            assert_eq!(node.get("title").unwrap(), Datum::Pending);

            let gate = gates.borrow_mut().remove(0);
            gate.send(Ok(json!({"name": "Invoice Receipt"}))).unwrap();

            assert_eq!(
                node.resolve("title").await.unwrap(),
                Some(json!("Invoice Receipt"))
            );
        })
        .await;
}

#[tokio::test]
async fn test_async_failure_resolves_to_error() {
    LocalSet::new()
        .run_until(async {
            let node = DataNode::root();
            node.provide_async("user", &[], |_| async {
                tokio::task::yield_now().await;
                Err::<Value, ComputationError>(anyhow::anyhow!("unauthorized").into())
            })
            .unwrap();

            let err = node.resolve("user").await.unwrap_err();
            match err {
                DataDependError::Computation(err) => {
                    assert_eq!(err.key(), Some("user"));
                    assert_eq!(err.message(), "unauthorized");
                }
                other => panic!("unexpected error: {other}"),
            }
        })
        .await;
}

#[tokio::test]
async fn test_disposed_node_never_receives_pending_result() {
    LocalSet::new()
        .run_until(async {
            let page = DataNode::root();
            let calls = Rc::new(Cell::new(0));
            let gates = gated_provider(&page, "incidents", calls);
            let region = page.create_child().unwrap();

            let delivered = Rc::new(Cell::new(0));
            let counter = delivered.clone();
            let _sub = region
                .observe("incidents", move |d| {
                    if d.is_settled() {
                        counter.set(counter.get() + 1);
                    }
                })
                .unwrap();

            region.dispose();
            let gate = gates.borrow_mut().remove(0);
            // the computation still runs to completion
            gate.send(Ok(json!([{"id": "inc_1"}]))).unwrap();
            settle().await;

            assert_eq!(delivered.get(), 0);
        })
        .await;
}

#[tokio::test]
async fn test_invalidation_discards_superseded_result() {
    LocalSet::new()
        .run_until(async {
            let node = DataNode::root();
            let calls = Rc::new(Cell::new(0));
            let gates = gated_provider(&node, "variables", calls.clone());

            let log = Rc::new(RefCell::new(Vec::new()));
            let sink = log.clone();
            let _sub = node
                .observe("variables", move |d| sink.borrow_mut().push(d.clone()))
                .unwrap();

            node.changed("variables").unwrap();
            assert_eq!(calls.get(), 2);

            let (stale, fresh) = {
                let mut gates = gates.borrow_mut();
                let stale = gates.remove(0);
                let fresh = gates.remove(0);
                (stale, fresh)
            };
            stale.send(Ok(json!("stale"))).unwrap();
            settle().await;
            fresh.send(Ok(json!("fresh"))).unwrap();
            settle().await;

            assert_eq!(
                *log.borrow(),
                vec![Datum::Pending, Datum::Resolved(json!("fresh"))]
            );
        })
        .await;
}

#[tokio::test]
async fn test_resolve_on_disposed_node_fails() {
    let node = DataNode::root();
    let child = node.create_child().unwrap();
    let id = child.id();
    drop(node);

    assert_eq!(
        child.resolve("anything").await,
        Err(DataDependError::Disposed { node: id })
    );
}

#[tokio::test]
async fn test_abandoned_resolve_stops_observing() {
    use futures::FutureExt;

    LocalSet::new()
        .run_until(async {
            let node = DataNode::root();
            let calls = Rc::new(Cell::new(0));
            let _gates = gated_provider(&node, "tasks", calls.clone());

            // gives up after the first poll, like a timed out select
            assert!(node.resolve("tasks").now_or_never().is_none());
            assert_eq!(calls.get(), 1);

            // nobody observes the key anymore, so nothing recomputes
            node.changed("tasks").unwrap();
            assert_eq!(calls.get(), 1);
            assert_eq!(node.get("tasks").unwrap(), Datum::Pending);
            assert_eq!(calls.get(), 2);
        })
        .await;
}
