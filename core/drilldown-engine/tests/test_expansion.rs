//! FILENAME: core/drilldown-engine/tests/test_expansion.rs
//! PURPOSE: Lazy expansion - fetch, cache reuse, leaves and failures.

mod common;

use common::*;
use drilldown_engine::{
    ExplorerError, LoadState, LoadStatus, NodeId, TransportError, ViewEvent,
};

// ============================================================================
// SESSION START
// ============================================================================

#[tokio::test]
async fn test_start_loads_root_level() {
    let (controller, _) = explorer(geo_source());
    let outcome = controller.start().await.unwrap();

    assert_eq!(outcome.node, NodeId::ROOT);
    assert_eq!(outcome.status, LoadStatus::Fetched);
    assert_eq!(labels(&controller, NodeId::ROOT), vec!["DE", "US"]);
    assert_eq!(controller.source().calls(), vec!["Country @ <root>"]);

    let lines = controller.view().lines().to_vec();
    assert_eq!(lines, vec!["+ DE", "+ US"]);
}

#[tokio::test]
async fn test_start_header_failure_is_an_error() {
    let source = geo_source();
    source.fail_headers();
    let (controller, _) = explorer(source);

    let err = controller.start().await.unwrap_err();
    assert!(matches!(err, ExplorerError::Transport(TransportError::Request(_))));
    assert!(controller.tree().is_empty());
    assert_eq!(controller.fetches_issued(), 0);
}

// ============================================================================
// END-TO-END DRILL DOWN
// ============================================================================

#[tokio::test]
async fn test_drill_down_end_to_end() {
    let (controller, _) = started().await;
    let us = node(&controller, &["US"]);

    // Root rows already carried states, but the State level of US is not covered
    {
        let tree = controller.tree();
        let us_node = tree.node(us).unwrap();
        assert!(!us_node.is_expandable);
        assert!(!us_node.is_leaf_level);
        assert_eq!(us_node.load_state, LoadState::Unloaded);
    }
    assert_eq!(labels(&controller, us), vec!["CA", "NY"]);

    let outcome = controller.on_node_click(us).await.unwrap().unwrap();
    assert_eq!(outcome.status, LoadStatus::Fetched);
    assert_eq!(controller.source().calls_for("State @ Country=US"), 1);

    // Row 3 adds a city below the existing CA, no second CA
    assert_eq!(labels(&controller, us), vec!["CA", "NY"]);
    let ca = node(&controller, &["US", "CA"]);
    assert_eq!(labels(&controller, ca), vec!["LA"]);
    {
        let tree = controller.tree();
        assert!(tree.node(us).unwrap().is_expandable);
        assert_eq!(tree.node(us).unwrap().load_state, LoadState::Loaded);
        assert!(!tree.node(ca).unwrap().is_expandable);
    }

    assert_eq!(controller.context().rows().len(), 4);

    // Expanding CA covers the City level of US/CA
    let outcome = controller.on_node_click(ca).await.unwrap().unwrap();
    assert_eq!(outcome.status, LoadStatus::Fetched);
    assert_eq!(labels(&controller, ca), vec!["LA", "SF"]);
    assert!(controller.tree().node(ca).unwrap().is_expandable);

    let la = node(&controller, &["US", "CA", "LA"]);
    assert!(controller.tree().node(la).unwrap().is_leaf_level);
}

#[tokio::test]
async fn test_merge_extends_existing_rows() {
    let source = geo_source();
    source.respond(
        "State @ Country=US",
        vec![record(1, &[("Country", "US"), ("State", "CA"), ("City", "LA")])],
    );
    let (controller, _) = explorer(source);
    controller.start().await.unwrap();
    let us = node(&controller, &["US"]);

    controller.on_lazy_load(us).await.unwrap();

    let context = controller.context();
    let row = context.rows().get(1).unwrap();
    assert_eq!(row.get("City"), Some(&text("LA")));
    assert_eq!(row.get("State"), Some(&text("CA")));
    assert_eq!(context.rows().len(), 3);
}

// ============================================================================
// CACHE REUSE & LEAVES
// ============================================================================

#[tokio::test]
async fn test_covered_level_is_not_fetched_again() {
    let (controller, _) = started().await;
    let us = node(&controller, &["US"]);

    controller.on_node_click(us).await.unwrap();
    controller.on_node_click(us).await.unwrap(); // collapse
    assert!(!controller.tree().node(us).unwrap().expanded);

    let again = controller.on_node_click(us).await.unwrap().unwrap();
    assert_eq!(again.status, LoadStatus::Cached);
    assert_eq!(controller.source().calls_for("State @ Country=US"), 1);
    assert_eq!(labels(&controller, us), vec!["CA", "NY"]);
}

#[tokio::test]
async fn test_deepest_level_needs_no_fetch() {
    let (controller, _) = started().await;
    let us = node(&controller, &["US"]);
    controller.on_lazy_load(us).await.unwrap();
    let la = node(&controller, &["US", "CA", "LA"]);
    let fetches = controller.fetches_issued();

    let outcome = controller.on_lazy_load(la).await.unwrap();
    assert_eq!(outcome.status, LoadStatus::Leaf);
    assert!(outcome.children.is_empty());
    assert_eq!(controller.fetches_issued(), fetches);

    // Clicking a deepest-level node does nothing
    assert_eq!(controller.on_node_click(la).await.unwrap(), None);
    assert!(!controller.tree().node(la).unwrap().expanded);
}

#[tokio::test]
async fn test_unknown_node_is_an_error() {
    let (controller, _) = started().await;
    let bogus = {
        let tree = controller.tree();
        let last = tree.len();
        serde_json::from_value::<NodeId>(serde_json::json!(last + 10)).unwrap()
    };
    let err = controller.on_lazy_load(bogus).await.unwrap_err();
    assert_eq!(err, ExplorerError::UnknownNode(bogus));
}

// ============================================================================
// FAILURES
// ============================================================================

#[tokio::test]
async fn test_failed_fetch_reverts_and_retries() {
    let (controller, _) = started().await;
    let us = node(&controller, &["US"]);
    controller.source().fail_once(
        "State @ Country=US",
        TransportError::Status {
            status: 503,
            url: "http://localhost:8080/rows".to_string(),
        },
    );

    let outcome = controller.on_node_click(us).await.unwrap().unwrap();
    assert!(outcome.is_failure());
    assert!(matches!(outcome.error(), Some(TransportError::Status { status: 503, .. })));
    assert!(outcome.children.is_empty());
    {
        let tree = controller.tree();
        let us_node = tree.node(us).unwrap();
        assert_eq!(us_node.load_state, LoadState::Unloaded);
        assert!(!us_node.expanded);
        assert!(!us_node.is_expandable);
    }
    // Only the root query is covered
    assert_eq!(controller.context().coverage().len(), 1);
    assert_eq!(controller.in_flight(), 0);

    // No automatic retry; the next click fetches again
    assert_eq!(controller.source().calls_for("State @ Country=US"), 1);
    let retry = controller.on_node_click(us).await.unwrap().unwrap();
    assert_eq!(retry.status, LoadStatus::Fetched);
    assert_eq!(controller.source().calls_for("State @ Country=US"), 2);
    assert_eq!(controller.load_state(us).unwrap(), LoadState::Loaded);
}

#[tokio::test]
async fn test_view_sees_expansion_events() {
    let (controller, _) = started().await;
    let us = node(&controller, &["US"]);
    controller.view_mut().take_events();

    controller.on_node_click(us).await.unwrap();

    let events = controller.view_mut().take_events();
    assert_eq!(events[0], ViewEvent::SetExpanded { node: us, expanded: true });
    assert!(events
        .iter()
        .any(|e| matches!(e, ViewEvent::ChildrenLoaded { parent, children } if *parent == us && children.len() == 2)));
}
