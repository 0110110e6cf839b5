//! FILENAME: core/drilldown-engine/tests/common/mod.rs
//! Test harness and fixtures for drill-down engine integration tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use drilldown_engine::{
    DataSource, ExplorerController, FieldValue, FilterState, GroupQuery, NodeId, OutlineView,
    Record, TransportError,
};

pub type Explorer = ExplorerController<MockSource, OutlineView>;

/// Scripted data source. Answers are looked up by the query's display form
/// (`"State @ Country=US"`, `"Country @ <root>"`); unscripted queries
/// answer with no rows. Every fetch yields once before answering so that
/// concurrent expansions interleave.
pub struct MockSource {
    headers: Vec<String>,
    responses: RefCell<HashMap<String, Vec<Record>>>,
    failures: RefCell<HashMap<String, VecDeque<TransportError>>>,
    fail_headers: Cell<bool>,
    calls: RefCell<Vec<String>>,
}

impl MockSource {
    pub fn new(headers: &[&str]) -> Self {
        MockSource {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            responses: RefCell::new(HashMap::new()),
            failures: RefCell::new(HashMap::new()),
            fail_headers: Cell::new(false),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn respond(&self, query: &str, records: Vec<Record>) {
        self.responses.borrow_mut().insert(query.to_string(), records);
    }

    /// The next fetch of `query` fails with `err`; later ones succeed again.
    pub fn fail_once(&self, query: &str, err: TransportError) {
        self.failures
            .borrow_mut()
            .entry(query.to_string())
            .or_default()
            .push_back(err);
    }

    pub fn fail_headers(&self) {
        self.fail_headers.set(true);
    }

    /// Every `fetch_rows` call so far, in issue order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn calls_for(&self, query: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == query).count()
    }
}

impl DataSource for MockSource {
    async fn fetch_headers(&self) -> Result<Vec<String>, TransportError> {
        tokio::task::yield_now().await;
        if self.fail_headers.get() {
            return Err(TransportError::Request("connection refused".to_string()));
        }
        Ok(self.headers.clone())
    }

    async fn fetch_rows(&self, query: &GroupQuery) -> Result<Vec<Record>, TransportError> {
        let key = query.to_string();
        self.calls.borrow_mut().push(key.clone());
        tokio::task::yield_now().await;

        let failure = self
            .failures
            .borrow_mut()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        if let Some(err) = failure {
            return Err(err);
        }
        Ok(self.responses.borrow().get(&key).cloned().unwrap_or_default())
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub fn record(row_id: u64, fields: &[(&str, &str)]) -> Record {
    fields
        .iter()
        .fold(Record::new(row_id), |record, (k, v)| record.with(*k, *v))
}

/// Country / State / City source. The root answer already carries states;
/// the US state answer adds a city to row 3 only.
pub fn geo_source() -> MockSource {
    let source = MockSource::new(&["Country", "State", "City"]);
    source.respond(
        "Country @ <root>",
        vec![
            record(1, &[("Country", "US"), ("State", "CA")]),
            record(2, &[("Country", "US"), ("State", "NY")]),
            record(4, &[("Country", "DE"), ("State", "BY")]),
        ],
    );
    source.respond(
        "State @ Country=US",
        vec![record(3, &[("Country", "US"), ("State", "CA"), ("City", "LA")])],
    );
    source.respond(
        "State @ Country=DE",
        vec![record(4, &[("Country", "DE"), ("State", "BY")])],
    );
    source.respond(
        "City @ Country=US/State=CA",
        vec![
            record(3, &[("Country", "US"), ("State", "CA"), ("City", "LA")]),
            record(5, &[("Country", "US"), ("State", "CA"), ("City", "SF")]),
        ],
    );
    source.respond(
        "City @ Country=US/State=NY",
        vec![record(2, &[("Country", "US"), ("State", "NY"), ("City", "NYC")])],
    );
    source.respond(
        "State @ <root>",
        vec![
            record(1, &[("Country", "US"), ("State", "CA")]),
            record(2, &[("Country", "US"), ("State", "NY")]),
            record(4, &[("Country", "DE"), ("State", "BY")]),
        ],
    );
    source
}

pub fn explorer(source: MockSource) -> (Rc<Explorer>, Rc<FilterState>) {
    let filters = Rc::new(FilterState::new());
    let controller = ExplorerController::new(source, OutlineView::new(), Rc::clone(&filters));
    (controller, filters)
}

/// A started explorer over `geo_source()`.
pub async fn started() -> (Rc<Explorer>, Rc<FilterState>) {
    let (controller, filters) = explorer(geo_source());
    controller.start().await.expect("start");
    (controller, filters)
}

/// Child labels of `parent` in display order.
pub fn labels(controller: &Explorer, parent: NodeId) -> Vec<String> {
    let tree = controller.tree();
    tree.children(parent)
        .iter()
        .map(|&id| tree.node(id).expect("child").label())
        .collect()
}

/// Labels of the visible children of `parent`.
pub fn visible_labels(controller: &Explorer, parent: NodeId) -> Vec<String> {
    let tree = controller.tree();
    tree.children(parent)
        .iter()
        .filter_map(|&id| tree.get(id))
        .filter(|node| !node.hidden)
        .map(|node| node.label())
        .collect()
}

pub fn node(controller: &Explorer, labels: &[&str]) -> NodeId {
    controller
        .find_node(labels)
        .unwrap_or_else(|| panic!("no node at {:?}", labels))
}

pub fn filter_map(pairs: &[(&str, bool)]) -> drilldown_engine::FilterMap {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

pub fn text(value: &str) -> FieldValue {
    FieldValue::text(value)
}
