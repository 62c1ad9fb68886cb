//! Explorer behaviour against an in-memory graph API

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use opengin_explorer::{
    CancelSignal, CancellationHandle, Direction, ExploreOptions, Explorer, GraphNode, Transport,
    TransportError, TransportResult,
};

// =============================================================================
// FAKE GRAPH API
// =============================================================================

#[derive(Default)]
struct FakeGraph {
    entities: HashMap<String, Value>,
    relations: HashMap<String, Vec<Value>>,
    attributes: HashMap<String, Value>,
    broken: HashSet<String>,
    searches: Mutex<Vec<String>>,
    cancel_on: Option<(String, CancellationHandle)>,
}

impl FakeGraph {
    fn entity(mut self, id: &str, name: &str, major: &str) -> Self {
        self.entities.insert(
            id.to_string(),
            json!({"id": id, "name": name, "kind": {"major": major}, "created": "2020-01-01"}),
        );
        self
    }

    fn relation(mut self, from: &str, name: &str, direction: &str, to: &str) -> Self {
        let list = self.relations.entry(from.to_string()).or_default();
        let id = format!("{from}-{name}-{to}");
        list.push(json!({
            "id": id,
            "relatedEntityId": to,
            "name": name,
            "direction": direction,
            "startTime": "2020-01-01T00:00:00Z",
            "endTime": null
        }));
        self
    }

    fn child(self, from: &str, to: &str) -> Self {
        self.relation(from, "HAS_CHILD", "OUTGOING", to)
    }

    fn broken(mut self, id: &str) -> Self {
        self.broken.insert(id.to_string());
        self
    }

    fn attribute(mut self, parent: &str, name: &str, payload: Value) -> Self {
        self.attributes.insert(format!("/{parent}/attributes/{name}"), payload);
        self
    }

    fn cancel_on(mut self, id: &str, handle: CancellationHandle) -> Self {
        self.cancel_on = Some((id.to_string(), handle));
        self
    }

    fn searches_for(&self, id: &str) -> usize {
        self.searches
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.as_str() == id)
            .count()
    }
}

#[async_trait]
impl Transport for FakeGraph {
    async fn post(
        &self,
        path: &str,
        body: &Value,
        signal: &CancelSignal,
    ) -> TransportResult<Value> {
        if signal.is_cancelled() {
            return Err(TransportError::Cancelled);
        }

        if path == "/search" {
            let id = body["id"].as_str().unwrap_or_default().to_string();
            self.searches.lock().unwrap().push(id.clone());
            if let Some((trigger, handle)) = &self.cancel_on {
                if *trigger == id {
                    handle.cancel();
                }
            }
            if self.broken.contains(&id) {
                return Err(TransportError::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            // bury the record the way the real API does
            let records: Vec<Value> = self.entities.get(&id).cloned().into_iter().collect();
            return Ok(json!({"body": {"entities": records}}));
        }

        let id = path
            .trim_start_matches('/')
            .strip_suffix("/relations")
            .unwrap_or_default();
        let filter = body["name"].as_str();
        let relations: Vec<Value> = self
            .relations
            .get(id)
            .into_iter()
            .flatten()
            .filter(|rel| filter.map_or(true, |name| rel["name"] == name))
            .cloned()
            .collect();
        Ok(json!({ "relations": relations }))
    }

    async fn get(&self, path: &str, _signal: &CancelSignal) -> TransportResult<Value> {
        self.attributes.get(path).cloned().ok_or(TransportError::Status {
            status: 404,
            body: format!("{path} not found"),
        })
    }
}

fn explorer(graph: FakeGraph) -> (Explorer, Arc<FakeGraph>) {
    explorer_with(graph, ExploreOptions::default())
}

fn explorer_with(graph: FakeGraph, options: ExploreOptions) -> (Explorer, Arc<FakeGraph>) {
    let graph = Arc::new(graph);
    let transport: Arc<dyn Transport> = graph.clone();
    (Explorer::new(transport, options), graph)
}

fn ids(nodes: &[GraphNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.id.as_str()).collect()
}

fn all_ids(nodes: &[GraphNode]) -> Vec<String> {
    let mut out = Vec::new();
    for node in nodes {
        node.visit(&mut |n| out.push(n.id.clone()));
    }
    out
}

// =============================================================================
// TRAVERSAL
// =============================================================================

#[tokio::test]
async fn test_category_with_dataset_leaf() {
    let graph = FakeGraph::default()
        .relation("root", "AS_CATEGORY", "OUTGOING", "cat1")
        .entity("cat1", "Finance", "Category")
        .child("cat1", "ds1")
        .entity("ds1", "Budget", "Dataset");
    let (explorer, _) = explorer(graph);

    let result = explorer.explore("root", &CancelSignal::never()).await;

    assert_eq!(result.error, None);
    assert_eq!(result.entity_id, "root");
    assert_eq!(result.relations.len(), 1);
    assert_eq!(ids(&result.categories), vec!["cat1"]);

    let category = &result.categories[0];
    assert_eq!(category.name, "Finance");
    assert_eq!(category.depth, 0);
    assert!(!category.is_dataset);
    assert_eq!(category.parent_id, None);
    let meta = category.relation.as_ref().unwrap();
    assert_eq!(meta.name, "AS_CATEGORY");
    assert_eq!(meta.direction, Direction::Outgoing);
    assert_eq!(meta.id, "root-AS_CATEGORY-cat1");

    assert_eq!(ids(&category.children), vec!["ds1"]);
    let dataset = &category.children[0];
    assert!(dataset.is_dataset);
    assert!(dataset.children.is_empty());
    assert_eq!(dataset.depth, 1);
    assert_eq!(dataset.parent_id.as_deref(), Some("cat1"));
    assert_eq!(dataset.parent_name.as_deref(), Some("Finance"));
    assert_eq!(dataset.relation.as_ref().unwrap().name, "HAS_CHILD");
    assert_eq!(dataset.attribute_address(), Some(("cat1", "Budget")));

    let stats = result.stats();
    assert_eq!((stats.total, stats.categories, stats.datasets), (2, 1, 1));
}

#[tokio::test]
async fn test_root_filter_only_follows_category_relation() {
    let graph = FakeGraph::default()
        .relation("root", "AS_CATEGORY", "OUTGOING", "cat1")
        .relation("root", "AS_MINISTER", "OUTGOING", "minister")
        .entity("cat1", "Finance", "Category")
        .entity("minister", "Minister", "Person");
    let (explorer, graph) = explorer(graph);

    let result = explorer.explore("root", &CancelSignal::never()).await;
    assert_eq!(ids(&result.categories), vec!["cat1"]);
    assert_eq!(graph.searches_for("minister"), 0);
}

#[tokio::test]
async fn test_cycle_terminates() {
    let graph = FakeGraph::default()
        .relation("root", "AS_CATEGORY", "OUTGOING", "a")
        .entity("a", "A", "Category")
        .entity("b", "B", "Category")
        .child("a", "b")
        .child("b", "a");
    let (explorer, graph) = explorer(graph);

    let result = explorer.explore("root", &CancelSignal::never()).await;
    assert_eq!(all_ids(&result.categories), vec!["a", "b"]);
    assert!(result.categories[0].children[0].children.is_empty());
    assert_eq!(graph.searches_for("a"), 1);

    let subtree = explorer
        .explore_subtree("a", &CancelSignal::never())
        .await
        .unwrap();
    assert_eq!(all_ids(&subtree.children), vec!["b"]);
}

#[tokio::test]
async fn test_shared_node_explored_once() {
    let graph = FakeGraph::default()
        .relation("root", "AS_CATEGORY", "OUTGOING", "left")
        .relation("root", "AS_CATEGORY", "OUTGOING", "right")
        .entity("left", "Left", "Category")
        .entity("right", "Right", "Category")
        .entity("shared", "Shared", "Dataset")
        .child("left", "shared")
        .child("right", "shared");
    let (explorer, graph) = explorer(graph);

    let result = explorer.explore("root", &CancelSignal::never()).await;
    let seen = all_ids(&result.categories);
    assert_eq!(seen.iter().filter(|id| *id == "shared").count(), 1);
    assert_eq!(graph.searches_for("shared"), 1);
}

#[tokio::test]
async fn test_depth_bound() {
    let mut graph = FakeGraph::default().relation("root", "AS_CATEGORY", "OUTGOING", "n0");
    for i in 0..15 {
        graph = graph
            .entity(&format!("n{i}"), &format!("Level {i}"), "Category")
            .child(&format!("n{i}"), &format!("n{}", i + 1));
    }
    let options = ExploreOptions {
        max_depth: 3,
        ..ExploreOptions::default()
    };
    let (explorer, graph) = explorer_with(graph, options);

    let result = explorer.explore("root", &CancelSignal::never()).await;

    let mut deepest = 0;
    for category in &result.categories {
        category.visit(&mut |n| deepest = deepest.max(n.depth));
    }
    assert_eq!(deepest, 3);
    assert_eq!(all_ids(&result.categories), vec!["n0", "n1", "n2", "n3"]);
    assert_eq!(graph.searches_for("n4"), 0);
}

#[tokio::test]
async fn test_default_depth_is_ten() {
    let mut graph = FakeGraph::default().relation("root", "AS_CATEGORY", "OUTGOING", "n0");
    for i in 0..20 {
        graph = graph
            .entity(&format!("n{i}"), &format!("Level {i}"), "Category")
            .child(&format!("n{i}"), &format!("n{}", i + 1));
    }
    let (explorer, _) = explorer(graph);

    let result = explorer.explore("root", &CancelSignal::never()).await;
    assert_eq!(result.stats().total, 11);
}

#[tokio::test]
async fn test_dataset_children_are_never_explored() {
    let graph = FakeGraph::default()
        .relation("root", "AS_CATEGORY", "OUTGOING", "ds")
        .entity("ds", "Dataset With Edges", "Dataset")
        .entity("beyond", "Beyond", "Category")
        .child("ds", "beyond");
    let (explorer, graph) = explorer(graph);

    let result = explorer.explore("root", &CancelSignal::never()).await;
    assert!(result.categories[0].is_dataset);
    assert!(result.categories[0].children.is_empty());
    assert_eq!(graph.searches_for("beyond"), 0);
}

#[tokio::test]
async fn test_failed_lookup_prunes_only_its_branch() {
    let graph = FakeGraph::default()
        .relation("root", "AS_CATEGORY", "OUTGOING", "cat1")
        .entity("cat1", "Finance", "Category")
        .child("cat1", "broken")
        .child("cat1", "missing")
        .child("cat1", "ok")
        .entity("broken", "Broken", "Dataset")
        .entity("ok", "Fine", "Dataset")
        .broken("broken");
    let (explorer, _) = explorer(graph);

    let result = explorer.explore("root", &CancelSignal::never()).await;
    assert_eq!(result.error, None);
    assert_eq!(ids(&result.categories[0].children), vec!["ok"]);
}

#[tokio::test]
async fn test_incoming_edges_used_when_no_outgoing() {
    let graph = FakeGraph::default()
        .relation("root", "AS_CATEGORY", "OUTGOING", "cat1")
        .entity("cat1", "Finance", "Category")
        .relation("cat1", "IS_ATTRIBUTE", "INCOMING", "ds1")
        .relation("cat1", "AS_MINISTER", "OUTGOING", "person")
        .entity("ds1", "Budget", "Dataset")
        .entity("person", "Person", "Person");
    let (explorer, _) = explorer(graph);

    let result = explorer.explore("root", &CancelSignal::never()).await;
    let children = &result.categories[0].children;
    assert_eq!(ids(children), vec!["ds1"]);
    assert_eq!(
        children[0].relation.as_ref().unwrap().direction,
        Direction::Incoming
    );
}

#[tokio::test]
async fn test_no_categories() {
    let (explorer, _) = explorer(FakeGraph::default());
    let result = explorer.explore("lonely", &CancelSignal::never()).await;
    assert_eq!(result.error, None);
    assert!(result.categories.is_empty());
    assert!(result.relations.is_empty());
}

// =============================================================================
// CANCELLATION
// =============================================================================

#[tokio::test]
async fn test_cancelled_before_start() {
    let graph = FakeGraph::default()
        .relation("root", "AS_CATEGORY", "OUTGOING", "cat1")
        .entity("cat1", "Finance", "Category");
    let (explorer, graph) = explorer(graph);
    let (handle, signal) = CancellationHandle::new();
    handle.cancel();

    let result = explorer.explore("root", &signal).await;
    assert!(result.is_cancelled());
    assert_eq!(result.error.as_deref(), Some("Cancelled"));
    assert!(result.categories.is_empty());
    assert_eq!(graph.searches_for("cat1"), 0);
}

#[tokio::test]
async fn test_cancelled_mid_traversal() {
    let (handle, signal) = CancellationHandle::new();
    let graph = FakeGraph::default()
        .relation("root", "AS_CATEGORY", "OUTGOING", "cat1")
        .entity("cat1", "Finance", "Category")
        .child("cat1", "sub")
        .entity("sub", "Sub", "Category")
        .child("sub", "ds")
        .entity("ds", "Budget", "Dataset")
        .cancel_on("sub", handle);
    let (explorer, graph) = explorer(graph);

    let result = explorer.explore("root", &signal).await;
    assert!(result.is_cancelled());
    assert!(result.categories.is_empty());
    assert_eq!(graph.searches_for("ds"), 0);
}

// =============================================================================
// DATASET TABLES
// =============================================================================

fn struct_envelope(table: &Value) -> Value {
    // protobuf framing bytes in front of the embedded JSON document
    let mut bytes = vec![0x0a, 0x1f];
    bytes.extend(table.to_string().into_bytes());
    let wrapper = json!({
        "typeUrl": "type.googleapis.com/google.protobuf.Struct",
        "value": hex::encode(bytes)
    });
    json!({
        "start": "2024-01-01T00:00:00Z",
        "end": "",
        "value": wrapper.to_string()
    })
}

#[tokio::test]
async fn test_dataset_table_end_to_end() {
    let table = json!({
        "columns": ["ministry", "allocation"],
        "rows": [["Health", 120.5], ["Education \"core\" {base}", 98]]
    });
    let graph = FakeGraph::default()
        .relation("root", "AS_CATEGORY", "OUTGOING", "cat1")
        .entity("cat1", "Finance", "Category")
        .child("cat1", "ds1")
        .entity("ds1", "Budget", "Dataset")
        .attribute("cat1", "Budget", struct_envelope(&table));
    let (explorer, _) = explorer(graph);
    let signal = CancelSignal::never();

    let result = explorer.explore("root", &signal).await;
    let dataset = &result.categories[0].children[0];

    let table = explorer.dataset_table(dataset, None, &signal).await.unwrap();
    assert_eq!(table.columns, vec!["ministry", "allocation"]);
    assert_eq!(
        table.rows,
        vec![
            vec![json!("Health"), json!(120.5)],
            vec![json!("Education \"core\" {base}"), json!(98)],
        ]
    );
    assert_eq!(table.raw["decoded"], json!(true));

    // categories have no table of their own
    assert!(explorer
        .dataset_table(&result.categories[0], None, &signal)
        .await
        .is_none());
}

#[tokio::test]
async fn test_missing_attribute_is_none() {
    let (explorer, _) = explorer(FakeGraph::default());
    let value = explorer
        .api()
        .fetch_attribute_value("cat1", "Nothing", None, &CancelSignal::never())
        .await;
    assert!(value.is_none());
}
