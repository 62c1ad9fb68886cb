//! Entity, relation and attribute lookups
//!
//! These are the leaf primitives of the traversal. Each one issues a single
//! transport call, decodes the response and degrades to `None` or an empty
//! list on any failure, so one bad edge prunes one branch and nothing more.

use std::sync::Arc;

use serde_json::Value;

use crate::cancel::CancelSignal;
use crate::table::normalize_table;
use crate::transport::{api_path, Transport};
use crate::wire::decode;
use opengin_types::{
    AttributeTable, EntityInfo, EntitySearchRequest, Kind, Relation, RelationsRequest,
};

/// Optional time bounds for attribute values
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

impl TimeWindow {
    fn query_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        if let Some(start) = self.start_time.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("startTime", start));
        }
        if let Some(end) = self.end_time.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("endTime", end));
        }
        pairs
    }
}

/// Graph API lookups on top of a transport
#[derive(Clone)]
pub struct GraphApi {
    transport: Arc<dyn Transport>,
}

impl GraphApi {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Search by id and locate the entity record anywhere in the response
    pub async fn fetch_entity_by_id(&self, id: &str, signal: &CancelSignal) -> Option<EntityInfo> {
        let body = match serde_json::to_value(EntitySearchRequest::by_id(id)) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(entity_id = %id, error = %e, "failed to encode search body");
                return None;
            }
        };

        let response = match self.transport.post("/search", &body, signal).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(entity_id = %id, error = %e, "entity search failed");
                return None;
            }
        };

        let found = find_entity(&decode(&response), id);
        if found.is_none() {
            tracing::debug!(entity_id = %id, "entity not present in search response");
        }
        found
    }

    /// Relations of an entity, optionally filtered by relation name
    pub async fn fetch_entity_relations(
        &self,
        id: &str,
        name_filter: Option<&str>,
        signal: &CancelSignal,
    ) -> Vec<Relation> {
        let request = name_filter.map(RelationsRequest::named).unwrap_or_default();
        let body = match serde_json::to_value(request) {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(entity_id = %id, error = %e, "failed to encode relations body");
                return Vec::new();
            }
        };

        let path = api_path(&[id, "relations"], &[]);
        match self.transport.post(&path, &body, signal).await {
            Ok(response) => relations_from(&decode(&response)),
            Err(e) => {
                tracing::warn!(entity_id = %id, error = %e, "relations lookup failed");
                Vec::new()
            }
        }
    }

    /// Fetch, decode and normalize one attribute value
    pub async fn fetch_attribute_value(
        &self,
        entity_id: &str,
        attribute_name: &str,
        window: Option<&TimeWindow>,
        signal: &CancelSignal,
    ) -> Option<AttributeTable> {
        let query = window.map(TimeWindow::query_pairs).unwrap_or_default();
        let path = api_path(&[entity_id, "attributes", attribute_name], &query);

        match self.transport.get(&path, signal).await {
            Ok(response) => {
                let table = normalize_table(&decode(&response));
                tracing::debug!(
                    entity_id = %entity_id,
                    attribute = %attribute_name,
                    columns = table.columns.len(),
                    rows = table.rows.len(),
                    "attribute value normalized"
                );
                Some(table)
            }
            Err(e) => {
                tracing::warn!(
                    entity_id = %entity_id,
                    attribute = %attribute_name,
                    error = %e,
                    "attribute lookup failed"
                );
                None
            }
        }
    }
}

/// Depth-first search for the record of `target_id`
///
/// Matches the first object whose `id` equals the target and which carries
/// a `name` or `kind` field.
pub fn find_entity(decoded: &Value, target_id: &str) -> Option<EntityInfo> {
    match decoded {
        Value::Object(map) => {
            let is_target = map.get("id").and_then(Value::as_str) == Some(target_id)
                && (map.contains_key("name") || map.contains_key("kind"));
            if is_target {
                return Some(EntityInfo {
                    id: target_id.to_string(),
                    name: map
                        .get("name")
                        .and_then(Value::as_str)
                        .filter(|name| !name.is_empty())
                        .unwrap_or(target_id)
                        .to_string(),
                    kind: map
                        .get("kind")
                        .and_then(|kind| serde_json::from_value::<Kind>(kind.clone()).ok())
                        .unwrap_or_else(Kind::unknown),
                    created: map
                        .get("created")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                    terminated: map
                        .get("terminated")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                });
            }
            map.values().find_map(|value| find_entity(value, target_id))
        }
        Value::Array(items) => items.iter().find_map(|item| find_entity(item, target_id)),
        _ => None,
    }
}

/// Relation list from a decoded relations response
///
/// Accepts a bare array or an object with a `relations` array. Items that
/// are not relation records are skipped.
pub fn relations_from(decoded: &Value) -> Vec<Relation> {
    let items = match decoded {
        Value::Array(items) => items,
        Value::Object(map) => match map.get("relations") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<Relation>(item.clone()) {
            Ok(relation) => Some(relation),
            Err(e) => {
                tracing::debug!(error = %e, "skipping malformed relation");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_entity_deeply_nested() {
        let response = json!({
            "body": [
                {"id": "other", "name": "Other"},
                {"wrapper": {"items": [
                    {"id": "e1"},
                    {"id": "e1", "name": "Treasury", "kind": {"major": "Category", "minor": "dept"},
                     "created": "2020-01-01"}
                ]}}
            ]
        });

        let entity = find_entity(&response, "e1").unwrap();
        assert_eq!(entity.name, "Treasury");
        assert_eq!(entity.kind, Kind::with_minor("Category", "dept"));
        assert_eq!(entity.created, "2020-01-01");
        assert_eq!(entity.terminated, None);
    }

    #[test]
    fn test_find_entity_defaults() {
        let response = json!([{"id": "e2", "name": "", "kind": "garbage"}]);
        let entity = find_entity(&response, "e2").unwrap();
        assert_eq!(entity.name, "e2");
        assert_eq!(entity.kind, Kind::unknown());
    }

    #[test]
    fn test_find_entity_missing() {
        assert!(find_entity(&json!({"id": "e3"}), "e3").is_none());
        assert!(find_entity(&json!({"body": []}), "e3").is_none());
        assert!(find_entity(&json!("e3"), "e3").is_none());
    }

    #[test]
    fn test_relations_from_shapes() {
        let rel = json!({"id": "r1", "relatedEntityId": "c1", "name": "AS_CATEGORY",
                         "direction": "OUTGOING", "startTime": "2020"});

        assert_eq!(relations_from(&json!([rel.clone()])).len(), 1);
        assert_eq!(relations_from(&json!({"relations": [rel.clone()]})).len(), 1);
        assert!(relations_from(&json!({"relations": null})).is_empty());
        assert!(relations_from(&json!("nope")).is_empty());

        // malformed entries are dropped, the rest survive
        let mixed = json!([rel, {"name": "no target"}, 5]);
        let relations = relations_from(&mixed);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].related_entity_id, "c1");
    }

    #[test]
    fn test_time_window_query() {
        let window = TimeWindow {
            start_time: Some("2024-01-01".to_string()),
            end_time: Some(String::new()),
        };
        assert_eq!(window.query_pairs(), vec![("startTime", "2024-01-01")]);
    }
}
