//! OpenGIN Types - Level 1 Foundation Types
//!
//! Pure data structures shared by the decoder, the table normalizer and the
//! graph explorer. Nothing in here performs I/O or knows about the wire
//! encoding; the types only describe what the explorer produces and what the
//! graph API accepts.
//!
//! ## Contents
//!
//! - Entity classification (`Kind`) and lookup results (`EntityInfo`)
//! - Relation edges (`Relation`, `Direction`, `RelationMeta`)
//! - The explored tree (`GraphNode`, `ExploreResult`, `TreeStats`)
//! - Display tables (`AttributeTable`)
//! - Request bodies for the search and relations endpoints
//!
//! All types serialize with the camelCase field names the graph API and the
//! UI layer use.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Treats an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// ENTITY CLASSIFICATION
// ============================================================================

/// Two-level type tag attached to every entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kind {
    pub major: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor: Option<String>,
}

impl Kind {
    pub fn new(major: impl Into<String>) -> Self {
        Self {
            major: major.into(),
            minor: None,
        }
    }

    pub fn with_minor(major: impl Into<String>, minor: impl Into<String>) -> Self {
        Self {
            major: major.into(),
            minor: Some(minor.into()),
        }
    }

    /// Placeholder used when an entity record carries no usable kind
    pub fn unknown() -> Self {
        Self::new("UNKNOWN")
    }

    pub fn is_major(&self, major: &str) -> bool {
        self.major == major
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.minor {
            Some(minor) => write!(f, "{}/{}", self.major, minor),
            None => write!(f, "{}", self.major),
        }
    }
}

/// Entity record as located inside a search response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityInfo {
    pub id: String,
    pub name: String,
    pub kind: Kind,
    #[serde(default)]
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated: Option<String>,
}

// ============================================================================
// RELATIONS
// ============================================================================

/// Direction of a relation edge relative to the queried entity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Outgoing,
    Incoming,
    /// Anything the API sends that is neither of the above
    #[default]
    #[serde(other)]
    Unknown,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outgoing => "OUTGOING",
            Direction::Incoming => "INCOMING",
            Direction::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A directed, time-bounded edge between two entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    pub related_entity_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub direction: Direction,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

/// Metadata of the edge through which a node was discovered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationMeta {
    pub id: String,
    pub name: String,
    pub direction: Direction,
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl From<&Relation> for RelationMeta {
    fn from(relation: &Relation) -> Self {
        Self {
            id: relation.id.clone(),
            name: relation.name.clone(),
            direction: relation.direction,
            start_time: relation.start_time.clone(),
            end_time: relation.end_time.clone(),
        }
    }
}

impl RelationMeta {
    /// Same metadata but reported under a different relation name
    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

// ============================================================================
// EXPLORED TREE
// ============================================================================

/// A node of the explored category tree
///
/// Dataset nodes are always leaves. Their attribute value lives under the
/// *parent* entity, so `parent_id` and `name` together address it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub kind: Kind,
    pub is_dataset: bool,
    pub depth: usize,
    #[serde(default)]
    pub children: Vec<GraphNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationMeta>,
}

impl GraphNode {
    /// Address of the dataset value: `(parent entity id, attribute name)`
    pub fn attribute_address(&self) -> Option<(&str, &str)> {
        if !self.is_dataset {
            return None;
        }
        self.parent_id
            .as_deref()
            .map(|parent| (parent, self.name.as_str()))
    }

    /// Depth-first, pre-order visit of this node and all descendants
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a GraphNode)) {
        f(self);
        for child in &self.children {
            child.visit(f);
        }
    }
}

/// Node counts over an explored forest
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeStats {
    pub total: usize,
    pub datasets: usize,
    pub categories: usize,
}

/// Outcome of one explore request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreResult {
    pub entity_id: String,
    pub categories: Vec<GraphNode>,
    pub relations: Vec<Relation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExploreResult {
    /// Error text reported when the caller cancelled the request
    pub const CANCELLED: &'static str = "Cancelled";

    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Default::default()
        }
    }

    /// A cancelled result carries no partial tree
    pub fn cancelled(entity_id: impl Into<String>) -> Self {
        Self {
            error: Some(Self::CANCELLED.to_string()),
            ..Self::new(entity_id)
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.error.as_deref() == Some(Self::CANCELLED)
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        for category in &self.categories {
            category.visit(&mut |node| {
                stats.total += 1;
                if node.is_dataset {
                    stats.datasets += 1;
                } else {
                    stats.categories += 1;
                }
            });
        }
        stats
    }
}

// ============================================================================
// TABLES
// ============================================================================

/// Canonical `{columns, rows}` view of a dataset value
///
/// Rows are not forced to the column count; heterogeneous sources can
/// produce ragged rows. `raw` always keeps the payload the table was
/// extracted from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub raw: Value,
}

impl AttributeTable {
    pub fn empty(raw: Value) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            raw,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }

    /// True when some row length differs from the column count
    pub fn is_ragged(&self) -> bool {
        self.rows.iter().any(|row| row.len() != self.columns.len())
    }
}

// ============================================================================
// REQUEST BODIES
// ============================================================================

/// Body of `POST /search`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySearchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated: Option<String>,
}

impl EntitySearchRequest {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }
}

/// Body of `POST /{entityId}/relations`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

impl RelationsRequest {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Result of a raw query issued against the graph API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub data: Value,
    pub endpoint: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
