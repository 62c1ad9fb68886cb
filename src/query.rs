//! Raw graph API queries
//!
//! The explorer is one consumer of the graph API; the other is direct
//! querying, where a user picks an endpoint, fills in parameters and looks at
//! the raw answer. [`build_request`] maps parameters onto an endpoint,
//! [`validate`] rejects incomplete parameter sets and [`execute_query`] runs
//! the request, folding any failure into the response.

use serde_json::Value;

use crate::cancel::CancelSignal;
use crate::error::QueryError;
use crate::transport::{api_path, Method, Transport};
use opengin_types::{ApiResponse, Direction, EntitySearchRequest, Kind, RelationsRequest};

/// Endpoint family of a raw query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Search,
    Metadata,
    Attributes,
    Relations,
    Explore,
}

impl QueryKind {
    pub fn label(&self) -> &'static str {
        match self {
            QueryKind::Search => "Search Entity",
            QueryKind::Metadata => "Metadata",
            QueryKind::Attributes => "Attributes",
            QueryKind::Relations => "Relations",
            QueryKind::Explore => "Explore Attributes",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            QueryKind::Search => "Search by ID or kind",
            QueryKind::Metadata => "Entity metadata",
            QueryKind::Attributes => "Entity attribute values",
            QueryKind::Relations => "Entity relationships",
            QueryKind::Explore => "Discover all attributes",
        }
    }
}

/// Parameters of a raw query; unused fields are ignored per kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams {
    pub kind: QueryKind,
    pub entity_id: Option<String>,
    pub kind_major: Option<String>,
    pub kind_minor: Option<String>,
    pub entity_name: Option<String>,
    pub attribute_name: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub fields: Vec<String>,
    pub relation_id: Option<String>,
    pub related_entity_id: Option<String>,
    pub relation_name: Option<String>,
    pub direction: Option<Direction>,
    pub active_at: Option<String>,
}

impl QueryParams {
    pub fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            entity_id: None,
            kind_major: None,
            kind_minor: None,
            entity_name: None,
            attribute_name: None,
            start_time: None,
            end_time: None,
            fields: Vec::new(),
            relation_id: None,
            related_entity_id: None,
            relation_name: None,
            direction: None,
            active_at: None,
        }
    }

    pub fn for_entity(kind: QueryKind, entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: Some(entity_id.into()),
            ..Self::new(kind)
        }
    }
}

/// Method, relative path and optional JSON body of a request
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

/// Empty strings count as absent, matching form input
fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

fn owned(field: &Option<String>) -> Option<String> {
    present(field).map(str::to_string)
}

/// Map query parameters onto an endpoint
pub fn build_request(params: &QueryParams) -> RequestSpec {
    let entity_id = present(&params.entity_id).unwrap_or_default();

    match params.kind {
        QueryKind::Search => {
            let body = EntitySearchRequest {
                id: owned(&params.entity_id),
                kind: present(&params.kind_major).map(|major| Kind {
                    major: major.to_string(),
                    minor: owned(&params.kind_minor),
                }),
                name: owned(&params.entity_name),
                ..Default::default()
            };
            RequestSpec {
                method: Method::Post,
                path: api_path(&["search"], &[]),
                body: serde_json::to_value(body).ok(),
            }
        }
        QueryKind::Metadata => RequestSpec {
            method: Method::Get,
            path: api_path(&[entity_id, "metadata"], &[]),
            body: None,
        },
        QueryKind::Attributes => {
            let mut query = Vec::new();
            if let Some(start) = present(&params.start_time) {
                query.push(("startTime", start));
            }
            if let Some(end) = present(&params.end_time) {
                query.push(("endTime", end));
            }
            for field in &params.fields {
                query.push(("fields", field.as_str()));
            }

            let attribute = present(&params.attribute_name).unwrap_or_default();
            RequestSpec {
                method: Method::Get,
                path: api_path(&[entity_id, "attributes", attribute], &query),
                body: None,
            }
        }
        QueryKind::Relations => {
            let body = match owned(&params.relation_id) {
                Some(id) => RelationsRequest {
                    id: Some(id),
                    ..Default::default()
                },
                None => {
                    let active_at = owned(&params.active_at);
                    // activeAt replaces the time range
                    let (start_time, end_time) = if active_at.is_some() {
                        (None, None)
                    } else {
                        (owned(&params.start_time), owned(&params.end_time))
                    };
                    RelationsRequest {
                        related_entity_id: owned(&params.related_entity_id),
                        name: owned(&params.relation_name),
                        direction: params.direction,
                        active_at,
                        start_time,
                        end_time,
                        ..Default::default()
                    }
                }
            };
            // the API expects a JSON body even when no filter is set
            RequestSpec {
                method: Method::Post,
                path: api_path(&[entity_id, "relations"], &[]),
                body: Some(
                    serde_json::to_value(body)
                        .unwrap_or_else(|_| Value::Object(Default::default())),
                ),
            }
        }
        QueryKind::Explore => RequestSpec {
            method: Method::Post,
            path: api_path(&[entity_id, "relations"], &[]),
            body: None,
        },
    }
}

/// Check that the parameters needed by the query kind are present
pub fn validate(params: &QueryParams) -> Result<(), QueryError> {
    let has_entity = present(&params.entity_id).is_some();

    match params.kind {
        QueryKind::Search => {
            if !has_entity
                && present(&params.kind_major).is_none()
                && present(&params.entity_name).is_none()
            {
                return Err(QueryError::MissingSearchCriteria);
            }
        }
        QueryKind::Metadata | QueryKind::Relations | QueryKind::Explore => {
            if !has_entity {
                return Err(QueryError::MissingEntityId);
            }
        }
        QueryKind::Attributes => {
            if !has_entity {
                return Err(QueryError::MissingEntityId);
            }
            if present(&params.attribute_name).is_none() {
                return Err(QueryError::MissingAttributeName);
            }
        }
    }
    Ok(())
}

/// Validate, build and send a raw query
///
/// Never fails: validation and transport errors are reported in
/// [`ApiResponse::error`] with `data` left null.
pub async fn execute_query(
    transport: &dyn Transport,
    params: &QueryParams,
    signal: &CancelSignal,
) -> ApiResponse {
    let request = build_request(params);
    let mut response = ApiResponse {
        data: Value::Null,
        endpoint: request.path.clone(),
        method: request.method.to_string(),
        request_body: request.body.clone(),
        error: None,
    };

    if let Err(e) = validate(params) {
        response.error = Some(e.to_string());
        return response;
    }

    let outcome = match request.method {
        Method::Get => transport.get(&request.path, signal).await,
        Method::Post => {
            let body = request
                .body
                .unwrap_or_else(|| Value::Object(Default::default()));
            transport.post(&request.path, &body, signal).await
        }
    };

    match outcome {
        Ok(data) => response.data = data,
        Err(e) => {
            tracing::warn!(
                query = params.kind.label(),
                endpoint = %response.endpoint,
                error = %e,
                "query failed"
            );
            response.error = Some(e.to_string());
        }
    }
    response
}
