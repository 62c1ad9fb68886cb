//! Tabular normalizer
//!
//! Dataset values reach us in many shapes: a decoded attribute envelope, a
//! list of them, a `values` wrapper, bare `{columns, rows}`, or a protobuf
//! Struct `{fields}` map. [`normalize_table`] finds the table in whichever
//! shape was used. It never fails; when nothing matches it returns an empty
//! table that still carries the raw payload for display.

use serde_json::{Map, Value};

use crate::wire::shape::is_truthy;
use crate::wire::DECODED_FLAG;
use opengin_types::AttributeTable;

/// Extract a `{columns, rows}` table from a decoded payload
pub fn normalize_table(decoded: &Value) -> AttributeTable {
    match decoded {
        Value::Array(items) => normalize_items(items, decoded),
        Value::Object(map) => normalize_object(map, decoded),
        _ => AttributeTable::empty(decoded.clone()),
    }
}

/// Unwrap a protobuf `Value` cell to its primitive
pub fn extract_field_value(field: &Value) -> Value {
    let Value::Object(map) = field else {
        return field.clone();
    };

    if let Some(v) = map.get("stringValue") {
        return v.clone();
    }
    if let Some(v) = map.get("numberValue") {
        return v.clone();
    }
    if let Some(v) = map.get("boolValue") {
        return v.clone();
    }
    if let Some(list) = map.get("listValue") {
        return match list.get("values") {
            Some(Value::Array(values)) => {
                Value::Array(values.iter().map(extract_field_value).collect())
            }
            _ => Value::Array(Vec::new()),
        };
    }
    if let Some(structure) = map.get("structValue") {
        return structure.clone();
    }

    field.clone()
}

/// A table fragment found in one item
struct Fragment {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

fn normalize_items(items: &[Value], raw: &Value) -> AttributeTable {
    let mut columns: Vec<String> = Vec::new();
    let mut rows: Vec<Vec<Value>> = Vec::new();

    for (idx, item) in items.iter().enumerate() {
        let Value::Object(map) = item else {
            continue;
        };

        match item_fragment(map) {
            Some(fragment) => {
                if columns.is_empty() {
                    columns = fragment.columns;
                }
                rows.extend(fragment.rows);
            }
            None => tracing::debug!(item = idx, "table item did not match any known shape"),
        }
    }

    tracing::debug!(
        columns = columns.len(),
        rows = rows.len(),
        "normalized table from list"
    );

    AttributeTable {
        columns,
        rows,
        raw: raw.clone(),
    }
}

fn item_fragment(item: &Map<String, Value>) -> Option<Fragment> {
    if let Some(value) = decoded_payload(item) {
        if let Some(fragment) = columns_rows(value).or_else(|| nested_data(value)) {
            return Some(fragment);
        }
    }

    if let Some(value @ (Value::Object(_) | Value::Array(_))) = item.get("value") {
        let parsed = parse_struct_value(value);
        if !parsed.columns.is_empty() {
            return Some(Fragment {
                columns: parsed.columns,
                rows: parsed.rows,
            });
        }
    }

    columns_rows(item).or_else(|| fields_row(item))
}

fn normalize_object(map: &Map<String, Value>, raw: &Value) -> AttributeTable {
    let found = decoded_payload(map)
        .and_then(|value| columns_rows(value).or_else(|| nested_data(value)))
        .or_else(|| map.get("value").and_then(Value::as_object).and_then(columns_rows));
    if let Some(fragment) = found {
        return fragment.into_table(raw);
    }

    if let Some(values @ Value::Array(_)) = map.get("values") {
        return normalize_table(values);
    }

    if let Some(fragment) = columns_rows(map).or_else(|| fields_row(map)) {
        return fragment.into_table(raw);
    }

    parse_struct_value(raw)
}

/// Fallback parser that also unwraps `{values: [...]}` rows
fn parse_struct_value(value: &Value) -> AttributeTable {
    let Value::Object(map) = value else {
        return AttributeTable::empty(value.clone());
    };

    if map.contains_key("columns") && map.contains_key("rows") {
        let rows = match map.get("rows") {
            Some(Value::Array(rows)) => rows.iter().map(ragged_row).collect(),
            _ => Vec::new(),
        };
        return AttributeTable {
            columns: column_labels(map.get("columns")),
            rows,
            raw: value.clone(),
        };
    }

    match fields_row(map) {
        Some(fragment) => fragment.into_table(value),
        None => AttributeTable::empty(value.clone()),
    }
}

impl Fragment {
    fn into_table(self, raw: &Value) -> AttributeTable {
        AttributeTable {
            columns: self.columns,
            rows: self.rows,
            raw: raw.clone(),
        }
    }
}

/// `value` of a decoded attribute envelope, if this is one
fn decoded_payload(map: &Map<String, Value>) -> Option<&Map<String, Value>> {
    if !map.get(DECODED_FLAG).is_some_and(is_truthy) {
        return None;
    }
    map.get("value").and_then(Value::as_object)
}

fn nested_data(map: &Map<String, Value>) -> Option<Fragment> {
    map.get("data").and_then(Value::as_object).and_then(columns_rows)
}

fn columns_rows(map: &Map<String, Value>) -> Option<Fragment> {
    if !(map.contains_key("columns") && map.contains_key("rows")) {
        return None;
    }
    let rows = match map.get("rows") {
        Some(Value::Array(rows)) => rows.iter().map(plain_row).collect(),
        _ => Vec::new(),
    };
    Some(Fragment {
        columns: column_labels(map.get("columns")),
        rows,
    })
}

fn fields_row(map: &Map<String, Value>) -> Option<Fragment> {
    let fields = map.get("fields")?.as_object()?;
    let columns: Vec<String> = fields.keys().cloned().collect();
    let row = fields.values().map(extract_field_value).collect();
    Some(Fragment {
        columns,
        rows: vec![row],
    })
}

fn column_labels(columns: Option<&Value>) -> Vec<String> {
    match columns {
        Some(Value::Array(columns)) => columns.iter().map(cell_label).collect(),
        _ => Vec::new(),
    }
}

/// Display label of a column header cell
fn cell_label(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn plain_row(row: &Value) -> Vec<Value> {
    match row {
        Value::Array(cells) => cells.clone(),
        other => vec![other.clone()],
    }
}

fn ragged_row(row: &Value) -> Vec<Value> {
    if let Some(Value::Array(values)) = row.get("values") {
        return values.iter().map(extract_field_value).collect();
    }
    plain_row(row)
}
